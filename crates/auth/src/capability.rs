//! The six-flag capability bit-set computed per (user, event).

use bitflags::bitflags;

bitflags! {
    /// What an authenticated user is allowed to do, either process-wide
    /// (`IMS_ADMIN`) or scoped to the event an ACL was evaluated against.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const IMS_ADMIN              = 0b0000_0001;
        const READ_PERSONNEL         = 0b0000_0010;
        const READ_INCIDENTS         = 0b0000_0100;
        const WRITE_INCIDENTS        = 0b0000_1000;
        const READ_INCIDENT_REPORTS  = 0b0001_0000;
        const WRITE_INCIDENT_REPORTS = 0b0010_0000;
    }
}

impl Capabilities {
    /// Granted to any authenticated user regardless of event: read the
    /// personnel roster, read and write field report narratives. Write
    /// access to incidents and read access beyond the baseline both require
    /// an event-scoped ACL match.
    pub fn baseline() -> Self {
        Self::READ_PERSONNEL | Self::READ_INCIDENT_REPORTS | Self::WRITE_INCIDENT_REPORTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_excludes_incident_access() {
        let caps = Capabilities::baseline();
        assert!(!caps.contains(Capabilities::READ_INCIDENTS));
        assert!(!caps.contains(Capabilities::WRITE_INCIDENTS));
        assert!(!caps.contains(Capabilities::IMS_ADMIN));
        assert!(caps.contains(Capabilities::READ_INCIDENT_REPORTS));
    }
}
