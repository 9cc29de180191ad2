//! ACL evaluation: turns (user, event access) into a [`Capabilities`] set.

use std::collections::HashSet;

use ims_domain::EventAccess;

use crate::capability::Capabilities;
use crate::principal::AuthenticatedUser;

/// Computes the capability set for `user` given the admins list and,
/// if the request is scoped to an event, that event's ACL.
///
/// Mirrors spec §4.D step by step:
/// 1. baseline for any authenticated user;
/// 2. `ims_admin` if any short name is in `admins`;
/// 3. event ACL: writers match grants write+read, else readers match grants
///    read only.
///
/// Field-report write access is also granted by matching the *reporters*
/// ACL even without a readers/writers match; see [`reporter_capabilities`].
pub fn authorizations_for(
    user: &AuthenticatedUser,
    admins: &HashSet<String>,
    event_access: Option<&EventAccess>,
) -> Capabilities {
    let mut caps = Capabilities::baseline();

    if user.short_names.iter().any(|name| admins.contains(name)) {
        caps |= Capabilities::IMS_ADMIN;
    }

    if let Some(access) = event_access {
        if access.matches(ims_domain::AclMode::Write, &user.short_names, &user.groups) {
            caps |= Capabilities::WRITE_INCIDENTS | Capabilities::READ_INCIDENTS;
        } else if access.matches(ims_domain::AclMode::Read, &user.short_names, &user.groups) {
            caps |= Capabilities::READ_INCIDENTS;
        }
    }

    caps
}

/// Separately computes whether `user` additionally has field-report write
/// access via the event's *reporters* ACL. The baseline already grants
/// `write_incident_reports` to every authenticated user (spec §4.D.1), so
/// this only matters when a deployment wants to gate narrative writing more
/// tightly than the baseline — kept as its own call per spec step 4 so a
/// caller can combine it with a narrower baseline policy if it chooses.
pub fn reporter_match(user: &AuthenticatedUser, event_access: &EventAccess) -> bool {
    event_access.matches(ims_domain::AclMode::Report, &user.short_names, &user.groups)
}

/// Authorizes reading a single field report given whether it is attached to
/// at least one incident the user can read. An unattached report (or one
/// attached only to incidents the user can't read) falls back to the
/// baseline `read_incident_reports` capability.
pub fn can_read_field_report(caps: Capabilities, attached_to_readable_incident: bool) -> bool {
    attached_to_readable_incident || caps.contains(Capabilities::READ_INCIDENT_REPORTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ims_domain::AclExpression;

    fn user(name: &str) -> AuthenticatedUser {
        AuthenticatedUser::new(name, vec![name.to_string()], vec![])
    }

    #[test]
    fn admin_short_name_grants_ims_admin() {
        let admins: HashSet<String> = ["alice".to_string()].into_iter().collect();
        let caps = authorizations_for(&user("alice"), &admins, None);
        assert!(caps.contains(Capabilities::IMS_ADMIN));
        let caps = authorizations_for(&user("bob"), &admins, None);
        assert!(!caps.contains(Capabilities::IMS_ADMIN));
    }

    #[test]
    fn non_matching_user_gets_neither_read_nor_write() {
        let mut access = EventAccess::new();
        access.readers.insert(AclExpression::person("alice"));
        let caps = authorizations_for(&user("bob"), &HashSet::new(), Some(&access));
        assert!(!caps.contains(Capabilities::READ_INCIDENTS));
        assert!(!caps.contains(Capabilities::WRITE_INCIDENTS));
    }

    #[test]
    fn writer_gets_both_read_and_write() {
        let mut access = EventAccess::new();
        access.writers.insert(AclExpression::person("alice"));
        let caps = authorizations_for(&user("alice"), &HashSet::new(), Some(&access));
        assert!(caps.contains(Capabilities::READ_INCIDENTS));
        assert!(caps.contains(Capabilities::WRITE_INCIDENTS));
    }

    #[test]
    fn reader_only_gets_read() {
        let mut access = EventAccess::new();
        access.readers.insert(AclExpression::person("alice"));
        let caps = authorizations_for(&user("alice"), &HashSet::new(), Some(&access));
        assert!(caps.contains(Capabilities::READ_INCIDENTS));
        assert!(!caps.contains(Capabilities::WRITE_INCIDENTS));
    }

    #[test]
    fn field_report_falls_back_to_baseline_when_unattached() {
        let caps = Capabilities::baseline();
        assert!(can_read_field_report(caps, false));
    }

    #[test]
    fn field_report_readable_via_attached_incident_even_without_baseline() {
        let caps = Capabilities::empty();
        assert!(can_read_field_report(caps, true));
        assert!(!can_read_field_report(caps, false));
    }
}
