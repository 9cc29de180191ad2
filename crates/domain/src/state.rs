//! Incident lifecycle state.

use ims_core::DomainError;
use serde::{Deserialize, Serialize};

/// Incident lifecycle state. External name (wire/journal text) is the
/// lowercase variant name with underscores, matching `IncidentState` in the
/// reference store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentState {
    New,
    OnHold,
    Dispatched,
    OnScene,
    Closed,
}

impl Default for IncidentState {
    fn default() -> Self {
        Self::New
    }
}

impl IncidentState {
    /// The external (wire and journal) name for this state.
    pub fn external_name(&self) -> &'static str {
        match self {
            IncidentState::New => "new",
            IncidentState::OnHold => "on_hold",
            IncidentState::Dispatched => "dispatched",
            IncidentState::OnScene => "on_scene",
            IncidentState::Closed => "closed",
        }
    }

    /// Parses the external name, as used on the wire and in automatic
    /// journal entries.
    pub fn lookup_by_name(name: &str) -> Result<Self, DomainError> {
        match name {
            "new" => Ok(Self::New),
            "on_hold" => Ok(Self::OnHold),
            "dispatched" => Ok(Self::Dispatched),
            "on_scene" => Ok(Self::OnScene),
            "closed" => Ok(Self::Closed),
            other => Err(DomainError::validation(format!("unknown incident state: {other}"))),
        }
    }
}

impl ims_core::ValueObject for IncidentState {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_external_names() {
        for state in [
            IncidentState::New,
            IncidentState::OnHold,
            IncidentState::Dispatched,
            IncidentState::OnScene,
            IncidentState::Closed,
        ] {
            let name = state.external_name();
            assert_eq!(IncidentState::lookup_by_name(name).unwrap(), state);
        }
    }

    #[test]
    fn rejects_unknown_name() {
        assert!(IncidentState::lookup_by_name("vanished").is_err());
    }
}
