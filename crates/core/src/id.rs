//! Identifiers used across the dispatch domain.
//!
//! Unlike a UUID-keyed aggregate store, incidents and field reports are keyed
//! by a per-event sequential number, not a random identifier. `EventId` and
//! `ConcentricStreetId` stay opaque strings (the wire format already treats
//! them that way); the numeric identifiers enforce `>= 1` at construction.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifies a tenant event ("2023", "Burning Man 2024", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(DomainError::invalid_id("event id must not be empty"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EventId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

macro_rules! impl_number_newtype {
    ($t:ident, $name:literal) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(u32);

        impl $t {
            /// Constructs a number, rejecting zero: allocation always starts at 1.
            pub fn new(value: u32) -> Result<Self, DomainError> {
                if value == 0 {
                    return Err(DomainError::invalid_id(concat!($name, " must be >= 1")));
                }
                Ok(Self(value))
            }

            pub fn get(&self) -> u32 {
                self.0
            }

            pub fn next(&self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw: u32 = s
                    .parse()
                    .map_err(|_| DomainError::invalid_id(concat!($name, ": not a number")))?;
                Self::new(raw)
            }
        }
    };
}

impl_number_newtype!(IncidentNumber, "incident number");
impl_number_newtype!(FieldReportNumber, "field report number");

/// Identifies a concentric street within an event's street dictionary.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConcentricStreetId(String);

impl ConcentricStreetId {
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(DomainError::invalid_id("concentric street id must not be empty"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConcentricStreetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_rejects_blank() {
        assert!(EventId::new("   ").is_err());
        assert!(EventId::new("2024").is_ok());
    }

    #[test]
    fn incident_number_rejects_zero() {
        assert!(IncidentNumber::new(0).is_err());
        let n = IncidentNumber::new(1).unwrap();
        assert_eq!(n.next().get(), 2);
    }

    #[test]
    fn field_report_number_parses() {
        let n: FieldReportNumber = "7".parse().unwrap();
        assert_eq!(n.get(), 7);
        assert!("0".parse::<FieldReportNumber>().is_err());
        assert!("nope".parse::<FieldReportNumber>().is_err());
    }
}
