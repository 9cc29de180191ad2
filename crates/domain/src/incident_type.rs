//! Process-wide incident type catalog.
//!
//! A visible type may be assigned to new incidents; a hidden type remains on
//! existing incidents but is filtered out of the set offered for new use.
//! Known system types ("Admin", "Junk") are always present, matching the
//! reference store's seed list.

use ims_core::DomainError;
use serde::{Deserialize, Serialize};

/// System incident types that must always exist in a fresh store.
pub const SYSTEM_INCIDENT_TYPES: &[&str] = &["Admin", "Junk"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentType {
    pub name: String,
    pub hidden: bool,
}

impl IncidentType {
    pub fn new(name: impl Into<String>, hidden: bool) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("incident type name must not be empty"));
        }
        Ok(Self { name, hidden })
    }
}

impl ims_core::ValueObject for IncidentType {}
