//! Per-event concentric-street dictionary.
//!
//! IDs are never renumbered; streets are add-only from the core's
//! perspective (see Open Question (c): deletion, if ever offered, is an API
//! boundary concern, not something this type exposes).

use std::collections::BTreeMap;

use ims_core::{ConcentricStreetId, DomainError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ConcentricStreetDictionary {
    streets: BTreeMap<ConcentricStreetId, String>,
}

impl ConcentricStreetDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a street, rejecting a reused id.
    pub fn add(&mut self, id: ConcentricStreetId, name: String) -> Result<(), DomainError> {
        if self.streets.contains_key(&id) {
            return Err(DomainError::conflict(format!(
                "concentric street id already in use: {id}"
            )));
        }
        self.streets.insert(id, name);
        Ok(())
    }

    pub fn get(&self, id: &ConcentricStreetId) -> Option<&String> {
        self.streets.get(id)
    }

    pub fn contains(&self, id: &ConcentricStreetId) -> bool {
        self.streets.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConcentricStreetId, &String)> {
        self.streets.iter()
    }

    pub fn as_map(&self) -> &BTreeMap<ConcentricStreetId, String> {
        &self.streets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ConcentricStreetId {
        ConcentricStreetId::new(raw).unwrap()
    }

    #[test]
    fn add_then_lookup() {
        let mut dict = ConcentricStreetDictionary::new();
        dict.add(id("E"), "Esplanade".into()).unwrap();
        assert_eq!(dict.get(&id("E")).map(String::as_str), Some("Esplanade"));
    }

    #[test]
    fn rejects_reused_id() {
        let mut dict = ConcentricStreetDictionary::new();
        dict.add(id("E"), "Esplanade".into()).unwrap();
        assert!(dict.add(id("E"), "Esplanade Again".into()).is_err());
    }
}
