//! Per-event access-control list: read/write/report modes, each a set of
//! match expressions.

use std::collections::BTreeSet;

use ims_core::DomainError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AclMode {
    Read,
    Write,
    Report,
}

/// A match expression: `*`, `person:<handle>`, or `position:<group>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AclExpression(String);

impl AclExpression {
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let valid = raw == "*" || raw.strip_prefix("person:").is_some_and(|rest| !rest.is_empty())
            || raw.strip_prefix("position:").is_some_and(|rest| !rest.is_empty());
        if !valid {
            return Err(DomainError::validation(format!("invalid ACL expression: {raw}")));
        }
        Ok(Self(raw))
    }

    pub fn any_authenticated() -> Self {
        Self("*".to_string())
    }

    pub fn person(handle: impl Into<String>) -> Self {
        Self(format!("person:{}", handle.into()))
    }

    pub fn position(group: impl Into<String>) -> Self {
        Self(format!("position:{}", group.into()))
    }

    /// Whether this expression matches a user described by their short
    /// names and group memberships.
    pub fn matches(&self, short_names: &[String], groups: &[String]) -> bool {
        if self.0 == "*" {
            return true;
        }
        if let Some(name) = self.0.strip_prefix("person:") {
            return short_names.iter().any(|n| n == name);
        }
        if let Some(group) = self.0.strip_prefix("position:") {
            return groups.iter().any(|g| g == group);
        }
        false
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Per-event ACL: one expression set per mode. Duplicates collapse (the set
/// is a `BTreeSet`); order within a mode is insignificant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EventAccess {
    pub readers: BTreeSet<AclExpression>,
    pub writers: BTreeSet<AclExpression>,
    pub reporters: BTreeSet<AclExpression>,
}

impl EventAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self, mode: AclMode) -> &BTreeSet<AclExpression> {
        match mode {
            AclMode::Read => &self.readers,
            AclMode::Write => &self.writers,
            AclMode::Report => &self.reporters,
        }
    }

    pub fn set_mode(&mut self, mode: AclMode, expressions: BTreeSet<AclExpression>) {
        match mode {
            AclMode::Read => self.readers = expressions,
            AclMode::Write => self.writers = expressions,
            AclMode::Report => self.reporters = expressions,
        }
    }

    /// Whether any expression in the given mode matches the user.
    pub fn matches(&self, mode: AclMode, short_names: &[String], groups: &[String]) -> bool {
        self.mode(mode).iter().any(|e| e.matches(short_names, groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_anyone() {
        let expr = AclExpression::any_authenticated();
        assert!(expr.matches(&["alice".into()], &[]));
    }

    #[test]
    fn person_matches_exact_handle_only() {
        let expr = AclExpression::person("alice");
        assert!(expr.matches(&["alice".into()], &[]));
        assert!(!expr.matches(&["bob".into()], &[]));
    }

    #[test]
    fn position_matches_group() {
        let expr = AclExpression::position("dispatch");
        assert!(expr.matches(&[], &["dispatch".into()]));
        assert!(!expr.matches(&[], &["rangers".into()]));
    }

    #[test]
    fn rejects_malformed_expression() {
        assert!(AclExpression::new("person:").is_err());
        assert!(AclExpression::new("nonsense").is_err());
        assert!(AclExpression::new("*").is_ok());
    }

    #[test]
    fn non_matching_user_has_neither_read_nor_write() {
        let mut access = EventAccess::new();
        access.readers.insert(AclExpression::person("alice"));
        let bob = vec!["bob".to_string()];
        assert!(!access.matches(AclMode::Read, &bob, &[]));
        assert!(!access.matches(AclMode::Write, &bob, &[]));
    }
}
