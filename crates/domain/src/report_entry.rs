//! Append-only journal line on an incident or field report.

use chrono::{DateTime, Utc};
use ims_core::DomainError;
use serde::{Deserialize, Serialize};

/// One journal line. `automatic` entries are generated by the store itself
/// when a field changes; user entries carry the requesting user's handle.
///
/// Equality (and hence dedup/comparison in tests) is by content, not
/// identity, per the entity's definition as a value-by-content tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub author: String,
    pub created: DateTime<Utc>,
    pub text: String,
    #[serde(rename = "system_entry")]
    pub automatic: bool,
}

impl ReportEntry {
    pub fn new(author: impl Into<String>, created: DateTime<Utc>, text: impl Into<String>, automatic: bool) -> Self {
        Self {
            author: author.into(),
            created,
            text: text.into(),
            automatic,
        }
    }

    /// The automatic entry generated by the store for a single scalar field
    /// change: `Changed <field> to: <value>`.
    pub fn changed(author: impl Into<String>, created: DateTime<Utc>, field: &str, value: impl std::fmt::Display) -> Self {
        Self::new(author, created, format!("Changed {field} to: {value}"), true)
    }

    /// The automatic entry generated for a set-valued field change (rangers,
    /// incident types): `Changed <field> to: <comma-separated values>`.
    pub fn changed_set<I, S>(author: impl Into<String>, created: DateTime<Utc>, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(author, created, format!("Changed {field} to: {joined}"), true)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.author.trim().is_empty() && !self.automatic {
            return Err(DomainError::validation("report entry author must not be empty"));
        }
        Ok(())
    }
}

impl ims_core::ValueObject for ReportEntry {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 25, 12, 0, 0).unwrap()
    }

    #[test]
    fn scalar_change_text_format() {
        let entry = ReportEntry::changed("", t(), "priority", 5);
        assert_eq!(entry.text, "Changed priority to: 5");
        assert!(entry.automatic);
    }

    #[test]
    fn set_change_text_format() {
        let entry = ReportEntry::changed_set("", t(), "Rangers", ["Tonic", "Hardware"]);
        assert_eq!(entry.text, "Changed Rangers to: Tonic, Hardware");
    }

    #[test]
    fn user_entry_requires_author() {
        let entry = ReportEntry::new("", t(), "manual note", false);
        assert!(entry.validate().is_err());
    }
}
