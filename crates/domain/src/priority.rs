//! Incident priority: an integer 1..5, defaulting to 3.

use ims_core::DomainError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    pub fn new(value: u8) -> Result<Self, DomainError> {
        if !(1..=5).contains(&value) {
            return Err(DomainError::validation(format!(
                "priority must be in 1..5, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(3)
    }
}

impl ims_core::ValueObject for Priority {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert!(Priority::new(0).is_err());
        assert!(Priority::new(6).is_err());
        assert!(Priority::new(1).is_ok());
        assert!(Priority::new(5).is_ok());
    }

    #[test]
    fn default_is_three() {
        assert_eq!(Priority::default().get(), 3);
    }
}
