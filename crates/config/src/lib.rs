//! The immutable wiring object every component is handed at startup: store,
//! directory, auth key material, and the handful of deployment-level
//! settings spec §4.G enumerates.
//!
//! This crate only defines the carrier and its defaults. Populating it from
//! a config file or CLI flags is explicitly out of scope (spec §1's
//! "Configuration-file loading, command-line parsing ... process
//! supervision" non-goal) — a deployment's `main.rs` builds one of these by
//! hand or from whatever env/file mechanism it chooses.

use std::collections::HashSet;
use std::sync::Arc;

use ims_auth::SigningKey;
use ims_directory::PersonnelDirectory;
use ims_events::NotificationBus;
use ims_store::Store;
use serde_json::Value as JsonValue;

/// Deployment label attached to logs and, if ever needed, error responses.
/// Spec §4.G calls this out explicitly (e.g. `"production"`) so operators
/// can tell a staging deployment's logs apart from prod's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployment {
    Production,
    Staging,
    Development,
}

impl Deployment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Deployment::Production => "production",
            Deployment::Staging => "staging",
            Deployment::Development => "development",
        }
    }
}

/// The wiring object itself. Every field is set once at startup and never
/// mutated afterward; components borrow from it for the lifetime of the
/// process.
pub struct Config {
    pub store: Arc<dyn Store>,
    pub directory: Arc<dyn PersonnelDirectory>,
    pub signing_key: Arc<SigningKey>,
    pub bus: Arc<NotificationBus>,

    pub listen_host: String,
    pub listen_port: u16,

    /// Short names granted `imsAdmin` regardless of any event's ACL (spec
    /// §4.D step 2).
    pub admins: HashSet<String>,

    /// Operator escape hatch: when set, this plaintext bypasses password
    /// verification for any known, active account. Must be left unset in
    /// production; see [`Deployment::Production`] callers should assert
    /// this themselves, since the carrier doesn't enforce it.
    pub master_key: Option<String>,

    /// Incident-type catalog seed list, beyond the always-present system
    /// types (`ims_domain::SYSTEM_INCIDENT_TYPES`). Applied once, at store
    /// bootstrap, by whichever `main.rs` wires this carrier up.
    pub event_type_seed: Vec<String>,

    pub deployment: Deployment,

    /// Out of spec scope (spec §4.G: "an optional attachments store (not
    /// part of this spec)"); carried as an opaque slot so a deployment can
    /// wire one in without changing this carrier's shape.
    pub attachments: Option<JsonValue>,
}

impl Config {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        directory: Arc<dyn PersonnelDirectory>,
        signing_key: Arc<SigningKey>,
        bus: Arc<NotificationBus>,
        listen_host: impl Into<String>,
        listen_port: u16,
        admins: HashSet<String>,
    ) -> Self {
        Self {
            store,
            directory,
            signing_key,
            bus,
            listen_host: listen_host.into(),
            listen_port,
            admins,
            master_key: None,
            event_type_seed: Vec::new(),
            deployment: Deployment::Development,
            attachments: None,
        }
    }

    pub fn with_master_key(mut self, key: impl Into<String>) -> Self {
        self.master_key = Some(key.into());
        self
    }

    pub fn with_event_type_seed(mut self, types: Vec<String>) -> Self {
        self.event_type_seed = types;
        self
    }

    pub fn with_deployment(mut self, deployment: Deployment) -> Self {
        self.deployment = deployment;
        self
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_external_names() {
        assert_eq!(Deployment::Production.as_str(), "production");
        assert_eq!(Deployment::Development.as_str(), "development");
    }
}
