//! HTTP API: JSON endpoints mapping requests to store and auth calls.
//!
//! Everything here is thin by design: the hard engineering lives in
//! `ims-store` (the transactional data store) and `ims-auth` (the
//! authorization engine). This crate's job is request parsing, the
//! authenticate-authorize-validate-execute-respond pipeline spec §4.F
//! describes, and JSON shaping.

pub mod app;
pub mod context;
pub mod middleware;
