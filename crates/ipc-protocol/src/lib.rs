//! ipc-protocol: envelope types, error taxonomy, and validation shared by
//! the hub and every peer client.
//!
//! All traffic crossing the hub uses a top-level JSON envelope (see
//! [`envelope::Envelope`]); this crate is the single place that knows its
//! shape, so hub and peer code validate against the exact same rules.

pub mod envelope;
pub mod error;
pub mod topics;
pub mod validate;

pub use envelope::{AuthHello, AuthOk, Envelope, ErrorPayload};
pub use error::HubError;
pub use validate::{parse_and_validate, validate_envelope};
