//! Error taxonomy for the envelope validator, the auth handshake, and the
//! router, unified into one closed enum rather than three separate ones so
//! callers have a single `code()` to consult when building an error
//! payload.

use thiserror::Error;

/// Stable machine-readable error codes carried in `ipc.error` payloads.
///
/// Kept as a separate module (rather than inlined `#[error("...")]` strings)
/// so hub and peer code can match on the code without string-comparing
/// `Display` output.
pub mod codes {
    pub const ERR_MISSING_KEYS: &str = "ERR_MISSING_KEYS";
    pub const ERR_UNSUPPORTED_VERSION: &str = "ERR_UNSUPPORTED_VERSION";
    pub const ERR_INVALID_PAYLOAD: &str = "ERR_INVALID_PAYLOAD";
    pub const ERR_INVALID_FIELD: &str = "ERR_INVALID_FIELD";
    pub const ERR_INVALID_JSON: &str = "ERR_INVALID_JSON";
    pub const ERR_AUTH_REQUIRED: &str = "ERR_AUTH_REQUIRED";
    pub const ERR_AUTH_INVALID: &str = "ERR_AUTH_INVALID";
    pub const ERR_DUPLICATE_SERVICE: &str = "ERR_DUPLICATE_SERVICE";
    pub const ERR_UNKNOWN_DESTINATION: &str = "ERR_UNKNOWN_DESTINATION";
}

/// All envelope-validation, auth, and routing errors the hub and peer client
/// can raise.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("missing required keys: {0}")]
    MissingKeys(String),

    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(String),

    #[error("payload must be a JSON object")]
    InvalidPayload,

    #[error("field {0} must be a non-empty string")]
    InvalidField(String),

    #[error("message must be valid JSON: {0}")]
    InvalidJson(String),

    #[error("first message must be auth.hello")]
    AuthRequired,

    #[error("invalid auth token")]
    AuthInvalid,

    #[error("a session for service {0} is already active")]
    DuplicateService(String),

    #[error("unknown destination service: {0}")]
    UnknownDestination(String),
}

impl HubError {
    /// The stable machine-readable code for this error, as carried in
    /// `ipc.error` payloads.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            HubError::MissingKeys(_) => codes::ERR_MISSING_KEYS,
            HubError::UnsupportedVersion(_) => codes::ERR_UNSUPPORTED_VERSION,
            HubError::InvalidPayload => codes::ERR_INVALID_PAYLOAD,
            HubError::InvalidField(_) => codes::ERR_INVALID_FIELD,
            HubError::InvalidJson(_) => codes::ERR_INVALID_JSON,
            HubError::AuthRequired => codes::ERR_AUTH_REQUIRED,
            HubError::AuthInvalid => codes::ERR_AUTH_INVALID,
            HubError::DuplicateService(_) => codes::ERR_DUPLICATE_SERVICE,
            HubError::UnknownDestination(_) => codes::ERR_UNKNOWN_DESTINATION,
        }
    }
}
