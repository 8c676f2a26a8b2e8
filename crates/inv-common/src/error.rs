//! Error types for OpenInv

use thiserror::Error;

/// OpenInv error taxonomy. The api crate owns the mapping to HTTP status
/// codes; everything below that layer speaks these variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed, empty or oversized input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown device (also covers "device is not in that group")
    #[error("device not found")]
    DeviceNotFound,

    /// Unknown group
    #[error("group not found")]
    GroupNotFound,

    /// Stale revision supplied on a compare-and-swap update
    #[error("device revision mismatch")]
    PreconditionFailed,

    /// Auth verification rejected the request
    #[error("forbidden")]
    Forbidden,

    /// Auth verification upstream unreachable or timed out
    #[error("auth upstream failed: {0}")]
    AuthUpstream(String),

    /// Unexpected storage failure
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for OpenInv
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for an `InvalidArgument` with a formatted message.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}
