//! OpenInv Common - shared model types for the device inventory service
//!
//! This crate provides the vocabulary the rest of the service is written in:
//! - Attribute scopes and the attribute value union
//! - Device and group identifiers with their validation rules
//! - The service error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attrs;
pub mod device;
pub mod error;

pub use attrs::*;
pub use device::*;
pub use error::*;

/// Hard cap on live tags-scoped attributes per device. Bulk submissions
/// beyond the cap keep the first `MAX_TAGS` in submission order.
pub const MAX_TAGS: usize = 20;

/// Upper bound on device identifier length, in bytes.
pub const MAX_ID_LEN: usize = 1024;

/// Upper bound on attribute name length, in bytes.
pub const MAX_ATTR_NAME_LEN: usize = 4096;
