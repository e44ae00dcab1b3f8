//! Resource identifiers for extracted entities.
//!
//! Every entity pulled out of an answer tree (organization, encounter, immunization) gets a
//! freshly generated identifier before it is appended to the bundle. Identifiers use the
//! *canonical* UUID form expected by FHIR resource ids: **36 lowercase characters, hyphenated**.
//!
//! This crate provides:
//! - A wrapper type ([`ResourceId`]) that guarantees the canonical form once constructed.
//! - The [`IdSource`] seam through which a conversion pass obtains new identifiers, with a
//!   random implementation for production and a sequential one for reproducible output.
//!
//! ## Canonical UUID form
//! - Length: 36
//! - Characters: `0-9`, `a-f` and `-` at positions 8, 13, 18 and 23
//! - Example: `550e8400-e29b-41d4-a716-446655440000`

mod service;

// Re-export public types
pub use service::{IdSource, RandomIdSource, ResourceId, SequentialIdSource, Uuid};

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;
