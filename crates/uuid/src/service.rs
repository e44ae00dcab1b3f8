//! Internal implementation of resource identifiers and identifier sources.

use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Canonical identifier of an extracted resource (36 lowercase characters, hyphenated).
///
/// Once constructed the contained UUID is guaranteed to render in canonical form, so it can be
/// embedded in a FHIR `id` element and in relative references such as
/// `Organization/550e8400-e29b-41d4-a716-446655440000`.
///
/// # Construction
/// - [`ResourceId::new`] generates a new random identifier.
/// - [`ResourceId::parse`] validates an externally supplied identifier.
/// - [`ResourceId::from_uuid`] wraps an existing UUID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(Uuid);

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceId {
    /// Generates a new random (version 4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// Uppercase, simple (unhyphenated) or braced forms are rejected rather than normalised.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "resource id must be a lowercase hyphenated UUID, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("invalid resource id '{input}': {e}")))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical hyphenated lowercase form.
    ///
    /// This is a purely syntactic check and can be used before calling [`ResourceId::parse`].
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 36
            && input.bytes().enumerate().all(|(idx, b)| match idx {
                8 | 13 | 18 | 23 => b == b'-',
                _ => matches!(b, b'0'..=b'9' | b'a'..=b'f'),
            })
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ResourceId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ResourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ResourceId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Source of fresh resource identifiers for one conversion pass.
///
/// Each call must return an identifier not previously returned by the same source.
pub trait IdSource {
    fn next_id(&mut self) -> ResourceId;
}

/// Random version 4 identifiers.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIdSource;

impl IdSource for RandomIdSource {
    fn next_id(&mut self) -> ResourceId {
        ResourceId::new()
    }
}

/// Deterministic identifiers counting up from 1.
///
/// Produces `00000000-0000-0000-0000-000000000001`, `...0002` and so on. Used where output
/// must be reproducible, such as fixtures and golden files.
#[derive(Clone, Debug, Default)]
pub struct SequentialIdSource {
    issued: u128,
}

impl SequentialIdSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIdSource {
    fn next_id(&mut self) -> ResourceId {
        self.issued += 1;
        ResourceId(Uuid::from_u128(self.issued))
    }
}
