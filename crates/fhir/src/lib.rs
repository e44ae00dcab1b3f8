//! FHIR wire/boundary support for the notification intake layer.
//!
//! This crate provides the **output models** a converted questionnaire answer tree is made of:
//! - typed answer values (`valueString`, `valueDate`, `valueQuantity`, ...)
//! - response items carrying those values
//! - the resources extracted from recognised subtrees (Organization, Encounter, Immunization)
//! - the request-scoped [`BundleBuilder`] both of the above are accumulated into
//!
//! It also owns the lexical rules for the FHIR primitive literals a questionnaire client may
//! send (German `DD.MM.YYYY` dates alongside ISO dates, `HH:mm` times, comparator codes).
//!
//! This crate performs no I/O and does not know about the raw answer tree; that lives in
//! `intake-core`.

pub mod bundle;
pub mod resources;
pub mod response;
pub mod values;

// Re-export facades
pub use bundle::BundleBuilder;
pub use resources::{
    Address, Annotation, CodeableConcept, ContactPoint, ContactPointSystem, Encounter,
    EncounterStatus, Extension, ExtractedResource, Immunization, ImmunizationStatus,
    ImmunizationSubject, Organization, Period,
};
pub use response::{ResponseAnswer, ResponseItem};
pub use values::{
    Coding, DatePrecision, DateTimePrecision, FhirDate, FhirDateTime, FhirTime, Quantity,
    QuantityComparator, Reference, TypedValue,
};

pub use intake_types::{LinkId, NonEmptyText};
pub use intake_uuid::ResourceId;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid date '{literal}': {reason}")]
    InvalidDate { literal: String, reason: String },

    #[error("invalid dateTime '{literal}': {reason}")]
    InvalidDateTime { literal: String, reason: String },

    #[error("invalid time '{literal}': {reason}")]
    InvalidTime { literal: String, reason: String },

    #[error("unknown quantity comparator '{0}'")]
    InvalidComparator(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
