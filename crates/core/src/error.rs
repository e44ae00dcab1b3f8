/// Failure of a single conversion request.
///
/// Every variant aborts the whole request; there is no partial success.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// A literal violates the lexical rules of the type it claims.
    #[error("format error: {0}")]
    Format(#[from] fhir::FhirError),

    /// A recognised subtree lacks a sub-item the resource needs.
    #[error("'{parent}' is missing required sub-item '{expected}'")]
    MissingSubItem { parent: String, expected: String },

    /// A sub-item resolved to a different value type than the resource field needs.
    #[error("'{link_id}' must hold a {expected} value, found {found}")]
    UnexpectedValue {
        link_id: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A value-bearing answer that no resolver claims.
    #[error("no resolver accepts answer {answer}")]
    DispatcherExhausted { answer: String },

    /// The answer tree JSON does not match the expected shape.
    #[error("answer tree schema mismatch at {path}: {message}")]
    InvalidTree { path: String, message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type ConversionResult<T> = std::result::Result<T, ConversionError>;

/// Failure to load the bundled or configured code-system tables. Startup-fatal.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceDataError {
    #[error("failed to read reference data file {path}: {source}", path = path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("code system '{key}' schema mismatch at {path}: {message}")]
    Schema {
        key: &'static str,
        path: String,
        message: String,
    },

    #[error("code system '{key}' defines code '{code}' more than once")]
    DuplicateCode { key: &'static str, code: String },

    #[error("code system '{key}' is invalid: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ReferenceDataResult<T> = std::result::Result<T, ReferenceDataError>;
