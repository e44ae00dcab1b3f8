//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the engine. Request
//! handling never reads process-wide environment variables.

use crate::code_systems::CodeSystemKey;
use crate::constants::REFERENCE_DATA_DIR;
use crate::{ReferenceDataError, ReferenceDataResult};
use std::path::{Path, PathBuf};

/// Intake configuration resolved at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntakeConfig {
    reference_data_dir: Option<PathBuf>,
}

impl IntakeConfig {
    /// Configuration that uses the code-system tables compiled into the binary.
    pub fn bundled() -> Self {
        Self::default()
    }

    /// Configuration that loads the code-system tables from `reference_data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceDataError::InvalidConfig`] if the directory is missing any table file.
    pub fn with_reference_data_dir(reference_data_dir: PathBuf) -> ReferenceDataResult<Self> {
        if !looks_like_reference_dir(&reference_data_dir) {
            return Err(ReferenceDataError::InvalidConfig(format!(
                "{} is not a reference data directory (expected {})",
                reference_data_dir.display(),
                expected_files()
            )));
        }
        Ok(Self {
            reference_data_dir: Some(reference_data_dir),
        })
    }

    /// Directory the tables are read from, or `None` for the bundled copies.
    pub fn reference_data_dir(&self) -> Option<&Path> {
        self.reference_data_dir.as_deref()
    }
}

fn looks_like_reference_dir(path: &Path) -> bool {
    path.is_dir()
        && CodeSystemKey::ALL
            .iter()
            .all(|key| path.join(key.file_name()).is_file())
}

fn expected_files() -> String {
    CodeSystemKey::ALL
        .iter()
        .map(|key| key.file_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve the reference data directory without reading environment variables.
///
/// If `override_dir` is provided, it must be a directory holding every table file. Otherwise
/// this searches for `crates/core/reference/` relative to the current working directory and
/// then walks up from `CARGO_MANIFEST_DIR`. Returns `Ok(None)` when nothing is found, in which
/// case the bundled tables apply.
pub fn resolve_reference_data_dir(
    override_dir: Option<PathBuf>,
) -> ReferenceDataResult<Option<PathBuf>> {
    if let Some(dir) = override_dir {
        if looks_like_reference_dir(&dir) {
            return Ok(Some(dir));
        }
        return Err(ReferenceDataError::InvalidConfig(format!(
            "reference data override {} is not a valid directory (must contain {})",
            dir.display(),
            expected_files()
        )));
    }

    let cwd_relative = PathBuf::from(REFERENCE_DATA_DIR);
    if looks_like_reference_dir(&cwd_relative) {
        return Ok(Some(cwd_relative));
    }

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    for ancestor in manifest_dir.ancestors() {
        let candidate = ancestor.join(REFERENCE_DATA_DIR);
        if looks_like_reference_dir(&candidate) {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}
