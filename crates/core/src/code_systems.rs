//! Read-only code-system lookup tables.
//!
//! Four small tables (address use, organization type, observation interpretation, condition
//! verification status) are loaded once at startup, either from the copies compiled into the
//! binary or from a configured directory, and never mutated afterwards. [`CodeSystems`] is
//! `Send + Sync` and is shared by reference across concurrent conversions.
//!
//! File format (`<key>.yaml`):
//!
//! ```yaml
//! system: https://demis.rki.de/fhir/CodeSystem/addressUse
//! concepts:
//!   - code: primary
//!     display: Hauptwohnsitz
//! ```

use crate::config::IntakeConfig;
use crate::{ReferenceDataError, ReferenceDataResult};
use fhir::Coding;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Identifies one of the bundled tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CodeSystemKey {
    AddressUse,
    OrganizationType,
    ObservationInterpretation,
    ConditionVerificationStatus,
}

impl CodeSystemKey {
    pub const ALL: [CodeSystemKey; 4] = [
        Self::AddressUse,
        Self::OrganizationType,
        Self::ObservationInterpretation,
        Self::ConditionVerificationStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddressUse => "address-use",
            Self::OrganizationType => "organization-type",
            Self::ObservationInterpretation => "observation-interpretation",
            Self::ConditionVerificationStatus => "condition-verification-status",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }

    pub fn file_name(&self) -> String {
        format!("{}.yaml", self.as_str())
    }

    fn bundled_yaml(&self) -> &'static str {
        match self {
            Self::AddressUse => include_str!("../reference/address-use.yaml"),
            Self::OrganizationType => include_str!("../reference/organization-type.yaml"),
            Self::ObservationInterpretation => {
                include_str!("../reference/observation-interpretation.yaml")
            }
            Self::ConditionVerificationStatus => {
                include_str!("../reference/condition-verification-status.yaml")
            }
        }
    }
}

/// One code system: its canonical URL and code → display map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeSystemTable {
    system: String,
    concepts: BTreeMap<String, String>,
}

impl CodeSystemTable {
    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn display(&self, code: &str) -> Option<&str> {
        self.concepts.get(code).map(String::as_str)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.concepts.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// `(code, display)` pairs in code order.
    pub fn concepts(&self) -> impl Iterator<Item = (&str, &str)> {
        self.concepts.iter().map(|(c, d)| (c.as_str(), d.as_str()))
    }

    /// Full coding for a known code.
    pub fn coding(&self, code: &str) -> Option<Coding> {
        self.display(code)
            .map(|display| Coding::new(&self.system, code).with_display(display))
    }
}

/// All lookup tables consulted during conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeSystems {
    address_use: CodeSystemTable,
    organization_type: CodeSystemTable,
    observation_interpretation: CodeSystemTable,
    condition_verification_status: CodeSystemTable,
}

impl CodeSystems {
    /// Load the copies compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceDataError`] if a bundled table is malformed.
    pub fn bundled() -> ReferenceDataResult<Self> {
        Self::build(|key| Ok(key.bundled_yaml().to_string()))
    }

    /// Load all tables from `dir`, which must contain one `<key>.yaml` per table.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceDataError::Io`] for a missing or unreadable file and a schema or
    /// validation error for a malformed one.
    pub fn from_dir(dir: &Path) -> ReferenceDataResult<Self> {
        Self::build(|key| {
            let path = dir.join(key.file_name());
            std::fs::read_to_string(&path).map_err(|source| ReferenceDataError::Io { path, source })
        })
    }

    /// Load according to configuration: the configured directory if any, else the bundled copies.
    pub fn load(config: &IntakeConfig) -> ReferenceDataResult<Self> {
        let tables = match config.reference_data_dir() {
            Some(dir) => Self::from_dir(dir)?,
            None => Self::bundled()?,
        };
        tracing::info!(
            source = %config
                .reference_data_dir()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "bundled".into()),
            "loaded code-system tables"
        );
        Ok(tables)
    }

    fn build(
        mut read: impl FnMut(CodeSystemKey) -> ReferenceDataResult<String>,
    ) -> ReferenceDataResult<Self> {
        let mut load = |key: CodeSystemKey| -> ReferenceDataResult<CodeSystemTable> {
            let yaml = read(key)?;
            parse_table(key, &yaml)
        };
        Ok(Self {
            address_use: load(CodeSystemKey::AddressUse)?,
            organization_type: load(CodeSystemKey::OrganizationType)?,
            observation_interpretation: load(CodeSystemKey::ObservationInterpretation)?,
            condition_verification_status: load(CodeSystemKey::ConditionVerificationStatus)?,
        })
    }

    pub fn table(&self, key: CodeSystemKey) -> &CodeSystemTable {
        match key {
            CodeSystemKey::AddressUse => &self.address_use,
            CodeSystemKey::OrganizationType => &self.organization_type,
            CodeSystemKey::ObservationInterpretation => &self.observation_interpretation,
            CodeSystemKey::ConditionVerificationStatus => &self.condition_verification_status,
        }
    }

    /// Display for `code` in the table named `key` (e.g. `"address-use"`).
    pub fn lookup(&self, key: &str, code: &str) -> Option<&str> {
        CodeSystemKey::parse(key).and_then(|k| self.table(k).display(code))
    }

    /// Display for `code` in whichever table has the canonical URL `system`.
    pub fn display_for(&self, system: &str, code: &str) -> Option<&str> {
        CodeSystemKey::ALL
            .into_iter()
            .map(|k| self.table(k))
            .find(|t| t.system() == system)
            .and_then(|t| t.display(code))
    }

    /// Fill in a missing display from the tables. Codings that already carry one are untouched.
    pub fn complete_display(&self, coding: &mut Coding) {
        if coding.display.is_some() {
            return;
        }
        if let Some(system) = coding.system.as_deref() {
            coding.display = self.display_for(system, &coding.code).map(str::to_string);
        }
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CodeSystemWire {
    system: String,
    concepts: Vec<ConceptWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConceptWire {
    code: String,
    display: String,
}

fn parse_table(key: CodeSystemKey, yaml: &str) -> ReferenceDataResult<CodeSystemTable> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml);
    let wire = serde_path_to_error::deserialize::<_, CodeSystemWire>(deserializer).map_err(
        |err| {
            let path = err.path().to_string();
            let source = err.into_inner();
            ReferenceDataError::Schema {
                key: key.as_str(),
                path: if path.is_empty() || path == "." {
                    "<root>".to_string()
                } else {
                    path
                },
                message: source.to_string(),
            }
        },
    )?;

    if wire.system.trim().is_empty() {
        return Err(ReferenceDataError::Invalid {
            key: key.as_str(),
            message: "system cannot be empty".into(),
        });
    }

    let mut concepts = BTreeMap::new();
    for concept in wire.concepts {
        if concept.code.trim().is_empty() {
            return Err(ReferenceDataError::Invalid {
                key: key.as_str(),
                message: "concept code cannot be empty".into(),
            });
        }
        if concepts.contains_key(&concept.code) {
            return Err(ReferenceDataError::DuplicateCode {
                key: key.as_str(),
                code: concept.code,
            });
        }
        concepts.insert(concept.code, concept.display);
    }

    Ok(CodeSystemTable {
        system: wire.system,
        concepts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_all_bundled(dir: &Path) {
        for key in CodeSystemKey::ALL {
            std::fs::write(dir.join(key.file_name()), key.bundled_yaml()).expect("write table");
        }
    }

    #[test]
    fn bundled_tables_load() {
        let tables = CodeSystems::bundled().expect("bundled tables are valid");
        for key in CodeSystemKey::ALL {
            assert!(!tables.table(key).is_empty(), "{} is empty", key.as_str());
        }
        assert_eq!(tables.lookup("address-use", "primary"), Some("Hauptwohnsitz"));
        assert_eq!(tables.lookup("organization-type", "hospital"), Some("Krankenhaus"));
        assert_eq!(tables.lookup("observation-interpretation", "POS"), Some("Positive"));
        assert_eq!(
            tables.lookup("condition-verification-status", "confirmed"),
            Some("Confirmed")
        );
        assert_eq!(tables.lookup("no-such-table", "primary"), None);
    }

    #[test]
    fn display_lookup_by_system_url() {
        let tables = CodeSystems::bundled().expect("bundled tables");
        assert_eq!(
            tables.display_for(
                "https://demis.rki.de/fhir/CodeSystem/organizationType",
                "laboratory"
            ),
            Some("Erregerdiagnostische Untersuchungsstelle")
        );
        assert_eq!(tables.display_for("http://example.org", "laboratory"), None);
    }

    #[test]
    fn complete_display_only_fills_missing_display() {
        let tables = CodeSystems::bundled().expect("bundled tables");

        let mut bare = Coding::new(
            "http://terminology.hl7.org/CodeSystem/v3-ObservationInterpretation",
            "NEG",
        );
        tables.complete_display(&mut bare);
        assert_eq!(bare.display.as_deref(), Some("Negative"));

        let mut labelled = Coding::new(
            "http://terminology.hl7.org/CodeSystem/v3-ObservationInterpretation",
            "NEG",
        )
        .with_display("negativ");
        tables.complete_display(&mut labelled);
        assert_eq!(labelled.display.as_deref(), Some("negativ"));
    }

    #[test]
    fn loads_from_directory() {
        let dir = TempDir::new().expect("tempdir");
        write_all_bundled(dir.path());
        std::fs::write(
            dir.path().join("address-use.yaml"),
            "system: urn:example:address-use\nconcepts:\n  - code: home\n    display: Home\n",
        )
        .expect("override table");

        let tables = CodeSystems::from_dir(dir.path()).expect("directory tables");
        assert_eq!(tables.table(CodeSystemKey::AddressUse).system(), "urn:example:address-use");
        assert_eq!(tables.lookup("address-use", "home"), Some("Home"));
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = TempDir::new().expect("tempdir");
        write_all_bundled(dir.path());
        std::fs::remove_file(dir.path().join("organization-type.yaml")).expect("remove");

        let err = CodeSystems::from_dir(dir.path()).expect_err("missing table");
        assert!(matches!(err, ReferenceDataError::Io { .. }));
    }

    #[test]
    fn malformed_file_reports_path() {
        let err = parse_table(
            CodeSystemKey::AddressUse,
            "system: urn:x\nconcepts:\n  - code: a\n    label: A\n",
        )
        .expect_err("unknown key");
        match err {
            ReferenceDataError::Schema { key, path, .. } => {
                assert_eq!(key, "address-use");
                assert!(path.starts_with("concepts"), "{path}");
            }
            other => panic!("expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let err = parse_table(
            CodeSystemKey::OrganizationType,
            "system: urn:x\nconcepts:\n  - code: a\n    display: A\n  - code: a\n    display: B\n",
        )
        .expect_err("duplicate");
        assert!(matches!(err, ReferenceDataError::DuplicateCode { .. }));
    }
}
