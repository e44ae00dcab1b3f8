//! Constants used throughout the intake core crate.
//!
//! Link ids the resource factories recognise, the repeat-section marker and the reference
//! data file names live here so the questionnaire contract is visible in one place.

/// Link id prefix of a repeat-section wrapper item.
pub const REPEAT_SECTION_PREFIX: &str = "repeat-";

/// Nested link id marking an organization subtree.
pub const ORGANIZATION_LINK_ID: &str = "Organization";

/// Link id of the item holding a hospitalization episode.
pub const HOSPITALIZED_ENCOUNTER_LINK_ID: &str = "hospitalizedEncounter";

/// Nested link id marking a hospitalization subtree.
pub const HOSPITALIZATION_LINK_ID: &str = "Hospitalization";

/// Link id of the item holding the notified person's immunization.
pub const IMMUNIZATION_REF_LINK_ID: &str = "immunizationRef";

/// Link id of the item holding the mother's immunization.
pub const IMMUNIZATION_MOTHER_REF_LINK_ID: &str = "immunizationMotherRef";

/// Nested link id marking an immunization subtree.
pub const IMMUNIZATION_LINK_ID: &str = "Immunization";

/// Environment variable the binaries read to override the bundled reference data.
pub const REFERENCE_DATA_DIR_ENV: &str = "INTAKE_REFERENCE_DATA_DIR";

/// Reference data directory searched relative to the working directory.
pub const REFERENCE_DATA_DIR: &str = "crates/core/reference";
