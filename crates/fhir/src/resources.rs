//! Resources extracted from recognised answer subtrees.
//!
//! Responsibilities:
//! - Define the Organization, Encounter (hospitalization episode) and Immunization resources
//!   in the subset of fields the intake layer fills in
//! - Serialise them as FHIR JSON with a `resourceType` discriminator
//!
//! Notes:
//! - Profiles, meta and patient references are assigned by the downstream bundle finisher.
//!   Immunizations carry a `subject` role member that the finisher resolves.

use crate::{Coding, FhirDateTime, NonEmptyText, Reference, ResourceId};
use serde::Serialize;

/// Canonical URL of the address-use extension carried on organization addresses.
pub const ADDRESS_USE_EXTENSION_URL: &str =
    "https://demis.rki.de/fhir/StructureDefinition/AddressUse";

/// Code system of the encounter class.
pub const ACT_CODE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v3-ActCode";

// ============================================================================
// Shared data types
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CodeableConcept {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl From<Coding> for CodeableConcept {
    fn from(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            text: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,
    pub value_coding: Coding,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Kind of a contact point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactPointSystem {
    Phone,
    Email,
    Url,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContactPoint {
    pub system: ContactPointSystem,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: FhirDateTime,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<FhirDateTime>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub text: String,
}

// ============================================================================
// Organization
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Organization {
    pub id: ResourceId,

    #[serde(rename = "type", skip_serializing_if = "Vec::is_empty")]
    pub kind: Vec<CodeableConcept>,

    pub name: NonEmptyText,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,
}

// ============================================================================
// Encounter
// ============================================================================

/// Encounter status as derived from the hospitalization period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EncounterStatus {
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "finished")]
    Finished,
}

impl EncounterStatus {
    /// `finished` once a discharge date is known, `in-progress` otherwise.
    pub fn from_period(period: &Period) -> Self {
        if period.end.is_some() {
            Self::Finished
        } else {
            Self::InProgress
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in-progress",
            Self::Finished => "finished",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    pub id: ResourceId,
    pub status: EncounterStatus,
    pub class: Coding,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<CodeableConcept>,

    pub period: Period,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_provider: Option<Reference>,
}

impl Encounter {
    /// Inpatient encounter class.
    pub fn inpatient_class() -> Coding {
        Coding::new(ACT_CODE_SYSTEM, "IMP").with_display("inpatient encounter")
    }
}

// ============================================================================
// Immunization
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImmunizationStatus {
    Completed,
}

/// Whose vaccination an immunization record documents.
///
/// Rendered as the `subject` member (`notified-person` or `mother`); the downstream finisher
/// replaces it with a `patient` reference to the right person.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImmunizationSubject {
    NotifiedPerson,
    Mother,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Immunization {
    pub id: ResourceId,
    pub status: ImmunizationStatus,
    pub vaccine_code: CodeableConcept,
    pub occurrence_date_time: FhirDateTime,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,

    pub subject: ImmunizationSubject,
}

// ============================================================================
// ExtractedResource
// ============================================================================

/// Any resource the converter can pull out of an answer tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "resourceType")]
pub enum ExtractedResource {
    Organization(Organization),
    Encounter(Encounter),
    Immunization(Immunization),
}

impl ExtractedResource {
    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::Organization(_) => "Organization",
            Self::Encounter(_) => "Encounter",
            Self::Immunization(_) => "Immunization",
        }
    }

    pub fn id(&self) -> &ResourceId {
        match self {
            Self::Organization(r) => &r.id,
            Self::Encounter(r) => &r.id,
            Self::Immunization(r) => &r.id,
        }
    }

    /// Relative reference to this resource.
    pub fn reference(&self) -> Reference {
        Reference::to_resource(self.resource_type(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FhirDate;
    use intake_uuid::Uuid;
    use serde_json::json;

    fn id(n: u128) -> ResourceId {
        ResourceId::from_uuid(Uuid::from_u128(n))
    }

    #[test]
    fn encounter_status_follows_period_end() {
        let start = FhirDateTime::parse("01.01.2024").expect("start");
        let open = Period { start, end: None };
        assert_eq!(EncounterStatus::from_period(&open), EncounterStatus::InProgress);

        let closed = Period {
            start,
            end: Some(FhirDateTime::parse("05.01.2024").expect("end")),
        };
        assert_eq!(EncounterStatus::from_period(&closed), EncounterStatus::Finished);
    }

    #[test]
    fn organization_serialises_with_resource_type() {
        let resource = ExtractedResource::Organization(Organization {
            id: id(1),
            kind: Vec::new(),
            name: NonEmptyText::new("Charité").expect("name"),
            telecom: vec![ContactPoint {
                system: ContactPointSystem::Phone,
                value: "030 450 50".into(),
            }],
            address: Vec::new(),
        });

        let value = serde_json::to_value(&resource).expect("serialise organization");
        assert_eq!(
            value,
            json!({
                "resourceType": "Organization",
                "id": "00000000-0000-0000-0000-000000000001",
                "name": "Charité",
                "telecom": [{"system": "phone", "value": "030 450 50"}]
            })
        );
        assert_eq!(
            resource.reference().reference,
            "Organization/00000000-0000-0000-0000-000000000001"
        );
    }

    #[test]
    fn immunization_renders_its_subject_role() {
        let resource = ExtractedResource::Immunization(Immunization {
            id: id(2),
            status: ImmunizationStatus::Completed,
            vaccine_code: Coding::new("http://fhir.de/CodeSystem/bfarm/atc", "J07BD52").into(),
            occurrence_date_time: FhirDate::parse("2023").expect("year").into(),
            note: Vec::new(),
            subject: ImmunizationSubject::Mother,
        });

        let value = serde_json::to_value(&resource).expect("serialise immunization");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["occurrenceDateTime"], "2023");
        assert_eq!(value["subject"], "mother");
    }
}
