//! Immunization record extraction.
//!
//! Shape under `immunizationRef` (notified person) or `immunizationMotherRef` (mother):
//!
//! ```text
//! Immunization
//! ├── vaccineCode   coding, required
//! ├── occurrence    date or dateTime, required
//! └── note          string
//! ```

use super::{has_nested_shape, nested_shape, ResourceFactory, SubItems};
use crate::answers::Item;
use crate::constants::{
    IMMUNIZATION_LINK_ID, IMMUNIZATION_MOTHER_REF_LINK_ID, IMMUNIZATION_REF_LINK_ID,
};
use crate::context::ConversionContext;
use crate::dispatcher::Dispatcher;
use crate::ConversionResult;
use fhir::{
    Annotation, CodeableConcept, ExtractedResource, Immunization, ImmunizationStatus,
    ImmunizationSubject,
};

const VACCINE_CODE: &str = "vaccineCode";
const OCCURRENCE: &str = "occurrence";
const NOTE: &str = "note";

#[derive(Clone, Copy, Debug, Default)]
pub struct ImmunizationFactory;

fn subject_for(item: &Item) -> Option<ImmunizationSubject> {
    if item.link_id == IMMUNIZATION_REF_LINK_ID {
        Some(ImmunizationSubject::NotifiedPerson)
    } else if item.link_id == IMMUNIZATION_MOTHER_REF_LINK_ID {
        Some(ImmunizationSubject::Mother)
    } else {
        None
    }
}

impl ResourceFactory for ImmunizationFactory {
    fn name(&self) -> &'static str {
        "immunization"
    }

    fn recognizes(&self, dispatcher: &Dispatcher, item: &Item) -> bool {
        subject_for(item).is_some() && has_nested_shape(dispatcher, item, IMMUNIZATION_LINK_ID)
    }

    fn extract(
        &self,
        ctx: &mut ConversionContext<'_>,
        item: &Item,
    ) -> ConversionResult<ExtractedResource> {
        let shape = SubItems::of(nested_shape(ctx.dispatcher(), item, IMMUNIZATION_LINK_ID)?);
        let subject = subject_for(item).unwrap_or(ImmunizationSubject::NotifiedPerson);

        let vaccine_code = CodeableConcept::from(shape.required_coding(ctx, VACCINE_CODE)?);
        let occurrence_date_time = shape.required_date_time(ctx, OCCURRENCE)?;
        let note = shape
            .text(ctx, NOTE)?
            .map(|text| Annotation { text })
            .into_iter()
            .collect();

        Ok(ExtractedResource::Immunization(Immunization {
            id: ctx.next_id(),
            status: ImmunizationStatus::Completed,
            vaccine_code,
            occurrence_date_time,
            note,
            subject,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factories::test_support::{build, item, recognizes};
    use crate::ConversionError;
    use fhir::{DateTimePrecision, TypedValue};
    use serde_json::json;

    fn immunization_item(link_id: &str, shape_items: serde_json::Value) -> Item {
        item(json!({
            "linkId": link_id,
            "answer": [{"item": [{"linkId": "Immunization", "item": shape_items}]}]
        }))
    }

    fn immunization(resource: &ExtractedResource) -> &Immunization {
        match resource {
            ExtractedResource::Immunization(i) => i,
            other => panic!("expected Immunization, got {other:?}"),
        }
    }

    fn complete_shape() -> serde_json::Value {
        json!([
            {"linkId": "vaccineCode", "answer": [{"valueCoding": {
                "system": "https://ec.europa.eu/health/documents/community-register/html/",
                "code": "EU/1/20/1528",
                "display": "Comirnaty"
            }}]},
            {"linkId": "occurrence", "answer": [{"valueDate": "03.2021"}]},
            {"linkId": "note", "answer": [{"valueString": "second dose"}]}
        ])
    }

    #[test]
    fn recognises_both_subject_link_ids() {
        let factory = ImmunizationFactory;
        for link_id in ["immunizationRef", "immunizationMotherRef"] {
            assert!(recognizes(&factory, &immunization_item(link_id, complete_shape())));
        }
        assert!(!recognizes(&factory, &immunization_item("vaccination", complete_shape())));
    }

    #[test]
    fn builds_completed_record_for_notified_person() {
        let tree = immunization_item("immunizationRef", complete_shape());
        let (result, bundle) = build(&ImmunizationFactory, &tree);
        let reference_item = result.expect("immunization builds");

        let record = immunization(&bundle.resources()[0]);
        assert_eq!(record.status, ImmunizationStatus::Completed);
        assert_eq!(record.subject, ImmunizationSubject::NotifiedPerson);
        assert_eq!(record.vaccine_code.coding[0].code, "EU/1/20/1528");
        assert_eq!(record.occurrence_date_time.precision(), DateTimePrecision::Month);
        assert_eq!(record.occurrence_date_time.to_string(), "2021-03");
        assert_eq!(record.note[0].text, "second dose");

        assert_eq!(
            reference_item.answers[0].value,
            Some(TypedValue::Reference(bundle.resources()[0].reference()))
        );
    }

    #[test]
    fn mother_link_id_sets_subject() {
        let tree = immunization_item("immunizationMotherRef", complete_shape());
        let (result, bundle) = build(&ImmunizationFactory, &tree);
        result.expect("immunization builds");
        assert_eq!(
            immunization(&bundle.resources()[0]).subject,
            ImmunizationSubject::Mother
        );
    }

    #[test]
    fn note_is_optional() {
        let tree = immunization_item(
            "immunizationRef",
            json!([
                {"linkId": "vaccineCode", "answer": [{"valueCoding": {"code": "J07BX03"}}]},
                {"linkId": "occurrence", "answer": [{"valueDateTime": "12.05.2021 10:15"}]}
            ]),
        );
        let (result, bundle) = build(&ImmunizationFactory, &tree);
        result.expect("immunization builds");

        let record = immunization(&bundle.resources()[0]);
        assert!(record.note.is_empty());
        assert_eq!(record.occurrence_date_time.precision(), DateTimePrecision::Second);
    }

    #[test]
    fn missing_vaccine_code_is_structural_error() {
        let tree = immunization_item(
            "immunizationRef",
            json!([{"linkId": "occurrence", "answer": [{"valueDate": "2021"}]}]),
        );
        let (result, bundle) = build(&ImmunizationFactory, &tree);
        let err = result.expect_err("vaccine code is required");
        match err {
            ConversionError::MissingSubItem { parent, expected } => {
                assert_eq!(parent, "Immunization");
                assert_eq!(expected, "vaccineCode");
            }
            other => panic!("expected MissingSubItem error, got {other:?}"),
        }
        assert!(bundle.resources().is_empty());
    }

    #[test]
    fn occurrence_must_be_a_date() {
        let tree = immunization_item(
            "immunizationRef",
            json!([
                {"linkId": "vaccineCode", "answer": [{"valueCoding": {"code": "J07BX03"}}]},
                {"linkId": "occurrence", "answer": [{"valueBoolean": true}]}
            ]),
        );
        let err = build(&ImmunizationFactory, &tree).0.expect_err("boolean occurrence");
        assert!(matches!(
            err,
            ConversionError::UnexpectedValue { expected: "dateTime", found: "boolean", .. }
        ));
    }
}
