//! Hospitalization episode extraction.
//!
//! Shape under `hospitalizedEncounter`:
//!
//! ```text
//! Hospitalization
//! ├── period            required
//! │   ├── start         date or dateTime, required
//! │   └── end           date or dateTime
//! ├── serviceType       coding
//! └── serviceProvider   nested Organization shape or valueReference
//! ```

use super::{has_nested_shape, nested_shape, OrganizationFactory, ResourceFactory, SubItems};
use crate::answers::Item;
use crate::constants::{
    HOSPITALIZATION_LINK_ID, HOSPITALIZED_ENCOUNTER_LINK_ID, ORGANIZATION_LINK_ID,
};
use crate::context::ConversionContext;
use crate::dispatcher::Dispatcher;
use crate::{ConversionError, ConversionResult};
use fhir::{
    CodeableConcept, Encounter, EncounterStatus, ExtractedResource, Period, Reference, TypedValue,
};

const PERIOD: &str = "period";
const START: &str = "start";
const END: &str = "end";
const SERVICE_TYPE: &str = "serviceType";
const SERVICE_PROVIDER: &str = "serviceProvider";

#[derive(Clone, Copy, Debug, Default)]
pub struct HospitalizationFactory;

impl ResourceFactory for HospitalizationFactory {
    fn name(&self) -> &'static str {
        "hospitalization"
    }

    fn recognizes(&self, dispatcher: &Dispatcher, item: &Item) -> bool {
        item.link_id == HOSPITALIZED_ENCOUNTER_LINK_ID
            && has_nested_shape(dispatcher, item, HOSPITALIZATION_LINK_ID)
    }

    fn extract(
        &self,
        ctx: &mut ConversionContext<'_>,
        item: &Item,
    ) -> ConversionResult<ExtractedResource> {
        let shape = SubItems::of(nested_shape(ctx.dispatcher(), item, HOSPITALIZATION_LINK_ID)?);

        let period_group = SubItems::of(shape.require(ctx, PERIOD)?);
        let period = Period {
            start: period_group.required_date_time(ctx, START)?,
            end: period_group.date_time(ctx, END)?,
        };
        let service_type = shape.coding(ctx, SERVICE_TYPE)?.map(CodeableConcept::from);
        let service_provider = match shape.find(ctx, SERVICE_PROVIDER) {
            Some(provider) => Some(service_provider(ctx, provider)?),
            None => None,
        };

        let status = EncounterStatus::from_period(&period);
        tracing::debug!(status = status.as_str(), "built hospitalization episode");

        Ok(ExtractedResource::Encounter(Encounter {
            id: ctx.next_id(),
            status,
            class: Encounter::inpatient_class(),
            service_type,
            period,
            service_provider,
        }))
    }
}

/// Registers a nested organization, or takes a reference answer as is.
fn service_provider(
    ctx: &mut ConversionContext<'_>,
    provider: &Item,
) -> ConversionResult<Reference> {
    let organizations = OrganizationFactory;
    if organizations.recognizes(ctx.dispatcher(), provider) {
        let organization = organizations.extract(ctx, provider)?;
        return Ok(ctx.register(organization));
    }

    let Some(answer) = provider.answers.iter().find(|a| ctx.has_value(a)) else {
        return Err(ConversionError::MissingSubItem {
            parent: provider.link_id.to_string(),
            expected: ORGANIZATION_LINK_ID.to_string(),
        });
    };
    match ctx.resolve(answer)? {
        TypedValue::Reference(reference) => Ok(reference),
        other => Err(ConversionError::UnexpectedValue {
            link_id: provider.link_id.to_string(),
            expected: "reference",
            found: other.kind(),
        }),
    }
}
