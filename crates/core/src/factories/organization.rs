//! Organization extraction.
//!
//! Shape (nested under the item's first answer):
//!
//! ```text
//! Organization
//! ├── name            string, required
//! ├── type            coding (organization-type table)
//! ├── address
//! │   ├── street, houseNumber, postalCode, city, country
//! │   └── use         coding (address-use table)
//! └── contact
//!     └── phone, email, url
//! ```

use super::{has_nested_shape, nested_shape, ResourceFactory, SubItems};
use crate::answers::Item;
use crate::code_systems::CodeSystemKey;
use crate::constants::ORGANIZATION_LINK_ID;
use crate::context::ConversionContext;
use crate::dispatcher::Dispatcher;
use crate::{ConversionError, ConversionResult};
use fhir::resources::ADDRESS_USE_EXTENSION_URL;
use fhir::{
    Address, CodeableConcept, ContactPoint, ContactPointSystem, ExtractedResource, Extension,
    NonEmptyText, Organization,
};

const NAME: &str = "name";
const TYPE: &str = "type";
const ADDRESS: &str = "address";
const STREET: &str = "street";
const HOUSE_NUMBER: &str = "houseNumber";
const POSTAL_CODE: &str = "postalCode";
const CITY: &str = "city";
const COUNTRY: &str = "country";
const ADDRESS_USE: &str = "use";
const CONTACT: &str = "contact";

const CONTACT_SYSTEMS: [(&str, ContactPointSystem); 3] = [
    ("phone", ContactPointSystem::Phone),
    ("email", ContactPointSystem::Email),
    ("url", ContactPointSystem::Url),
];

/// Recognises any item whose nested shape is `Organization`.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrganizationFactory;

impl ResourceFactory for OrganizationFactory {
    fn name(&self) -> &'static str {
        "organization"
    }

    fn recognizes(&self, dispatcher: &Dispatcher, item: &Item) -> bool {
        has_nested_shape(dispatcher, item, ORGANIZATION_LINK_ID)
    }

    fn extract(
        &self,
        ctx: &mut ConversionContext<'_>,
        item: &Item,
    ) -> ConversionResult<ExtractedResource> {
        let shape = SubItems::of(nested_shape(ctx.dispatcher(), item, ORGANIZATION_LINK_ID)?);

        let name = NonEmptyText::new(shape.required_text(ctx, NAME)?)
            .map_err(|e| ConversionError::InvalidInput(format!("organization name: {e}")))?;
        let kind = shape
            .coding(ctx, TYPE)?
            .map(|c| ctx.canonical_coding(CodeSystemKey::OrganizationType, c))
            .map(CodeableConcept::from)
            .into_iter()
            .collect();
        let address = match shape.group(ctx, ADDRESS) {
            Some(group) => Some(address(ctx, group)?),
            None => None,
        };
        let telecom = match shape.group(ctx, CONTACT) {
            Some(group) => telecom(ctx, group)?,
            None => Vec::new(),
        };

        Ok(ExtractedResource::Organization(Organization {
            id: ctx.next_id(),
            kind,
            name,
            telecom,
            address: address.into_iter().collect(),
        }))
    }
}

fn address(ctx: &ConversionContext<'_>, group: SubItems<'_>) -> ConversionResult<Address> {
    let street = group.text(ctx, STREET)?;
    let house_number = group.text(ctx, HOUSE_NUMBER)?;
    let line = match (street, house_number) {
        (Some(street), Some(number)) => Some(format!("{street} {number}")),
        (Some(street), None) => Some(street),
        (None, Some(number)) => Some(number),
        (None, None) => None,
    };

    let extension = group
        .coding(ctx, ADDRESS_USE)?
        .map(|c| Extension {
            url: ADDRESS_USE_EXTENSION_URL.to_string(),
            value_coding: ctx.canonical_coding(CodeSystemKey::AddressUse, c),
        })
        .into_iter()
        .collect();

    Ok(Address {
        extension,
        line: line.into_iter().collect(),
        city: group.text(ctx, CITY)?,
        postal_code: group.text(ctx, POSTAL_CODE)?,
        country: group.text(ctx, COUNTRY)?,
    })
}

fn telecom(
    ctx: &ConversionContext<'_>,
    group: SubItems<'_>,
) -> ConversionResult<Vec<ContactPoint>> {
    let mut points = Vec::new();
    for (link_id, system) in CONTACT_SYSTEMS {
        if let Some(value) = group.text(ctx, link_id)? {
            points.push(ContactPoint { system, value });
        }
    }
    Ok(points)
}
