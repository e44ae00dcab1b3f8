//! Resource factories.
//!
//! A factory recognises a fixed nested shape under an item's first non-empty answer, builds a resource
//! from the shape's sub-items, registers it with the bundle and hands back the reference item
//! that replaces the subtree. The registry is closed and tried in registration order.

mod hospitalization;
mod immunization;
mod organization;

pub use hospitalization::HospitalizationFactory;
pub use immunization::ImmunizationFactory;
pub use organization::OrganizationFactory;

use crate::answers::Item;
use crate::context::ConversionContext;
use crate::dispatcher::Dispatcher;
use crate::pruning::{is_empty_answer, is_empty_item};
use crate::{ConversionError, ConversionResult};
use fhir::{Coding, ExtractedResource, FhirDateTime, ResponseItem, TypedValue};

pub trait ResourceFactory: Send + Sync {
    /// Short name, used in logs.
    fn name(&self) -> &'static str;

    /// Returns `true` if `item` has the shape this factory owns. Empty answers and items are
    /// skipped when looking for the shape.
    fn recognizes(&self, dispatcher: &Dispatcher, item: &Item) -> bool;

    /// Builds the resource from a recognised item without registering it.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::MissingSubItem`] if a required sub-item is absent, or any
    /// error from resolving the sub-item values.
    fn extract(
        &self,
        ctx: &mut ConversionContext<'_>,
        item: &Item,
    ) -> ConversionResult<ExtractedResource>;

    /// Extracts and registers the resource, returning the item that stands in for the subtree.
    fn build(
        &self,
        ctx: &mut ConversionContext<'_>,
        item: &Item,
    ) -> ConversionResult<ResponseItem> {
        let resource = self.extract(ctx, item)?;
        let reference = ctx.register(resource);
        Ok(ResponseItem::reference(item.link_id.clone(), reference))
    }
}

/// Organization, Hospitalization, Immunization.
pub fn standard_factories() -> Vec<Box<dyn ResourceFactory>> {
    vec![
        Box::new(OrganizationFactory),
        Box::new(HospitalizationFactory),
        Box::new(ImmunizationFactory),
    ]
}

/// First non-empty child item of the first non-empty answer, where resource subtrees nest.
fn first_nested_item<'i>(dispatcher: &Dispatcher, item: &'i Item) -> Option<&'i Item> {
    item.answers
        .iter()
        .find(|a| !is_empty_answer(dispatcher, a))?
        .items
        .iter()
        .find(|i| !is_empty_item(dispatcher, i))
}

/// Returns `true` if the item's nested shape carries `link_id`.
pub(crate) fn has_nested_shape(dispatcher: &Dispatcher, item: &Item, link_id: &str) -> bool {
    first_nested_item(dispatcher, item).is_some_and(|shape| shape.link_id == link_id)
}

/// The nested shape of a recognised item.
pub(crate) fn nested_shape<'i>(
    dispatcher: &Dispatcher,
    item: &'i Item,
    link_id: &str,
) -> ConversionResult<&'i Item> {
    first_nested_item(dispatcher, item)
        .filter(|shape| shape.link_id == link_id)
        .ok_or_else(|| ConversionError::MissingSubItem {
            parent: item.link_id.to_string(),
            expected: link_id.to_string(),
        })
}

/// Named access to the direct children of a resource shape or group.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SubItems<'i> {
    parent: &'i Item,
}

impl<'i> SubItems<'i> {
    pub(crate) fn of(parent: &'i Item) -> Self {
        Self { parent }
    }

    /// First non-empty child with `link_id`.
    pub(crate) fn find(&self, ctx: &ConversionContext<'_>, link_id: &str) -> Option<&'i Item> {
        self.parent
            .items
            .iter()
            .find(|i| i.link_id == link_id && !is_empty_item(ctx.dispatcher(), i))
    }

    pub(crate) fn require(
        &self,
        ctx: &ConversionContext<'_>,
        link_id: &str,
    ) -> ConversionResult<&'i Item> {
        self.find(ctx, link_id)
            .ok_or_else(|| self.missing(link_id))
    }

    fn missing(&self, link_id: &str) -> ConversionError {
        ConversionError::MissingSubItem {
            parent: self.parent.link_id.to_string(),
            expected: link_id.to_string(),
        }
    }

    /// A nested group, if present.
    pub(crate) fn group(&self, ctx: &ConversionContext<'_>, link_id: &str) -> Option<Self> {
        self.find(ctx, link_id).map(Self::of)
    }

    /// Value of the first value-bearing answer of the child `link_id`.
    pub(crate) fn value(
        &self,
        ctx: &ConversionContext<'_>,
        link_id: &str,
    ) -> ConversionResult<Option<TypedValue>> {
        let Some(item) = self.find(ctx, link_id) else {
            return Ok(None);
        };
        match item.answers.iter().find(|a| ctx.has_value(a)) {
            Some(answer) => ctx.resolve(answer).map(Some),
            None => Ok(None),
        }
    }

    fn required_value(
        &self,
        ctx: &ConversionContext<'_>,
        link_id: &str,
    ) -> ConversionResult<TypedValue> {
        self.value(ctx, link_id)?
            .ok_or_else(|| self.missing(link_id))
    }

    /// Free text from a string or URI answer.
    pub(crate) fn text(
        &self,
        ctx: &ConversionContext<'_>,
        link_id: &str,
    ) -> ConversionResult<Option<String>> {
        self.value(ctx, link_id)?
            .map(|v| expect_text(link_id, v))
            .transpose()
    }

    pub(crate) fn required_text(
        &self,
        ctx: &ConversionContext<'_>,
        link_id: &str,
    ) -> ConversionResult<String> {
        expect_text(link_id, self.required_value(ctx, link_id)?)
    }

    pub(crate) fn coding(
        &self,
        ctx: &ConversionContext<'_>,
        link_id: &str,
    ) -> ConversionResult<Option<Coding>> {
        self.value(ctx, link_id)?
            .map(|v| expect_coding(link_id, v))
            .transpose()
    }

    pub(crate) fn required_coding(
        &self,
        ctx: &ConversionContext<'_>,
        link_id: &str,
    ) -> ConversionResult<Coding> {
        expect_coding(link_id, self.required_value(ctx, link_id)?)
    }

    /// A date-time, promoting date answers.
    pub(crate) fn date_time(
        &self,
        ctx: &ConversionContext<'_>,
        link_id: &str,
    ) -> ConversionResult<Option<FhirDateTime>> {
        self.value(ctx, link_id)?
            .map(|v| expect_date_time(link_id, v))
            .transpose()
    }

    pub(crate) fn required_date_time(
        &self,
        ctx: &ConversionContext<'_>,
        link_id: &str,
    ) -> ConversionResult<FhirDateTime> {
        expect_date_time(link_id, self.required_value(ctx, link_id)?)
    }
}

fn unexpected(link_id: &str, expected: &'static str, found: &TypedValue) -> ConversionError {
    ConversionError::UnexpectedValue {
        link_id: link_id.to_string(),
        expected,
        found: found.kind(),
    }
}

fn expect_text(link_id: &str, value: TypedValue) -> ConversionResult<String> {
    match value {
        TypedValue::String(s) | TypedValue::Uri(s) => Ok(s),
        other => Err(unexpected(link_id, "string", &other)),
    }
}

fn expect_coding(link_id: &str, value: TypedValue) -> ConversionResult<Coding> {
    match value {
        TypedValue::Coding(c) => Ok(c),
        other => Err(unexpected(link_id, "coding", &other)),
    }
}

fn expect_date_time(link_id: &str, value: TypedValue) -> ConversionResult<FhirDateTime> {
    match value {
        TypedValue::DateTime(dt) => Ok(dt),
        TypedValue::Date(d) => Ok(FhirDateTime::from_date(d)),
        other => Err(unexpected(link_id, "dateTime", &other)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::ResourceFactory;
    use crate::answers::Item;
    use crate::code_systems::CodeSystems;
    use crate::context::ConversionContext;
    use crate::dispatcher::Dispatcher;
    use crate::ConversionResult;
    use fhir::{BundleBuilder, ResponseItem};
    use intake_uuid::SequentialIdSource;

    pub(crate) fn item(value: serde_json::Value) -> Item {
        serde_json::from_value(value).expect("valid item json")
    }

    pub(crate) fn recognizes(factory: &dyn ResourceFactory, item: &Item) -> bool {
        factory.recognizes(&Dispatcher::standard(), item)
    }

    /// Runs `factory.build` against a fresh context with sequential identifiers.
    pub(crate) fn build(
        factory: &dyn ResourceFactory,
        item: &Item,
    ) -> (ConversionResult<ResponseItem>, BundleBuilder) {
        let dispatcher = Dispatcher::standard();
        let tables = CodeSystems::bundled().expect("bundled tables");
        let mut ids = SequentialIdSource::new();
        let mut bundle = BundleBuilder::new();
        let result = {
            let mut ctx = ConversionContext::new(&dispatcher, &tables, &mut ids, &mut bundle);
            factory.build(&mut ctx, item)
        };
        (result, bundle)
    }
}
