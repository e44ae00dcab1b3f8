//! Recursive answer-tree conversion.
//!
//! [`TreeWalker::convert`] returns a list so that one input item can expand into several
//! output items (repeat sections) or none (pruned subtrees). The cases are tried in order:
//!
//! 1. empty item: nothing
//! 2. repeat-section wrapper: its converted children, concatenated
//! 3. a recognised resource shape: one reference item from the owning factory
//! 4. anything else: the item rebuilt from its resolved answers and converted children

use crate::answers::{Answer, Item};
use crate::constants::REPEAT_SECTION_PREFIX;
use crate::context::ConversionContext;
use crate::factories::{standard_factories, ResourceFactory};
use crate::pruning::{is_empty_answer, is_empty_item};
use crate::ConversionResult;
use fhir::{ResponseAnswer, ResponseItem};

pub struct TreeWalker {
    factories: Vec<Box<dyn ResourceFactory>>,
}

impl Default for TreeWalker {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for TreeWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.factories.iter().map(|r| r.name()))
            .finish()
    }
}

impl TreeWalker {
    /// Walker over [`standard_factories`].
    pub fn standard() -> Self {
        Self::with_factories(standard_factories())
    }

    pub fn with_factories(factories: Vec<Box<dyn ResourceFactory>>) -> Self {
        Self { factories }
    }

    /// Converts one item.
    ///
    /// # Errors
    ///
    /// Propagates the first resolver or factory error; nothing is returned for the rest of
    /// the subtree in that case.
    pub fn convert(
        &self,
        ctx: &mut ConversionContext<'_>,
        item: &Item,
    ) -> ConversionResult<Vec<ResponseItem>> {
        if is_empty_item(ctx.dispatcher(), item) {
            tracing::trace!(link_id = %item.link_id, "pruned empty item");
            return Ok(Vec::new());
        }

        if item.link_id.starts_with(REPEAT_SECTION_PREFIX) {
            return self.expand_repeat_section(ctx, item);
        }

        if let Some(factory) = self.factories.iter().find(|f| f.recognizes(ctx.dispatcher(), item)) {
            tracing::debug!(
                link_id = %item.link_id,
                factory = factory.name(),
                "extracting resource"
            );
            return Ok(vec![factory.build(ctx, item)?]);
        }

        let converted = self.rebuild(ctx, item)?;
        if converted.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![converted])
    }

    /// Converts a list of sibling items, flattening the results in order.
    pub fn convert_all<'i>(
        &self,
        ctx: &mut ConversionContext<'_>,
        items: impl IntoIterator<Item = &'i Item>,
    ) -> ConversionResult<Vec<ResponseItem>> {
        let mut out = Vec::new();
        for item in items {
            out.extend(self.convert(ctx, item)?);
        }
        Ok(out)
    }

    fn expand_repeat_section(
        &self,
        ctx: &mut ConversionContext<'_>,
        item: &Item,
    ) -> ConversionResult<Vec<ResponseItem>> {
        let dropped = item
            .answers
            .iter()
            .filter(|a| !is_empty_answer(ctx.dispatcher(), a))
            .count();
        if dropped > 0 {
            tracing::warn!(
                link_id = %item.link_id,
                dropped,
                "repeat section wrapper carries answers; only child items are kept"
            );
        }

        let repetitions = self.convert_all(ctx, &item.items)?;
        tracing::debug!(
            link_id = %item.link_id,
            repetitions = repetitions.len(),
            "expanded repeat section"
        );
        Ok(repetitions)
    }

    fn rebuild(
        &self,
        ctx: &mut ConversionContext<'_>,
        item: &Item,
    ) -> ConversionResult<ResponseItem> {
        let mut out = ResponseItem::new(item.link_id.clone());
        out.text = item.text.clone();

        for answer in &item.answers {
            if is_empty_answer(ctx.dispatcher(), answer) {
                continue;
            }
            let converted = self.convert_answer(ctx, answer)?;
            if !converted.is_empty() {
                out.answers.push(converted);
            }
        }

        out.items = self.convert_all(ctx, &item.items)?;
        Ok(out)
    }

    fn convert_answer(
        &self,
        ctx: &mut ConversionContext<'_>,
        answer: &Answer,
    ) -> ConversionResult<ResponseAnswer> {
        let value = if ctx.has_value(answer) {
            Some(ctx.resolve(answer)?)
        } else {
            None
        };
        let items = self.convert_all(ctx, &answer.items)?;
        Ok(ResponseAnswer { value, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_systems::CodeSystems;
    use crate::dispatcher::Dispatcher;
    use crate::ConversionError;
    use fhir::{BundleBuilder, FhirError, TypedValue};
    use intake_uuid::SequentialIdSource;
    use serde_json::json;

    fn item(value: serde_json::Value) -> Item {
        serde_json::from_value(value).expect("valid item json")
    }

    fn run(tree: &Item) -> (ConversionResult<Vec<ResponseItem>>, BundleBuilder) {
        let dispatcher = Dispatcher::standard();
        let tables = CodeSystems::bundled().expect("bundled tables");
        let mut ids = SequentialIdSource::new();
        let mut bundle = BundleBuilder::new();
        let result = {
            let mut ctx = ConversionContext::new(&dispatcher, &tables, &mut ids, &mut bundle);
            TreeWalker::standard().convert(&mut ctx, tree)
        };
        (result, bundle)
    }

    fn convert(tree: &Item) -> Vec<ResponseItem> {
        run(tree).0.expect("conversion succeeds")
    }

    fn assert_no_empty_nodes(items: &[ResponseItem]) {
        for i in items {
            assert!(!i.is_empty(), "empty item {}", i.link_id);
            for a in &i.answers {
                assert!(!a.is_empty(), "empty answer under {}", i.link_id);
                assert_no_empty_nodes(&a.items);
            }
            assert_no_empty_nodes(&i.items);
        }
    }

    fn symptoms() -> Item {
        item(json!({
            "linkId": "clinical",
            "text": "Clinical details",
            "item": [
                {"linkId": "onset", "answer": [{"valueDate": "10.07.2024"}]},
                {"linkId": "unanswered"},
                {"linkId": "fever", "answer": [{"valueBoolean": true}, {}]},
                {"linkId": "temperature", "answer": [{"valueQuantity": {
                    "value": 39.2, "unit": "Cel", "system": "http://unitsofmeasure.org", "code": "Cel"
                }}]},
                {"linkId": "interpretation", "answer": [{"valueCoding": {
                    "system": "http://terminology.hl7.org/CodeSystem/v3-ObservationInterpretation",
                    "code": "POS"
                }}]},
                {"linkId": "comment", "answer": [{"valueString": ""}]}
            ]
        }))
    }

    #[test]
    fn empty_item_converts_to_nothing() {
        let tree = item(json!({"linkId": "x", "answer": [{}], "item": [{"linkId": "y"}]}));
        assert!(convert(&tree).is_empty());
    }

    #[test]
    fn valueless_answer_is_pruned_without_dispatching() {
        let tree = item(json!({
            "linkId": "x",
            "answer": [{"valueInteger": 3}, {}]
        }));
        let out = convert(&tree);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].answers.len(), 1);
        assert_eq!(out[0].answers[0].value, Some(TypedValue::Integer(3)));
    }

    #[test]
    fn rebuild_keeps_order_and_text_and_drops_empty_children() {
        let out = convert(&symptoms());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text.as_deref(), Some("Clinical details"));

        let links: Vec<_> = out[0].items.iter().map(|i| i.link_id.as_str()).collect();
        assert_eq!(links, ["onset", "fever", "temperature", "interpretation"]);
        assert_eq!(out[0].items[1].answers.len(), 1);
        assert_no_empty_nodes(&out);
    }

    #[test]
    fn codings_are_enriched_with_table_display() {
        let out = convert(&symptoms());
        match &out[0].items[3].answers[0].value {
            Some(TypedValue::Coding(c)) => assert_eq!(c.display.as_deref(), Some("Positive")),
            other => panic!("expected coding, got {other:?}"),
        }
    }

    #[test]
    fn repeat_section_flattens_into_siblings() {
        let tree = item(json!({
            "linkId": "repeat-contacts",
            "item": [
                {"linkId": "contact", "answer": [{"valueString": "first"}]},
                {"linkId": "contact"},
                {"linkId": "contact", "answer": [{"valueString": "second"}]},
                {"linkId": "contact", "answer": [{"valueString": "third"}]}
            ]
        }));
        let out = convert(&tree);
        assert_eq!(out.len(), 3);
        let values: Vec<_> = out
            .iter()
            .map(|i| match &i.answers[0].value {
                Some(TypedValue::String(s)) => s.as_str(),
                other => panic!("expected string, got {other:?}"),
            })
            .collect();
        assert_eq!(values, ["first", "second", "third"]);
    }

    #[test]
    fn nested_repeat_sections_flatten_into_answer_children() {
        let tree = item(json!({
            "linkId": "exposures",
            "answer": [{"valueBoolean": true, "item": [{
                "linkId": "repeat-exposure",
                "item": [
                    {"linkId": "place", "answer": [{"valueString": "school"}]},
                    {"linkId": "place", "answer": [{"valueString": "home"}]}
                ]
            }]}]
        }));
        let out = convert(&tree);
        let children = &out[0].answers[0].items;
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|i| i.link_id == "place"));
    }

    #[test]
    fn repeat_wrapper_with_only_answers_produces_nothing() {
        let tree = item(json!({
            "linkId": "repeat-x",
            "answer": [{"valueString": "stray"}]
        }));
        assert!(convert(&tree).is_empty());
    }

    #[test]
    fn conversion_is_idempotent_on_pruned_trees() {
        let first = convert(&symptoms());
        let rendered = serde_json::to_value(&first[0]).expect("render item");

        let reparsed: Item = serde_json::from_value(rendered.clone()).expect("output is an item");
        let second = convert(&reparsed);
        assert_eq!(serde_json::to_value(&second[0]).expect("render item"), rendered);
    }

    #[test]
    fn time_out_of_range_aborts_conversion() {
        let tree = item(json!({"linkId": "t", "answer": [{"valueTime": "25:00"}]}));
        let err = run(&tree).0.expect_err("hour 25");
        match err {
            ConversionError::Format(FhirError::InvalidTime { literal, .. }) => {
                assert_eq!(literal, "25:00")
            }
            other => panic!("expected Format error, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_value_aborts_conversion() {
        let tree = item(json!({
            "linkId": "report",
            "answer": [{"valueAttachment": {"title": "scan"}}]
        }));
        let err = run(&tree).0.expect_err("attachments are unsupported");
        assert!(matches!(err, ConversionError::DispatcherExhausted { .. }));
    }

    #[test]
    fn hospitalization_subtree_is_replaced_by_reference() {
        let tree = item(json!({
            "linkId": "hospitalizedEncounter",
            "answer": [{"item": [{
                "linkId": "Hospitalization",
                "item": [{
                    "linkId": "period",
                    "item": [{"linkId": "start", "answer": [{"valueDate": "01.01.2024"}]}]
                }]
            }]}]
        }));
        let (result, bundle) = run(&tree);
        let out = result.expect("hospitalization converts");

        assert_eq!(bundle.resources().len(), 1);
        let expected = bundle.resources()[0].reference();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].link_id, "hospitalizedEncounter");
        assert_eq!(out[0].answers[0].value, Some(TypedValue::Reference(expected)));
        assert!(out[0].answers[0].items.is_empty());
    }

    #[test]
    fn leading_empty_answer_does_not_hide_an_organization() {
        let tree = item(json!({
            "linkId": "notifierFacility",
            "answer": [
                {},
                {"item": [{
                    "linkId": "Organization",
                    "item": [{"linkId": "name", "answer": [{"valueString": "Labor"}]}]
                }]}
            ]
        }));
        let (result, bundle) = run(&tree);
        let out = result.expect("organization converts");

        assert_eq!(bundle.resources().len(), 1);
        assert_eq!(bundle.resources()[0].resource_type(), "Organization");
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].answers[0].value,
            Some(TypedValue::Reference(bundle.resources()[0].reference()))
        );
    }
}
