//! Typed value resolvers.
//!
//! Each resolver pairs a predicate (does the answer populate my slot?) with a converter
//! (validate the literal and build the [`TypedValue`]). The dispatcher tries them in a fixed
//! priority order; see [`standard_resolvers`].

use crate::answers::{Answer, RawCoding, RawQuantity, RawReference};
use crate::{ConversionError, ConversionResult};
use fhir::{
    Coding, FhirDate, FhirDateTime, FhirError, FhirTime, Quantity, QuantityComparator, Reference,
    TypedValue,
};
use rust_decimal::Decimal;
use std::str::FromStr;

/// A single-type predicate and converter.
pub trait Resolver: Send + Sync {
    /// Short type name, used in logs.
    fn name(&self) -> &'static str;

    /// Returns `true` if the answer populates this resolver's value slot.
    fn claims(&self, answer: &Answer) -> bool;

    /// Converts the claimed slot into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Format`] if the literal violates the type's lexical rules,
    /// or [`ConversionError::InvalidInput`] if the answer is not claimed by this resolver.
    fn resolve(&self, answer: &Answer) -> ConversionResult<TypedValue>;
}

/// Resolver over one slot of [`Answer`].
struct SlotResolver<T: 'static> {
    name: &'static str,
    slot: fn(&Answer) -> Option<&T>,
    convert: fn(&T) -> Result<TypedValue, FhirError>,
}

impl<T: 'static> Resolver for SlotResolver<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn claims(&self, answer: &Answer) -> bool {
        (self.slot)(answer).is_some()
    }

    fn resolve(&self, answer: &Answer) -> ConversionResult<TypedValue> {
        let raw = (self.slot)(answer).ok_or_else(|| {
            ConversionError::InvalidInput(format!(
                "{} resolver applied to an answer without a {} value",
                self.name, self.name
            ))
        })?;
        Ok((self.convert)(raw)?)
    }
}

fn slot<T: 'static>(
    name: &'static str,
    slot: fn(&Answer) -> Option<&T>,
    convert: fn(&T) -> Result<TypedValue, FhirError>,
) -> Box<dyn Resolver> {
    Box::new(SlotResolver {
        name,
        slot,
        convert,
    })
}

/// The eleven resolvers in priority order.
///
/// More constrained parsers come before looser ones so that an answer populating several
/// slots resolves deterministically: string, date, coding, reference, dateTime, uri, boolean,
/// quantity, decimal, integer, time.
pub fn standard_resolvers() -> Vec<Box<dyn Resolver>> {
    vec![
        slot("string", Answer::string, |s| Ok(TypedValue::String(s.clone()))),
        slot("date", Answer::date, |s| {
            FhirDate::parse(s).map(TypedValue::Date)
        }),
        slot("coding", Answer::coding, convert_coding),
        slot("reference", Answer::reference, convert_reference),
        slot("dateTime", Answer::date_time, |s| {
            FhirDateTime::parse(s).map(TypedValue::DateTime)
        }),
        slot("uri", Answer::uri, convert_uri),
        slot("boolean", Answer::boolean, |b| Ok(TypedValue::Boolean(*b))),
        slot("quantity", Answer::quantity, convert_quantity),
        slot("decimal", Answer::decimal, |n| {
            to_decimal(n).map(TypedValue::Decimal)
        }),
        slot("integer", Answer::integer, |i| Ok(TypedValue::Integer(*i))),
        slot("time", Answer::time, |s| FhirTime::parse(s).map(TypedValue::Time)),
    ]
}

fn convert_coding(raw: &RawCoding) -> Result<TypedValue, FhirError> {
    let code = raw
        .code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| FhirError::InvalidInput("valueCoding has no code".into()))?;

    Ok(TypedValue::Coding(Coding {
        system: raw.system.clone(),
        version: raw.version.clone(),
        code: code.to_string(),
        display: raw.display.clone(),
    }))
}

fn convert_reference(raw: &RawReference) -> Result<TypedValue, FhirError> {
    let reference = raw
        .reference
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| FhirError::InvalidInput("valueReference has no reference".into()))?;

    Ok(TypedValue::Reference(Reference {
        reference: reference.to_string(),
        display: raw.display.clone(),
    }))
}

fn convert_uri(raw: &String) -> Result<TypedValue, FhirError> {
    if raw.chars().any(char::is_whitespace) {
        return Err(FhirError::InvalidInput(format!(
            "valueUri must not contain whitespace: '{raw}'"
        )));
    }
    Ok(TypedValue::Uri(raw.clone()))
}

fn convert_quantity(raw: &RawQuantity) -> Result<TypedValue, FhirError> {
    let comparator = raw
        .comparator
        .as_deref()
        .map(QuantityComparator::parse)
        .transpose()?;
    let value = raw
        .value
        .as_ref()
        .ok_or_else(|| FhirError::InvalidInput("valueQuantity has no value".into()))
        .and_then(to_decimal)?;

    Ok(TypedValue::Quantity(Quantity {
        value: Some(value),
        comparator,
        unit: raw.unit.clone(),
        system: raw.system.clone(),
        code: raw.code.clone(),
    }))
}

/// Converts a JSON number without going through binary floating point.
fn to_decimal(number: &serde_json::Number) -> Result<Decimal, FhirError> {
    let literal = number.to_string();
    Decimal::from_str(&literal)
        .or_else(|_| Decimal::from_scientific(&literal))
        .map_err(|e| FhirError::InvalidInput(format!("invalid decimal '{literal}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhir::{DatePrecision, DateTimePrecision};
    use serde_json::json;

    fn answer(value: serde_json::Value) -> Answer {
        serde_json::from_value(value).expect("valid answer json")
    }

    fn resolver(name: &str) -> Box<dyn Resolver> {
        standard_resolvers()
            .into_iter()
            .find(|r| r.name() == name)
            .expect("resolver registered")
    }

    #[test]
    fn priority_order_is_fixed() {
        let names: Vec<_> = standard_resolvers().iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            [
                "string",
                "date",
                "coding",
                "reference",
                "dateTime",
                "uri",
                "boolean",
                "quantity",
                "decimal",
                "integer",
                "time"
            ]
        );
    }

    #[test]
    fn each_resolver_claims_only_its_slot() {
        let a = answer(json!({"valueDate": "2024-07-10"}));
        let claimed: Vec<_> = standard_resolvers()
            .into_iter()
            .filter(|r| r.claims(&a))
            .map(|r| r.name())
            .collect();
        assert_eq!(claimed, ["date"]);
    }

    #[test]
    fn date_resolver_infers_precision() {
        let value = resolver("date")
            .resolve(&answer(json!({"valueDate": "07.2024"})))
            .expect("month literal");
        match value {
            TypedValue::Date(d) => assert_eq!(d.precision(), DatePrecision::Month),
            other => panic!("expected date, got {other:?}"),
        }
    }

    #[test]
    fn date_time_resolver_promotes_dates() {
        let value = resolver("dateTime")
            .resolve(&answer(json!({"valueDateTime": "2024"})))
            .expect("year literal");
        match value {
            TypedValue::DateTime(dt) => assert_eq!(dt.precision(), DateTimePrecision::Year),
            other => panic!("expected dateTime, got {other:?}"),
        }
    }

    #[test]
    fn time_resolver_rejects_hour_out_of_range() {
        let err = resolver("time")
            .resolve(&answer(json!({"valueTime": "25:00"})))
            .expect_err("hour 25");
        assert!(matches!(
            err,
            ConversionError::Format(FhirError::InvalidTime { .. })
        ));
    }

    #[test]
    fn quantity_resolver_maps_comparator_and_copies_fields() {
        let value = resolver("quantity")
            .resolve(&answer(json!({"valueQuantity": {
                "value": 42.5,
                "unit": "mg",
                "system": "http://unitsofmeasure.org",
                "code": "mg",
                "comparator": "LT"
            }})))
            .expect("valid quantity");
        match value {
            TypedValue::Quantity(q) => {
                assert_eq!(q.value, Some(Decimal::new(425, 1)));
                assert_eq!(q.comparator, Some(QuantityComparator::LessThan));
                assert_eq!(q.comparator.map(|c| c.name()), Some("less-than"));
                assert_eq!(q.unit.as_deref(), Some("mg"));
                assert_eq!(q.system.as_deref(), Some("http://unitsofmeasure.org"));
                assert_eq!(q.code.as_deref(), Some("mg"));
            }
            other => panic!("expected quantity, got {other:?}"),
        }
    }

    #[test]
    fn quantity_resolver_rejects_unknown_comparator() {
        let err = resolver("quantity")
            .resolve(&answer(json!({"valueQuantity": {"value": 1, "comparator": "EQ"}})))
            .expect_err("EQ is not a comparator");
        assert!(matches!(
            err,
            ConversionError::Format(FhirError::InvalidComparator(_))
        ));
    }

    #[test]
    fn quantity_without_value_is_rejected() {
        let err = resolver("quantity")
            .resolve(&answer(json!({"valueQuantity": {"unit": "mg"}})))
            .expect_err("unit without value");
        assert!(matches!(err, ConversionError::Format(FhirError::InvalidInput(_))));
    }

    #[test]
    fn blank_quantity_is_absent() {
        let blank = answer(json!({"valueQuantity": {}}));
        assert!(blank.quantity().is_none());
        assert!(!crate::Dispatcher::standard().has_value(&blank));
    }

    #[test]
    fn decimal_resolver_keeps_literal_digits() {
        let value = resolver("decimal")
            .resolve(&answer(json!({"valueDecimal": 0.1})))
            .expect("decimal");
        assert_eq!(value, TypedValue::Decimal(Decimal::new(1, 1)));
    }

    #[test]
    fn coding_without_code_is_a_format_error() {
        let err = resolver("coding")
            .resolve(&answer(json!({"valueCoding": {"system": "http://loinc.org"}})))
            .expect_err("missing code");
        assert!(matches!(err, ConversionError::Format(_)));
    }

    #[test]
    fn uri_with_whitespace_is_rejected() {
        assert!(resolver("uri")
            .resolve(&answer(json!({"valueUri": "http://exa mple.org"})))
            .is_err());
    }

    #[test]
    fn resolving_an_unclaimed_answer_is_an_error() {
        let err = resolver("integer")
            .resolve(&answer(json!({"valueString": "12"})))
            .expect_err("not an integer answer");
        assert!(matches!(err, ConversionError::InvalidInput(_)));
    }
}
