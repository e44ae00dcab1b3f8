//! Raw answer tree as received from the questionnaire client.
//!
//! The tree is deserialised from camelCase JSON after the upstream layer has validated its
//! structure. Value literals are kept as sent; the resolvers re-validate them.
//!
//! An [`Answer`] has one optional slot per supported value shape. Well-formed input fills at
//! most one. Keys this model does not know are collected in [`Answer::other`], which lets the
//! dispatcher tell an unsupported `value*` shape apart from an answer without a value.

use crate::{ConversionError, ConversionResult};
use intake_types::LinkId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A questionnaire item.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub link_id: LinkId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, rename = "answer", skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<Answer>,

    #[serde(default, rename = "item", skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
}

impl Item {
    pub fn new(link_id: LinkId) -> Self {
        Self {
            link_id,
            text: None,
            answers: Vec::new(),
            items: Vec::new(),
        }
    }
}

/// A questionnaire answer.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_decimal: Option<serde_json::Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_integer: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_date_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_coding: Option<RawCoding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<RawQuantity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_reference: Option<RawReference>,

    #[serde(default, rename = "item", skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,

    /// Members this model does not map (`id`, `extension`, `valueAttachment`, ...).
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

/// Blank strings are what form clients send for untouched fields; they count as absent.
fn present(slot: &Option<String>) -> Option<&String> {
    slot.as_ref().filter(|s| !s.trim().is_empty())
}

impl Answer {
    pub fn string(&self) -> Option<&String> {
        present(&self.value_string)
    }

    pub fn boolean(&self) -> Option<&bool> {
        self.value_boolean.as_ref()
    }

    pub fn decimal(&self) -> Option<&serde_json::Number> {
        self.value_decimal.as_ref()
    }

    pub fn integer(&self) -> Option<&i32> {
        self.value_integer.as_ref()
    }

    pub fn date(&self) -> Option<&String> {
        present(&self.value_date)
    }

    pub fn date_time(&self) -> Option<&String> {
        present(&self.value_date_time)
    }

    pub fn time(&self) -> Option<&String> {
        present(&self.value_time)
    }

    pub fn uri(&self) -> Option<&String> {
        present(&self.value_uri)
    }

    pub fn coding(&self) -> Option<&RawCoding> {
        self.value_coding.as_ref()
    }

    pub fn quantity(&self) -> Option<&RawQuantity> {
        self.value_quantity.as_ref().filter(|q| !q.is_blank())
    }

    pub fn reference(&self) -> Option<&RawReference> {
        self.value_reference.as_ref()
    }

    /// Names of `value*` members this model has no slot for.
    pub fn unsupported_value_shapes(&self) -> impl Iterator<Item = &str> {
        self.other
            .iter()
            .filter(|(key, value)| key.starts_with("value") && !value.is_null())
            .map(|(key, _)| key.as_str())
    }

    /// Returns `true` if any value slot is populated, supported or not.
    pub fn carries_value(&self) -> bool {
        self.string().is_some()
            || self.boolean().is_some()
            || self.decimal().is_some()
            || self.integer().is_some()
            || self.date().is_some()
            || self.date_time().is_some()
            || self.time().is_some()
            || self.uri().is_some()
            || self.coding().is_some()
            || self.quantity().is_some()
            || self.reference().is_some()
            || self.unsupported_value_shapes().next().is_some()
    }

    /// Compact JSON form used in diagnostics.
    pub fn to_diagnostic_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// `valueCoding` as sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCoding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// `valueQuantity` as sent. The comparator is the questionnaire enum code (`LT`, `LE`, ...).
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuantity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl RawQuantity {
    /// `true` when no member is filled in.
    pub fn is_blank(&self) -> bool {
        self.value.is_none()
            && present(&self.comparator).is_none()
            && present(&self.unit).is_none()
            && present(&self.system).is_none()
            && present(&self.code).is_none()
    }
}

/// `valueReference` as sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// A complete notification answer tree: the common section and the disease-specific section.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnswerTree {
    #[serde(default)]
    pub common_information: Vec<Item>,

    #[serde(default)]
    pub disease_specific_information: Vec<Item>,
}

impl AnswerTree {
    /// Parse an answer tree from JSON text.
    ///
    /// This uses `serde_path_to_error` to surface a best-effort path (e.g.
    /// `commonInformation[0].answer[1].valueInteger`) to the failing member.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::InvalidTree`] if the JSON does not match the tree shape.
    pub fn from_json(text: &str) -> ConversionResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(text);
        serde_path_to_error::deserialize::<_, AnswerTree>(&mut deserializer).map_err(|err| {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>".to_string()
            } else {
                path
            };
            ConversionError::InvalidTree {
                path,
                message: source.to_string(),
            }
        })
    }
}
