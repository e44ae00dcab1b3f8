//! Converted questionnaire response items.
//!
//! These are the strictly typed counterparts of the raw answer tree: every answer carries a
//! resolved [`TypedValue`] (or only child items), and items are never empty once produced by
//! the converter.

use crate::{LinkId, Reference, TypedValue};
use serde::Serialize;

/// A converted questionnaire item.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseItem {
    pub link_id: LinkId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(rename = "answer", skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<ResponseAnswer>,

    #[serde(rename = "item", skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ResponseItem>,
}

impl ResponseItem {
    /// Creates an item with no answers and no children.
    pub fn new(link_id: LinkId) -> Self {
        Self {
            link_id,
            text: None,
            answers: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Creates the stand-in item for an extracted resource: same link id, a single answer
    /// referencing the resource.
    pub fn reference(link_id: LinkId, reference: Reference) -> Self {
        Self {
            link_id,
            text: None,
            answers: vec![ResponseAnswer::with_value(TypedValue::Reference(reference))],
            items: Vec::new(),
        }
    }

    /// Returns `true` if neither answers nor child items are present.
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty() && self.items.is_empty()
    }
}

/// A converted answer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResponseAnswer {
    #[serde(flatten)]
    pub value: Option<TypedValue>,

    #[serde(rename = "item", skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ResponseItem>,
}

impl ResponseAnswer {
    pub fn with_value(value: TypedValue) -> Self {
        Self {
            value: Some(value),
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.items.is_empty()
    }
}
