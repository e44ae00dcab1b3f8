//! Request-scoped accumulator for a converted notification.
//!
//! The converter attaches converted items to one of two sections and appends every extracted
//! resource in discovery order. The downstream finisher takes the builder, assigns profiles and
//! metadata, and serialises the final bundle.

use crate::{ExtractedResource, FhirError, ResponseItem};
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleBuilder {
    common_information: Vec<ResponseItem>,
    disease_specific_information: Vec<ResponseItem>,
    resources: Vec<ExtractedResource>,
}

impl BundleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_common_information(&mut self, items: impl IntoIterator<Item = ResponseItem>) {
        self.common_information.extend(items);
    }

    pub fn add_disease_specific_information(
        &mut self,
        items: impl IntoIterator<Item = ResponseItem>,
    ) {
        self.disease_specific_information.extend(items);
    }

    /// Appends an extracted resource. Order of calls is preserved.
    pub fn add_resource(&mut self, resource: ExtractedResource) {
        self.resources.push(resource);
    }

    /// Moves everything accumulated in `other` onto the end of this builder.
    pub fn append(&mut self, other: BundleBuilder) {
        self.common_information.extend(other.common_information);
        self.disease_specific_information
            .extend(other.disease_specific_information);
        self.resources.extend(other.resources);
    }

    pub fn common_information(&self) -> &[ResponseItem] {
        &self.common_information
    }

    pub fn disease_specific_information(&self) -> &[ResponseItem] {
        &self.disease_specific_information
    }

    pub fn resources(&self) -> &[ExtractedResource] {
        &self.resources
    }

    /// Render the accumulated sections and resources as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] if serialisation fails.
    pub fn to_json(&self) -> Result<serde_json::Value, FhirError> {
        serde_json::to_value(self)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise bundle: {e}")))
    }

    /// Render as pretty-printed JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] if serialisation fails.
    pub fn to_json_pretty(&self) -> Result<String, FhirError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise bundle: {e}")))
    }
}
