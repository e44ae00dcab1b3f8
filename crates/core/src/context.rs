//! Request-scoped conversion state.

use crate::answers::Answer;
use crate::code_systems::{CodeSystemKey, CodeSystems};
use crate::dispatcher::Dispatcher;
use crate::ConversionResult;
use fhir::{BundleBuilder, Coding, ExtractedResource, Reference, ResourceId, TypedValue};
use intake_uuid::IdSource;

/// Everything one conversion pass reads from or writes to.
///
/// The dispatcher and code-system tables are shared and read-only. The identifier source and
/// the bundle builder belong to the current request.
pub struct ConversionContext<'a> {
    dispatcher: &'a Dispatcher,
    code_systems: &'a CodeSystems,
    ids: &'a mut dyn IdSource,
    bundle: &'a mut BundleBuilder,
}

impl<'a> ConversionContext<'a> {
    pub fn new(
        dispatcher: &'a Dispatcher,
        code_systems: &'a CodeSystems,
        ids: &'a mut dyn IdSource,
        bundle: &'a mut BundleBuilder,
    ) -> Self {
        Self {
            dispatcher,
            code_systems,
            ids,
            bundle,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        self.dispatcher
    }

    pub fn code_systems(&self) -> &CodeSystems {
        self.code_systems
    }

    pub fn bundle(&self) -> &BundleBuilder {
        self.bundle
    }

    pub fn has_value(&self, answer: &Answer) -> bool {
        self.dispatcher.has_value(answer)
    }

    /// Resolves an answer and completes a missing coding display from the code-system tables.
    pub fn resolve(&self, answer: &Answer) -> ConversionResult<TypedValue> {
        let mut value = self.dispatcher.resolve(answer)?;
        if let TypedValue::Coding(coding) = &mut value {
            self.code_systems.complete_display(coding);
        }
        Ok(value)
    }

    /// Aligns `coding` with the table named by `key`.
    ///
    /// A coding without a system, or with the table's system, gets the table's system and
    /// display when the table knows its code. Anything else is returned unchanged.
    pub fn canonical_coding(&self, key: CodeSystemKey, coding: Coding) -> Coding {
        let table = self.code_systems.table(key);
        let same_system = coding
            .system
            .as_deref()
            .map_or(true, |system| system == table.system());
        match table.coding(&coding.code) {
            Some(known) if same_system => Coding {
                version: coding.version,
                display: coding.display.or(known.display),
                ..known
            },
            _ => coding,
        }
    }

    pub fn next_id(&mut self) -> ResourceId {
        self.ids.next_id()
    }

    /// Appends a built resource to the bundle and returns a reference to it.
    pub fn register(&mut self, resource: ExtractedResource) -> Reference {
        let reference = resource.reference();
        tracing::debug!(
            resource_type = resource.resource_type(),
            reference = %reference.reference,
            "registered extracted resource"
        );
        self.bundle.add_resource(resource);
        reference
    }
}
