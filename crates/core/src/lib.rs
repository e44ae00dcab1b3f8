//! # Intake Core
//!
//! Converts questionnaire answer trees into typed response items and extracted resources.
//!
//! This crate contains the conversion engine only:
//! - Typed value resolvers and the ordered dispatcher
//! - Emptiness rules and the recursive tree walker
//! - Resource factories for organizations, hospitalization episodes and immunizations
//! - Read-only code-system tables loaded once at startup
//!
//! **No transport concerns**: request routing, schema validation and the finishing of the
//! outgoing bundle belong to the hosting service.

pub mod answers;
pub mod code_systems;
pub mod config;
pub mod constants;
pub mod context;
pub mod dispatcher;
mod error;
pub mod factories;
pub mod pruning;
pub mod resolvers;
pub mod walker;

pub use answers::{Answer, AnswerTree, Item};
pub use code_systems::{CodeSystemKey, CodeSystems};
pub use config::IntakeConfig;
pub use context::ConversionContext;
pub use dispatcher::Dispatcher;
pub use error::{ConversionError, ConversionResult, ReferenceDataError, ReferenceDataResult};
pub use walker::TreeWalker;

use fhir::BundleBuilder;
use intake_uuid::{IdSource, RandomIdSource};
use std::sync::Arc;

/// Long-lived conversion engine.
///
/// Holds the resolver registry, the factory registry and the shared code-system tables. One
/// engine serves any number of requests; each call to [`NotificationEngine::convert`] runs
/// with its own context.
#[derive(Debug)]
pub struct NotificationEngine {
    dispatcher: Dispatcher,
    walker: TreeWalker,
    code_systems: Arc<CodeSystems>,
}

impl NotificationEngine {
    /// Loads the code-system tables described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceDataError`] if a table is missing or malformed.
    pub fn new(config: &IntakeConfig) -> ReferenceDataResult<Self> {
        Ok(Self::with_code_systems(Arc::new(CodeSystems::load(config)?)))
    }

    pub fn with_code_systems(code_systems: Arc<CodeSystems>) -> Self {
        Self {
            dispatcher: Dispatcher::standard(),
            walker: TreeWalker::standard(),
            code_systems,
        }
    }

    pub fn code_systems(&self) -> &CodeSystems {
        &self.code_systems
    }

    /// Converts `tree` into `bundle` with random resource identifiers.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConversionError`] encountered. On error `bundle` is left untouched.
    pub fn convert(&self, tree: &AnswerTree, bundle: &mut BundleBuilder) -> ConversionResult<()> {
        self.convert_with_ids(tree, bundle, &mut RandomIdSource)
    }

    /// Converts `tree` into `bundle`, drawing resource identifiers from `ids`.
    ///
    /// Common items go to the common section, disease-specific items to the disease-specific
    /// section, both in input order. Extracted resources are appended in discovery order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConversionError`] encountered. On error `bundle` is left untouched.
    pub fn convert_with_ids(
        &self,
        tree: &AnswerTree,
        bundle: &mut BundleBuilder,
        ids: &mut dyn IdSource,
    ) -> ConversionResult<()> {
        let mut staged = BundleBuilder::new();
        let (common, specific) = {
            let mut ctx =
                ConversionContext::new(&self.dispatcher, &self.code_systems, ids, &mut staged);
            let common = self.walker.convert_all(&mut ctx, &tree.common_information)?;
            let specific = self
                .walker
                .convert_all(&mut ctx, &tree.disease_specific_information)?;
            (common, specific)
        };
        staged.add_common_information(common);
        staged.add_disease_specific_information(specific);

        tracing::info!(
            common = staged.common_information().len(),
            disease_specific = staged.disease_specific_information().len(),
            resources = staged.resources().len(),
            "converted notification"
        );
        bundle.append(staged);
        Ok(())
    }
}
