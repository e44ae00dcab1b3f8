//! Ordered resolver registry.

use crate::answers::Answer;
use crate::resolvers::{standard_resolvers, Resolver};
use crate::{ConversionError, ConversionResult};
use fhir::TypedValue;

/// Holds the resolvers in priority order and converts answers with the first that claims them.
pub struct Dispatcher {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.resolvers.iter().map(|r| r.name()))
            .finish()
    }
}

impl Dispatcher {
    /// Dispatcher over [`standard_resolvers`].
    pub fn standard() -> Self {
        Self::with_resolvers(standard_resolvers())
    }

    pub fn with_resolvers(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        Self { resolvers }
    }

    /// Returns `true` if the answer carries a value of any shape.
    ///
    /// Shapes no resolver supports count as values: such answers are never pruned and fail in
    /// [`Dispatcher::resolve`].
    pub fn has_value(&self, answer: &Answer) -> bool {
        answer.carries_value()
    }

    /// Converts an answer with the first resolver that claims it.
    ///
    /// # Errors
    ///
    /// - [`ConversionError::DispatcherExhausted`] if no resolver claims the answer; the error
    ///   carries the answer's JSON form.
    /// - Any error of the claiming resolver.
    pub fn resolve(&self, answer: &Answer) -> ConversionResult<TypedValue> {
        let Some(resolver) = self.resolvers.iter().find(|r| r.claims(answer)) else {
            return Err(ConversionError::DispatcherExhausted {
                answer: answer.to_diagnostic_json(),
            });
        };
        tracing::trace!(resolver = resolver.name(), "resolving answer value");
        resolver.resolve(answer)
    }
}
