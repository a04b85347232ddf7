//! Collaborator traits
//!
//! The dialogue engine depends on these interfaces only, so that the catalog,
//! the template index and the generative fallback can be swapped or mocked.
//!
//! ```text
//! MenuCatalog             - name / fuzzy lookup and option schemas
//! SemanticResponseMatcher - nearest canned response for conversational turns
//! GenerativeFallback      - external model for turns the engine cannot handle
//! ```

mod catalog;
mod fallback;
mod semantic;

pub use catalog::MenuCatalog;
pub use fallback::{
    EscalationReason, FallbackContext, FallbackItem, FallbackResult, GenerativeFallback,
};
pub use semantic::{ResponseTemplate, SemanticResponseMatcher, TemplateKind};
