//! The generation pipeline.
//!
//! A requirement flows through the stages in order:
//!
//! 1. the [`Normalizer`] splits its acceptance criteria into atomic criteria
//! 2. a [`Classifier`] labels each criterion
//! 3. the [`Expander`] decides which scenarios apply and titles them
//! 4. the [`Allocator`] hands out internal IDs in plan order
//! 5. the step composer writes the test steps
//! 6. [`reconcile`] diffs the candidates against published artifacts
//!
//! [`Generator`] wires the stages together.

/// Internal ID allocation.
pub mod allocator;
pub use allocator::Allocator;

/// Category classification of criteria.
pub mod classifier;
pub use classifier::{Classifier, RuleClassifier, RuleError};

pub mod composer;

pub mod expander;
pub use expander::{EdgeCaseSuggester, Expander, PlannedScenario, RuleSuggester};

pub mod normalizer;
pub use normalizer::{EmptyCriteriaError, Normalizer};

pub mod reconcile;
pub use reconcile::reconcile;

mod generator;
pub use generator::{GenerationError, Generator};
