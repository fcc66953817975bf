//! Acceptance-criteria driven test case generation.
//!
//! Requirements are markdown documents. Each acceptance criterion is expanded
//! into a deterministic set of manual test cases, and the result is reconciled
//! against previously published test cases so that re-running the generator
//! never duplicates or needlessly rewrites anything.

pub mod domain;
pub use domain::{ChangeSet, Config, RequirementDocument, RequirementId, ScenarioCandidate};

pub mod engine;
pub use engine::{GenerationError, Generator};

/// Filesystem storage for requirements and published snapshots.
pub mod storage;
pub use storage::{Snapshot, load_all};
