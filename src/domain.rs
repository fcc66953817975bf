//! Domain models for test case generation.
//!
//! This module contains the value types that flow through the generation
//! pipeline: requirements and their criteria, internal identifiers, scenario
//! candidates, published artifacts, change-sets and configuration.

mod requirement;
pub use requirement::{RequirementDocument, RequirementId, RequirementIdError};

mod criterion;
pub use criterion::{AcceptanceCriterion, Labels};

mod fingerprint;
pub use fingerprint::Fingerprint;

/// Internal test case identifiers.
pub mod internal_id;
pub use internal_id::{Error as InternalIdError, InternalId, Slot};

mod step;
pub use step::{Step, Steps};

mod scenario;
pub use scenario::{ScenarioCandidate, ScenarioKind, content_fingerprint};

/// Published artifacts and snapshot records.
pub mod artifact;
pub use artifact::{
    ArtifactHandle, IdSource, MalformedSnapshotError, PublishedArtifact, SnapshotRecord,
};

mod change_set;
pub use change_set::{CandidateError, ChangeSet, Generation, Matched};

mod config;
pub use config::{Config, Rule, ScenarioRules};
