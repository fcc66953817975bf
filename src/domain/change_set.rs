use serde::Serialize;

use crate::{
    domain::{
        ArtifactHandle, InternalId, MalformedSnapshotError, RequirementId, ScenarioCandidate,
        ScenarioKind,
    },
    storage::steps_xml::SerializationError,
};

/// A candidate paired with the published artifact it matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Matched {
    /// The freshly generated candidate.
    pub candidate: ScenarioCandidate,
    /// The external key of the matched artifact.
    pub handle: ArtifactHandle,
}

/// A candidate that could not be formed.
///
/// This fails the single candidate only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateError {
    /// The ID allocated to the candidate.
    pub id: InternalId,
    /// The scenario kind of the candidate.
    pub kind: ScenarioKind,
    /// What went wrong.
    #[serde(serialize_with = "display")]
    pub error: SerializationError,
}

/// The output of a generation run, before reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// The well-formed candidates, in allocation order.
    pub candidates: Vec<ScenarioCandidate>,
    /// The candidates that could not be formed.
    pub errors: Vec<CandidateError>,
}

/// The reconciliation of a requirement's candidates against previously
/// published artifacts.
///
/// Every well-formed candidate appears in exactly one of `to_create`,
/// `to_update` and `to_skip`. Each list keeps allocation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// The requirement these candidates were generated from.
    pub requirement: RequirementId,
    /// Candidates with no published counterpart.
    pub to_create: Vec<ScenarioCandidate>,
    /// Candidates whose published counterpart has different content.
    pub to_update: Vec<Matched>,
    /// Candidates whose published counterpart is already up to date.
    pub to_skip: Vec<Matched>,
    /// Candidates that could not be formed.
    pub errors: Vec<CandidateError>,
    /// Snapshot records that were excluded from matching.
    pub unmatched: Vec<MalformedSnapshotError>,
    /// Published artifacts with no corresponding candidate.
    ///
    /// These are never deleted.
    pub untouched: Vec<ArtifactHandle>,
}

impl ChangeSet {
    /// An empty change-set for the given requirement.
    #[must_use]
    pub const fn new(requirement: RequirementId) -> Self {
        Self {
            requirement,
            to_create: Vec::new(),
            to_update: Vec::new(),
            to_skip: Vec::new(),
            errors: Vec::new(),
            unmatched: Vec::new(),
            untouched: Vec::new(),
        }
    }

    /// Whether publishing this change-set would mutate anything.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty()
    }

    /// The number of well-formed candidates across all three lists.
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_skip.len()
    }
}

fn display<T: std::fmt::Display, S: serde::Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
