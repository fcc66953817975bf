//! Published artifacts: the external system's record of previously created
//! test cases.
//!
//! The core only ever reads a snapshot of these records. The publishing
//! collaborator owns their lifecycle.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        Fingerprint, InternalId, RequirementId, ScenarioCandidate, internal_id,
        scenario::content_fingerprint,
    },
    storage::steps_xml,
};

/// Machine-readable tags attached to generated test cases.
pub mod tags {
    use std::num::NonZeroUsize;

    use crate::domain::{Fingerprint, InternalId, RequirementId, ScenarioKind};

    /// Marks a test case as produced by this generator.
    pub const GENERATOR: &str = "generated-by:ai-testgen";

    const STORY: &str = "story:";
    const TEST_ID: &str = "test-id:";
    const CONTENT_HASH: &str = "content-hash:";

    /// `story:{requirement}`
    #[must_use]
    pub fn story(requirement: &RequirementId) -> String {
        format!("{STORY}{requirement}")
    }

    /// `test-id:{internal id}`
    #[must_use]
    pub fn test_id(id: &InternalId) -> String {
        format!("{TEST_ID}{id}")
    }

    /// `test-type:{kind}`
    #[must_use]
    pub fn test_type(kind: ScenarioKind) -> String {
        format!("test-type:{}", kind.as_str())
    }

    /// `ac:{ordinal}`
    #[must_use]
    pub fn criterion(ordinal: NonZeroUsize) -> String {
        format!("ac:{ordinal}")
    }

    /// `content-hash:{fingerprint}`
    #[must_use]
    pub fn content_hash(fingerprint: &Fingerprint) -> String {
        format!("{CONTENT_HASH}{fingerprint}")
    }

    pub(crate) fn find_test_id<'a>(
        tags: impl IntoIterator<Item = &'a String>,
    ) -> Option<&'a str> {
        find(tags, TEST_ID)
    }

    pub(crate) fn find_content_hash<'a>(
        tags: impl IntoIterator<Item = &'a String>,
    ) -> Option<&'a str> {
        find(tags, CONTENT_HASH)
    }

    pub(crate) fn find_story<'a>(tags: impl IntoIterator<Item = &'a String>) -> Option<&'a str> {
        find(tags, STORY)
    }

    fn find<'a>(tags: impl IntoIterator<Item = &'a String>, prefix: &str) -> Option<&'a str> {
        tags.into_iter()
            .find_map(|tag| tag.trim().strip_prefix(prefix))
            .map(str::trim)
    }
}

/// The opaque key of an artifact in the external system.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactHandle(String);

impl ArtifactHandle {
    /// Wrap an external key.
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One record of a published-artifact snapshot, as read from the external
/// system.
///
/// Only the title, tags and handle are guaranteed. The internal ID and the
/// fingerprint are recovered from whatever is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// The internal ID, when the external system stores it explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<String>,
    /// The published title.
    pub title: String,
    /// The published tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// The external key.
    pub handle: ArtifactHandle,
    /// The published steps payload, in the structural steps format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<String>,
    /// A cached content fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
}

impl SnapshotRecord {
    /// The record a publisher would hold after publishing `candidate` under
    /// `handle`.
    #[must_use]
    pub fn published(candidate: &ScenarioCandidate, handle: ArtifactHandle) -> Self {
        Self {
            internal_id: Some(candidate.id().to_string()),
            title: candidate.title().to_string(),
            tags: candidate.tags().clone(),
            handle,
            steps: Some(candidate.steps_xml().to_string()),
            fingerprint: Some(candidate.fingerprint().clone()),
        }
    }

    /// Whether this record appears to belong to the given requirement.
    ///
    /// A `story:` tag is authoritative. Without one, the internal ID (explicit,
    /// tagged or from the title prefix) decides.
    #[must_use]
    pub fn belongs_to(&self, requirement: &RequirementId) -> bool {
        tags::find_story(&self.tags).map_or_else(
            || {
                self.internal_id()
                    .is_ok_and(|(id, _)| id.requirement() == requirement)
            },
            |story| story == requirement.as_str(),
        )
    }

    /// Recover the internal ID and the key it was recovered from.
    fn internal_id(&self) -> Result<(InternalId, IdSource), internal_id::Error> {
        if let Some(id) = self.internal_id.as_deref() {
            return Ok((id.trim().parse()?, IdSource::Field));
        }
        if let Some(id) = tags::find_test_id(&self.tags) {
            return Ok((id.parse()?, IdSource::Tag));
        }
        Ok((InternalId::from_title(&self.title)?, IdSource::TitlePrefix))
    }

    /// Recover the content fingerprint.
    ///
    /// Tries the cached field, then the `content-hash:` tag, then recomputes
    /// it from the title and the parsed steps payload.
    fn fingerprint(&self) -> Option<Fingerprint> {
        if let Some(fingerprint) = &self.fingerprint {
            return Some(fingerprint.clone());
        }
        if let Some(fingerprint) = tags::find_content_hash(&self.tags).and_then(Fingerprint::parse)
        {
            return Some(fingerprint);
        }
        let payload = self.steps.as_deref()?;
        match steps_xml::parse(payload) {
            Ok(steps) => Some(content_fingerprint(&self.title, &steps)),
            Err(e) => {
                tracing::debug!(
                    "Could not parse steps payload of artifact {}: {e}",
                    self.handle
                );
                None
            }
        }
    }
}

/// Where an artifact's internal ID was recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdSource {
    /// An explicit internal-ID field.
    Field,
    /// A `test-id:` tag.
    Tag,
    /// The title prefix. This is a best-effort key.
    TitlePrefix,
}

/// A previously published test case, resolved against a requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    id: InternalId,
    source: IdSource,
    title: String,
    fingerprint: Option<Fingerprint>,
    handle: ArtifactHandle,
}

impl PublishedArtifact {
    /// Resolve a snapshot record against the requirement being reconciled.
    ///
    /// # Errors
    ///
    /// Returns an error if no internal ID can be recovered from the record, or
    /// if the recovered ID belongs to a different requirement.
    pub fn resolve(
        record: &SnapshotRecord,
        requirement: &RequirementId,
    ) -> Result<Self, MalformedSnapshotError> {
        let (id, source) =
            record
                .internal_id()
                .map_err(|source| MalformedSnapshotError::Unidentified {
                    handle: record.handle.clone(),
                    source,
                })?;

        if id.requirement() != requirement {
            return Err(MalformedSnapshotError::ForeignRequirement {
                handle: record.handle.clone(),
                id,
                requirement: requirement.clone(),
            });
        }

        Ok(Self {
            id,
            source,
            title: record.title.clone(),
            fingerprint: record.fingerprint(),
            handle: record.handle.clone(),
        })
    }

    /// The recovered internal ID.
    #[must_use]
    pub const fn id(&self) -> &InternalId {
        &self.id
    }

    /// Where the internal ID was recovered from.
    #[must_use]
    pub const fn source(&self) -> IdSource {
        self.source
    }

    /// The published title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The content fingerprint, if it could be recovered.
    #[must_use]
    pub const fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    /// The external key.
    #[must_use]
    pub const fn handle(&self) -> &ArtifactHandle {
        &self.handle
    }
}

/// A snapshot record that could not be used for reconciliation.
///
/// Such records are excluded from the lookup and reported, rather than
/// failing the whole run.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MalformedSnapshotError {
    /// No internal ID could be recovered from the field, tags or title.
    #[error("artifact {handle} has no recognisable internal ID: {source}")]
    Unidentified {
        /// The external key of the record.
        handle: ArtifactHandle,
        /// Why the last attempted key failed to parse.
        #[serde(serialize_with = "display")]
        source: internal_id::Error,
    },

    /// The internal ID belongs to another requirement.
    #[error("artifact {handle} has internal ID {id}, which does not belong to {requirement}")]
    ForeignRequirement {
        /// The external key of the record.
        handle: ArtifactHandle,
        /// The recovered internal ID.
        id: InternalId,
        /// The requirement being reconciled.
        requirement: RequirementId,
    },

    /// An earlier record already claimed this internal ID.
    #[error("artifact {handle} duplicates internal ID {id}, already held by {existing}")]
    Duplicate {
        /// The external key of the record.
        handle: ArtifactHandle,
        /// The contested internal ID.
        id: InternalId,
        /// The external key of the record that claimed the ID first.
        existing: ArtifactHandle,
    },
}

fn display<T: fmt::Display, S: serde::Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::domain::{ScenarioKind, Step, Steps};

    fn requirement() -> RequirementId {
        "271309".parse().unwrap()
    }

    fn record(title: &str, tags: &[&str]) -> SnapshotRecord {
        SnapshotRecord {
            internal_id: None,
            title: title.to_string(),
            tags: tags.iter().map(ToString::to_string).collect(),
            handle: ArtifactHandle::new("1001"),
            steps: None,
            fingerprint: None,
        }
    }

    fn candidate() -> ScenarioCandidate {
        ScenarioCandidate::new(
            InternalId::at(requirement(), 0),
            "271309-AC1: A / B / C / D / Happy Path".to_string(),
            ScenarioKind::HappyPath,
            NonZeroUsize::new(1),
            vec![NonZeroUsize::MIN],
            Steps::ending_with(vec![Step::new("go", "gone")], Step::new("close", "closed")),
        )
        .unwrap()
    }

    #[test]
    fn resolves_from_tag_before_title() {
        let record = record(
            "271309-010: stale title",
            &["story:271309", "generated-by:ai-testgen", "test-id:271309-005"],
        );
        let artifact = PublishedArtifact::resolve(&record, &requirement()).unwrap();
        assert_eq!(artifact.id().to_string(), "271309-005");
        assert_eq!(artifact.source(), IdSource::Tag);
    }

    #[test]
    fn resolves_from_explicit_field_first() {
        let mut record = record("271309-010: title", &["test-id:271309-005"]);
        record.internal_id = Some("271309-AC1".to_string());
        let artifact = PublishedArtifact::resolve(&record, &requirement()).unwrap();
        assert_eq!(artifact.id().to_string(), "271309-AC1");
        assert_eq!(artifact.source(), IdSource::Field);
    }

    #[test]
    fn falls_back_to_title_prefix() {
        let record = record("271309-015: A / B / C / D / Boundary Values", &[]);
        let artifact = PublishedArtifact::resolve(&record, &requirement()).unwrap();
        assert_eq!(artifact.id().to_string(), "271309-015");
        assert_eq!(artifact.source(), IdSource::TitlePrefix);
    }

    #[test]
    fn unidentifiable_record_is_malformed() {
        let record = record("Manually written test case", &["smoke"]);
        assert!(matches!(
            PublishedArtifact::resolve(&record, &requirement()),
            Err(MalformedSnapshotError::Unidentified { .. })
        ));
    }

    #[test]
    fn foreign_requirement_is_malformed() {
        let record = record("999-005: Something", &[]);
        assert!(matches!(
            PublishedArtifact::resolve(&record, &requirement()),
            Err(MalformedSnapshotError::ForeignRequirement { .. })
        ));
    }

    #[test]
    fn published_record_round_trips_fingerprint() {
        let candidate = candidate();
        let record = SnapshotRecord::published(&candidate, ArtifactHandle::new("7"));
        let artifact = PublishedArtifact::resolve(&record, &requirement()).unwrap();
        assert_eq!(artifact.id(), candidate.id());
        assert_eq!(artifact.fingerprint(), Some(candidate.fingerprint()));
    }

    #[test]
    fn fingerprint_from_content_hash_tag() {
        let candidate = candidate();
        let mut record = record(candidate.title(), &[]);
        record.tags = candidate.tags().clone();
        let artifact = PublishedArtifact::resolve(&record, &requirement()).unwrap();
        assert_eq!(artifact.fingerprint(), Some(candidate.fingerprint()));
    }

    #[test]
    fn fingerprint_recomputed_from_steps_payload() {
        let candidate = candidate();
        let mut record = record(candidate.title(), &[]);
        record.steps = Some(candidate.steps_xml().to_string());
        let artifact = PublishedArtifact::resolve(&record, &requirement()).unwrap();
        assert_eq!(artifact.fingerprint(), Some(candidate.fingerprint()));
    }

    #[test]
    fn unparseable_payload_has_no_fingerprint() {
        let mut record = record("271309-AC1: title", &[]);
        record.steps = Some("<not-steps/>".to_string());
        let artifact = PublishedArtifact::resolve(&record, &requirement()).unwrap();
        assert_eq!(artifact.fingerprint(), None);
    }

    #[test]
    fn belongs_to_prefers_story_tag() {
        let tagged = record("999-005: Something", &["story:271309"]);
        assert!(tagged.belongs_to(&requirement()));

        let untagged = record("271309-005: Something", &[]);
        assert!(untagged.belongs_to(&requirement()));

        let other = record("999-005: Something", &[]);
        assert!(!other.belongs_to(&requirement()));
    }

    #[test]
    fn snapshot_record_json_shape() {
        let json = r#"{"title": "271309-AC1: t", "tags": ["story:271309"], "handle": "42"}"#;
        let record: SnapshotRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.handle.as_str(), "42");
        assert!(record.internal_id.is_none());
        assert!(record.steps.is_none());
    }
}
