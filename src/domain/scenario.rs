use std::{collections::BTreeSet, fmt, num::NonZeroUsize};

use borsh::BorshSerialize;
use serde::Serialize;

use crate::{
    domain::{Fingerprint, InternalId, Steps, artifact::tags},
    storage::steps_xml::{self, SerializationError},
};

/// The fixed taxonomy of test scenarios.
///
/// The declaration order is the taxonomy order used for ID allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// The criterion holds under normal use.
    HappyPath,
    /// Invalid input or conditions are rejected.
    Negative,
    /// Values at and just beyond the allowed limits.
    Boundary,
    /// Cancelling part-way leaves no partial changes.
    CancelRollback,
    /// The outcome survives an application restart.
    Persistence,
    /// The change can be undone and redone.
    UndoRedo,
    /// Keyboard, screen reader and contrast coverage (WCAG 2.1 AA).
    Accessibility,
    /// The single per-requirement sign-off case covering every criterion.
    Umbrella,
}

impl ScenarioKind {
    /// The kinds that can apply to an individual criterion, in taxonomy
    /// order.
    pub const PER_CRITERION: [Self; 7] = [
        Self::HappyPath,
        Self::Negative,
        Self::Boundary,
        Self::CancelRollback,
        Self::Persistence,
        Self::UndoRedo,
        Self::Accessibility,
    ];

    /// The human-readable descriptor used as the last title component.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::HappyPath => "Happy Path",
            Self::Negative => "Negative Input Handling",
            Self::Boundary => "Boundary Values",
            Self::CancelRollback => "Cancel and Rollback",
            Self::Persistence => "Persistence Across Restart",
            Self::UndoRedo => "Undo and Redo",
            Self::Accessibility => "Accessibility Compliance",
            Self::Umbrella => "All Acceptance Criteria",
        }
    }

    /// The machine-readable name used in `test-type:` tags.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HappyPath => "happy_path",
            Self::Negative => "negative",
            Self::Boundary => "boundary",
            Self::CancelRollback => "cancel_rollback",
            Self::Persistence => "persistence",
            Self::UndoRedo => "undo_redo",
            Self::Accessibility => "accessibility",
            Self::Umbrella => "umbrella",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A fully-formed candidate test case.
///
/// Candidates are created fresh on every generation run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioCandidate {
    id: InternalId,
    title: String,
    kind: ScenarioKind,
    criterion: Option<NonZeroUsize>,
    covers: Vec<NonZeroUsize>,
    steps: Steps,
    steps_xml: String,
    fingerprint: Fingerprint,
    tags: BTreeSet<String>,
}

impl ScenarioCandidate {
    /// Assemble a candidate, serializing its steps and computing its
    /// fingerprint and tags.
    ///
    /// `criterion` is `None` only for the umbrella candidate, which instead
    /// lists every criterion it `covers`.
    ///
    /// # Errors
    ///
    /// Returns an error if the steps cannot be serialized.
    pub fn new(
        id: InternalId,
        title: String,
        kind: ScenarioKind,
        criterion: Option<NonZeroUsize>,
        covers: Vec<NonZeroUsize>,
        steps: Steps,
    ) -> Result<Self, SerializationError> {
        let steps_xml = steps_xml::serialize(&steps)?;
        let fingerprint = content_fingerprint(&title, &steps);

        let mut tag_set = BTreeSet::from([
            tags::story(id.requirement()),
            tags::GENERATOR.to_string(),
            tags::test_id(&id),
            tags::test_type(kind),
            tags::content_hash(&fingerprint),
        ]);
        if let Some(ordinal) = criterion {
            tag_set.insert(tags::criterion(ordinal));
        }

        Ok(Self {
            id,
            title,
            kind,
            criterion,
            covers,
            steps,
            steps_xml,
            fingerprint,
            tags: tag_set,
        })
    }

    /// The internal ID.
    #[must_use]
    pub const fn id(&self) -> &InternalId {
        &self.id
    }

    /// The rule-composed title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The scenario kind.
    #[must_use]
    pub const fn kind(&self) -> ScenarioKind {
        self.kind
    }

    /// The ordinal of the parent criterion (`None` for the umbrella).
    #[must_use]
    pub const fn criterion(&self) -> Option<NonZeroUsize> {
        self.criterion
    }

    /// The ordinals of the criteria this candidate covers.
    #[must_use]
    pub fn covers(&self) -> &[NonZeroUsize] {
        &self.covers
    }

    /// The ordered test steps.
    #[must_use]
    pub const fn steps(&self) -> &Steps {
        &self.steps
    }

    /// The steps serialized in the structural steps format.
    #[must_use]
    pub fn steps_xml(&self) -> &str {
        &self.steps_xml
    }

    /// The content fingerprint over (title, steps).
    #[must_use]
    pub const fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// The machine-readable tags to attach when publishing.
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }
}

/// The fingerprint of a test case's title and steps.
///
/// Published artifacts are fingerprinted the same way after their steps
/// payload is parsed back, so formatting differences in the payload do not
/// register as content changes.
#[must_use]
pub fn content_fingerprint(title: &str, steps: &Steps) -> Fingerprint {
    #[derive(BorshSerialize)]
    struct FingerprintData<'a> {
        title: &'a str,
        steps: Vec<(&'a str, &'a str)>,
    }

    Fingerprint::of(&FingerprintData {
        title,
        steps: steps
            .iter()
            .map(|step| (step.action.as_str(), step.expected.as_str()))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Step;

    fn steps(action: &str) -> Steps {
        Steps::ending_with(vec![Step::new(action, "ok")], Step::new("close", "closed"))
    }

    fn id() -> InternalId {
        InternalId::at("271309".parse().unwrap(), 1)
    }

    #[test]
    fn taxonomy_order_matches_declaration() {
        let mut sorted = ScenarioKind::PER_CRITERION;
        sorted.sort();
        assert_eq!(sorted, ScenarioKind::PER_CRITERION);
        assert!(ScenarioKind::Accessibility < ScenarioKind::Umbrella);
    }

    #[test]
    fn candidate_tags() {
        let candidate = ScenarioCandidate::new(
            id(),
            "271309-005: A / B / C / D / Happy Path".to_string(),
            ScenarioKind::HappyPath,
            NonZeroUsize::new(2),
            vec![NonZeroUsize::new(2).unwrap()],
            steps("do it"),
        )
        .unwrap();

        let tags = candidate.tags();
        assert!(tags.contains("story:271309"));
        assert!(tags.contains("generated-by:ai-testgen"));
        assert!(tags.contains("test-id:271309-005"));
        assert!(tags.contains("test-type:happy_path"));
        assert!(tags.contains("ac:2"));
        assert!(tags.contains(&format!("content-hash:{}", candidate.fingerprint())));
    }

    #[test]
    fn umbrella_has_no_criterion_tag() {
        let candidate = ScenarioCandidate::new(
            id(),
            "title".to_string(),
            ScenarioKind::Umbrella,
            None,
            Vec::new(),
            steps("sign off"),
        )
        .unwrap();
        assert!(!candidate.tags().iter().any(|tag| tag.starts_with("ac:")));
    }

    #[test]
    fn fingerprint_covers_title_and_steps() {
        let base = content_fingerprint("title", &steps("a"));
        assert_eq!(base, content_fingerprint("title", &steps("a")));
        assert_ne!(base, content_fingerprint("other", &steps("a")));
        assert_ne!(base, content_fingerprint("title", &steps("b")));
    }

    #[test]
    fn unserializable_steps_are_rejected() {
        let result = ScenarioCandidate::new(
            id(),
            "title".to_string(),
            ScenarioKind::HappyPath,
            NonZeroUsize::new(1),
            Vec::new(),
            steps("   "),
        );
        assert!(result.is_err());
    }
}
