use tracing::instrument;

use crate::{
    domain::{
        AcceptanceCriterion, CandidateError, ChangeSet, Config, Generation, RequirementDocument,
        ScenarioCandidate, SnapshotRecord,
    },
    engine::{
        Allocator, Classifier, EdgeCaseSuggester, EmptyCriteriaError, Expander, Normalizer,
        RuleClassifier, RuleError, RuleSuggester,
        composer::{self, Context},
        reconcile::reconcile,
    },
};

/// An error that aborts generation for a requirement.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The requirement has no acceptance criteria.
    #[error(transparent)]
    EmptyCriteria(#[from] EmptyCriteriaError),
}

/// The generation-and-reconciliation pipeline.
///
/// A generator holds no per-run state. A single instance can process any
/// number of requirements, from any number of threads.
pub struct Generator {
    normalizer: Normalizer,
    classifier: Box<dyn Classifier + Send + Sync>,
    expander: Expander,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("normalizer", &self.normalizer)
            .field("expander", &self.expander)
            .finish_non_exhaustive()
    }
}

impl Generator {
    /// Build a rule-based generator from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured pattern is invalid.
    pub fn new(config: &Config) -> Result<Self, RuleError> {
        Ok(Self {
            normalizer: Normalizer::new(config)?,
            classifier: Box::new(RuleClassifier::from_config(config)?),
            expander: Expander::new(RuleSuggester::new(config)?, config.max_title_length),
        })
    }

    /// Replace the category classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Classifier + Send + Sync + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    /// Replace the edge-case suggester.
    #[must_use]
    pub fn with_suggester(
        mut self,
        suggester: impl EdgeCaseSuggester + Send + Sync + 'static,
    ) -> Self {
        self.expander.set_suggester(suggester);
        self
    }

    /// Extract and classify the acceptance criteria of a requirement.
    ///
    /// # Errors
    ///
    /// Returns an error if the requirement has no acceptance criteria.
    #[instrument(level = "debug", skip_all, fields(requirement = %doc.id()))]
    pub fn criteria(
        &self,
        doc: &RequirementDocument,
    ) -> Result<Vec<AcceptanceCriterion>, GenerationError> {
        Ok(self.normalizer.normalize(doc, self.classifier.as_ref())?)
    }

    /// Generate the full candidate set of a requirement.
    ///
    /// A candidate whose steps cannot be serialized is reported in the
    /// generation's errors. It still consumes its internal ID, so the IDs of
    /// later candidates do not depend on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the requirement has no acceptance criteria.
    #[instrument(level = "debug", skip_all, fields(requirement = %doc.id()))]
    pub fn generate(&self, doc: &RequirementDocument) -> Result<Generation, GenerationError> {
        let criteria = self.criteria(doc)?;
        let plan = self.expander.plan(&criteria);

        let mut generation = Generation {
            candidates: Vec::with_capacity(plan.len()),
            errors: Vec::new(),
        };

        for (planned, id) in plan.iter().zip(Allocator::new(doc.id().clone())) {
            let context = Context {
                requirement: doc,
                criterion: planned.criterion,
                criteria: criteria.len(),
            };
            let steps = composer::compose(planned.kind, &context);
            let title = self.expander.title(&id, planned);
            let covers = planned.criterion.map_or_else(
                || criteria.iter().map(AcceptanceCriterion::ordinal).collect(),
                |criterion| vec![criterion.ordinal()],
            );

            match ScenarioCandidate::new(
                id.clone(),
                title,
                planned.kind,
                planned.criterion.map(AcceptanceCriterion::ordinal),
                covers,
                steps,
            ) {
                Ok(candidate) => generation.candidates.push(candidate),
                Err(error) => {
                    tracing::warn!("Skipping candidate {id}: {error}");
                    generation.errors.push(CandidateError {
                        id,
                        kind: planned.kind,
                        error,
                    });
                }
            }
        }

        tracing::debug!(
            "Generated {} candidates from {} criteria",
            generation.candidates.len(),
            criteria.len()
        );

        Ok(generation)
    }

    /// Generate the candidates of a requirement and reconcile them against
    /// the published snapshot for that requirement.
    ///
    /// # Errors
    ///
    /// Returns an error if the requirement has no acceptance criteria.
    #[instrument(skip_all, fields(requirement = %doc.id()))]
    pub fn reconcile(
        &self,
        doc: &RequirementDocument,
        snapshot: &[SnapshotRecord],
    ) -> Result<ChangeSet, GenerationError> {
        let generation = self.generate(doc)?;
        Ok(reconcile(doc.id(), generation, snapshot))
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, num::NonZeroUsize};

    use super::*;
    use crate::{
        domain::{ArtifactHandle, InternalId, Labels, ScenarioKind, Slot},
        engine::composer::{CLOSE_ACTION, CLOSE_EXPECTED},
        storage::steps_xml,
    };

    const EXAMPLE: &str = "1. User can log in with valid credentials.\n2. System must lock account after 5 failed attempts.";

    fn generator() -> Generator {
        Generator::new(&Config::default()).unwrap()
    }

    fn doc(criteria: &str) -> RequirementDocument {
        RequirementDocument::new("271309".parse().unwrap(), "Account login".to_string())
            .with_acceptance_criteria(criteria)
    }

    fn kinds_for(generation: &Generation, ordinal: usize) -> Vec<ScenarioKind> {
        generation
            .candidates
            .iter()
            .filter(|c| c.criterion() == NonZeroUsize::new(ordinal))
            .map(ScenarioCandidate::kind)
            .collect()
    }

    #[test]
    fn worked_example() {
        let generator = generator();
        let doc = doc(EXAMPLE);

        let criteria = generator.criteria(&doc).unwrap();
        assert_eq!(criteria.len(), 2);
        assert_eq!(criteria[0].ordinal().get(), 1);
        assert_eq!(criteria[1].ordinal().get(), 2);

        let generation = generator.generate(&doc).unwrap();
        assert!(generation.errors.is_empty());

        let first = kinds_for(&generation, 1);
        assert!(first.contains(&ScenarioKind::HappyPath));
        assert!(first.contains(&ScenarioKind::Accessibility));

        let second = kinds_for(&generation, 2);
        assert!(second.len() >= 4);
        assert!(second.contains(&ScenarioKind::Negative));
        assert!(second.contains(&ScenarioKind::Boundary));

        assert_eq!(generation.candidates[0].id().to_string(), "271309-AC1");
        assert_eq!(generation.candidates[1].id().to_string(), "271309-005");

        let change_set = generator.reconcile(&doc, &[]).unwrap();
        assert_eq!(change_set.to_create.len(), generation.candidates.len());
        assert!(change_set.to_update.is_empty());
        assert!(change_set.to_skip.is_empty());
    }

    #[test]
    fn determinism() {
        let doc = doc(EXAMPLE);
        let first = generator().generate(&doc).unwrap();
        let second = generator().generate(&doc).unwrap();

        assert_eq!(first, second);
        for (a, b) in first.candidates.iter().zip(&second.candidates) {
            assert_eq!(a.steps_xml(), b.steps_xml());
            assert_eq!(a.title(), b.title());
        }
    }

    #[test]
    fn idempotency() {
        let generator = generator();
        let doc = doc(EXAMPLE);

        let first = generator.reconcile(&doc, &[]).unwrap();
        let snapshot: Vec<_> = first
            .to_create
            .iter()
            .enumerate()
            .map(|(i, c)| SnapshotRecord::published(c, ArtifactHandle::new(format!("h{i}"))))
            .collect();

        let second = generator.reconcile(&doc, &snapshot).unwrap();
        assert!(second.to_create.is_empty());
        assert!(second.to_update.is_empty());
        assert_eq!(second.to_skip.len(), first.to_create.len());
        assert!(second.untouched.is_empty());
    }

    #[test]
    fn idempotency_with_tags_only() {
        let generator = generator();
        let doc = doc(EXAMPLE);

        let first = generator.generate(&doc).unwrap();
        let snapshot: Vec<_> = first
            .candidates
            .iter()
            .enumerate()
            .map(|(i, c)| SnapshotRecord {
                internal_id: None,
                title: c.title().to_string(),
                tags: c.tags().clone(),
                handle: ArtifactHandle::new(i.to_string()),
                steps: None,
                fingerprint: None,
            })
            .collect();

        let second = generator.reconcile(&doc, &snapshot).unwrap();
        assert!(second.is_noop());
    }

    #[test]
    fn edited_criterion_updates_only_its_candidates() {
        let generator = generator();
        let before = doc("- User can log in.\n- User can log out.");
        let after = doc("- User can log in.\n- User can sign out.");

        let published: Vec<_> = generator
            .generate(&before)
            .unwrap()
            .candidates
            .iter()
            .enumerate()
            .map(|(i, c)| SnapshotRecord::published(c, ArtifactHandle::new(i.to_string())))
            .collect();

        let change_set = generator.reconcile(&after, &published).unwrap();
        assert!(change_set.to_create.is_empty());
        assert!(!change_set.to_update.is_empty());
        assert!(change_set
            .to_update
            .iter()
            .all(|m| m.candidate.criterion() == NonZeroUsize::new(2)));
        assert!(change_set
            .to_skip
            .iter()
            .all(|m| m.candidate.criterion() != NonZeroUsize::new(2)));
    }

    #[test]
    fn coverage() {
        let generation = generator()
            .generate(&doc("- One thing.\n- Another thing.\n- A third thing."))
            .unwrap();

        for ordinal in 1..=3 {
            let kinds = kinds_for(&generation, ordinal);
            assert!(kinds.contains(&ScenarioKind::HappyPath));
            assert!(kinds.contains(&ScenarioKind::Accessibility));
        }

        let umbrellas: Vec<_> = generation
            .candidates
            .iter()
            .filter(|c| c.kind() == ScenarioKind::Umbrella)
            .collect();
        assert_eq!(umbrellas.len(), 1);
        assert_eq!(umbrellas[0].criterion(), None);
        let covers: Vec<_> = umbrellas[0].covers().iter().map(|o| o.get()).collect();
        assert_eq!(covers, vec![1, 2, 3]);
        assert_eq!(generation.candidates.last(), Some(umbrellas[0]));
    }

    #[test]
    fn id_scheme() {
        let generation = generator().generate(&doc(EXAMPLE)).unwrap();
        let ids: Vec<&InternalId> = generation.candidates.iter().map(ScenarioCandidate::id).collect();

        assert_eq!(ids[0].slot(), Slot::First);
        for (position, id) in ids.iter().enumerate().skip(1) {
            assert_eq!(id.slot(), Slot::at(position));
            let text = id.to_string();
            let number = text.rsplit_once('-').unwrap().1;
            assert_eq!(number.len(), 3);
            assert_eq!(number.parse::<usize>().unwrap(), position * 5);
        }
    }

    #[test]
    fn step_invariant_and_round_trip() {
        let generation = generator().generate(&doc(EXAMPLE)).unwrap();

        for candidate in &generation.candidates {
            let parsed = steps_xml::parse(candidate.steps_xml()).unwrap();
            assert_eq!(&parsed, candidate.steps());
            assert_eq!(parsed.last().action, CLOSE_ACTION);
            assert_eq!(parsed.last().expected, CLOSE_EXPECTED);
        }
    }

    #[test]
    fn titles_are_rule_composed() {
        let generation = generator().generate(&doc(EXAMPLE)).unwrap();
        let first = &generation.candidates[0];
        assert_eq!(
            first.title(),
            "271309-AC1: User Management / Authentication / Access Control / Login / Happy Path"
        );
        assert!(generation
            .candidates
            .iter()
            .all(|c| !c.title().contains("valid credentials")));
    }

    #[test]
    fn steps_quote_criteria_as_plain_text() {
        let generation = generator()
            .generate(&doc("- **User** can `log in` via [SSO](http://x)."))
            .unwrap();

        let happy_path = &generation.candidates[0];
        assert_eq!(happy_path.kind(), ScenarioKind::HappyPath);
        assert!(happy_path.steps().iter().any(|step| step.action
            == "Perform the action under test with valid data: \"User can log in via SSO\"."));
        for candidate in &generation.candidates {
            assert!(candidate.steps().iter().all(|step| {
                !format!("{}{}", step.action, step.expected).contains(['*', '`', '[', ']'])
            }));
        }
    }

    #[test]
    fn empty_criteria_aborts() {
        let doc = RequirementDocument::new("1".parse().unwrap(), "Nothing".to_string());
        assert!(matches!(
            generator().generate(&doc),
            Err(GenerationError::EmptyCriteria(_))
        ));
    }

    #[test]
    fn unserializable_candidate_is_isolated() {
        // A control character cannot appear in the steps markup
        let generation = generator().generate(&doc("- Press the \u{7} key.")).unwrap();

        // the umbrella does not quote criterion text, so it survives
        assert_eq!(generation.candidates.len(), 1);
        assert_eq!(generation.candidates[0].kind(), ScenarioKind::Umbrella);
        assert!(!generation.errors.is_empty());

        // failed candidates still consume their IDs
        let umbrella_position = generation.errors.len();
        assert_eq!(
            generation.candidates[0].id().slot(),
            Slot::at(umbrella_position)
        );

        let change_set = generator().reconcile(&doc("- Press the \u{7} key."), &[]).unwrap();
        assert_eq!(change_set.errors.len(), generation.errors.len());
        assert_eq!(change_set.to_create.len(), 1);
    }

    #[test]
    fn custom_capabilities_are_used() {
        let generator = generator()
            .with_classifier(|_: &str| Labels::new("F", "M", "C", "S"))
            .with_suggester(|_: &AcceptanceCriterion| BTreeSet::from([ScenarioKind::UndoRedo]));

        let generation = generator.generate(&doc("- Anything at all.")).unwrap();
        let kinds: Vec<_> = generation.candidates.iter().map(ScenarioCandidate::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ScenarioKind::HappyPath,
                ScenarioKind::UndoRedo,
                ScenarioKind::Accessibility,
                ScenarioKind::Umbrella,
            ]
        );
        assert!(generation.candidates[0].title().contains("F / M / C / S"));
    }
}
