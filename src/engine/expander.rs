//! Deciding which scenarios apply to each criterion, and titling them.

use std::{collections::BTreeSet, sync::LazyLock};

use regex::Regex;

use crate::{
    domain::{AcceptanceCriterion, Config, InternalId, ScenarioKind},
    engine::classifier::{RuleError, keyword_pattern},
};

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\b").expect("number regex is valid"));

const ELLIPSIS: &str = "...";

/// The descriptor used when the labels fill the whole title.
const FALLBACK_DESCRIPTOR: &str = "Test Case";

/// The labels of the umbrella candidate.
pub const UMBRELLA_LABELS: [&str; 4] = [
    "Acceptance Criteria Coverage",
    "Test Coverage",
    "Verification",
    "Sign-off",
];

/// Suggests the edge-case scenarios that apply to a criterion.
///
/// The rule-based [`RuleSuggester`] is the default. Whatever an
/// implementation returns, every criterion still gets a happy path and an
/// accessibility scenario, and umbrella suggestions are ignored.
pub trait EdgeCaseSuggester {
    /// Suggest scenario kinds for a single criterion.
    fn suggest_edge_cases(&self, criterion: &AcceptanceCriterion) -> BTreeSet<ScenarioKind>;
}

impl<F> EdgeCaseSuggester for F
where
    F: Fn(&AcceptanceCriterion) -> BTreeSet<ScenarioKind>,
{
    fn suggest_edge_cases(&self, criterion: &AcceptanceCriterion) -> BTreeSet<ScenarioKind> {
        self(criterion)
    }
}

/// Keyword-driven scenario applicability.
///
/// - validated input or limits (including any number): negative and boundary
/// - a multi-step or stateful operation: cancel/rollback and persistence
/// - a mutable action: undo/redo
#[derive(Debug, Clone)]
pub struct RuleSuggester {
    input: Option<Regex>,
    stateful: Option<Regex>,
    mutation: Option<Regex>,
}

impl RuleSuggester {
    /// Compile the scenario keyword tables of a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a keyword produces an invalid pattern.
    pub fn new(config: &Config) -> Result<Self, RuleError> {
        let rules = &config.scenarios;
        let input: Vec<String> = rules
            .validation
            .iter()
            .chain(&rules.limits)
            .cloned()
            .collect();

        Ok(Self {
            input: keyword_pattern(&input)?,
            stateful: keyword_pattern(&rules.stateful)?,
            mutation: keyword_pattern(&rules.mutation)?,
        })
    }
}

fn matches(pattern: Option<&Regex>, text: &str) -> bool {
    pattern.is_some_and(|pattern| pattern.is_match(text))
}

impl EdgeCaseSuggester for RuleSuggester {
    fn suggest_edge_cases(&self, criterion: &AcceptanceCriterion) -> BTreeSet<ScenarioKind> {
        let text = criterion.text();
        let mut kinds = BTreeSet::new();

        if matches(self.input.as_ref(), text) || NUMBER.is_match(text) {
            kinds.extend([ScenarioKind::Negative, ScenarioKind::Boundary]);
        }
        if matches(self.stateful.as_ref(), text) {
            kinds.extend([ScenarioKind::CancelRollback, ScenarioKind::Persistence]);
        }
        if matches(self.mutation.as_ref(), text) {
            kinds.insert(ScenarioKind::UndoRedo);
        }

        kinds
    }
}

/// One scenario to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedScenario<'a> {
    /// The scenario kind.
    pub kind: ScenarioKind,
    /// The criterion under test (`None` for the umbrella).
    pub criterion: Option<&'a AcceptanceCriterion>,
}

/// Expands criteria into scenarios.
pub struct Expander {
    suggester: Box<dyn EdgeCaseSuggester + Send + Sync>,
    max_title_length: usize,
}

impl std::fmt::Debug for Expander {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expander")
            .field("max_title_length", &self.max_title_length)
            .finish_non_exhaustive()
    }
}

impl Expander {
    /// Create an expander.
    #[must_use]
    pub fn new(
        suggester: impl EdgeCaseSuggester + Send + Sync + 'static,
        max_title_length: usize,
    ) -> Self {
        Self {
            suggester: Box::new(suggester),
            max_title_length,
        }
    }

    /// Replace the edge-case suggester.
    pub fn set_suggester(&mut self, suggester: impl EdgeCaseSuggester + Send + Sync + 'static) {
        self.suggester = Box::new(suggester);
    }

    /// The scenarios to generate for a requirement's criteria, in allocation
    /// order.
    ///
    /// Criteria come in ascending ordinal. Within a criterion, kinds are in
    /// taxonomy order. The umbrella comes last.
    #[must_use]
    pub fn plan<'a>(&self, criteria: &'a [AcceptanceCriterion]) -> Vec<PlannedScenario<'a>> {
        let mut planned: Vec<PlannedScenario<'a>> = criteria
            .iter()
            .flat_map(|criterion| {
                let mut kinds = self.suggester.suggest_edge_cases(criterion);
                kinds.remove(&ScenarioKind::Umbrella);
                kinds.extend([ScenarioKind::HappyPath, ScenarioKind::Accessibility]);

                tracing::trace!(
                    "Criterion {} expands to {:?}",
                    criterion.ordinal(),
                    kinds
                );

                kinds.into_iter().map(move |kind| PlannedScenario {
                    kind,
                    criterion: Some(criterion),
                })
            })
            .collect();

        planned.push(PlannedScenario {
            kind: ScenarioKind::Umbrella,
            criterion: None,
        });

        planned
    }

    /// The title of a scenario.
    ///
    /// `{id}: {feature} / {module} / {category} / {sub-category} / {kind}`.
    /// Slashes inside labels are replaced so they cannot be mistaken for
    /// separators.
    ///
    /// Only the scenario descriptor is shortened (with `...`) to respect the
    /// configured length. When the labels leave no room for it, the title
    /// falls back to `{id}: Test Case`. The ID prefix is never cut.
    #[must_use]
    pub fn title(&self, id: &InternalId, planned: &PlannedScenario<'_>) -> String {
        let components = planned.criterion.map_or(UMBRELLA_LABELS, |criterion| {
            criterion.labels().components()
        });
        self.compose_title(id, components, planned.kind)
    }

    fn compose_title(&self, id: &InternalId, components: [&str; 4], kind: ScenarioKind) -> String {
        let path = components
            .into_iter()
            .map(sanitize)
            .collect::<Vec<_>>()
            .join(" / ");
        let prefix = format!("{id}: {path} / ");
        let descriptor = kind.description();

        let available = self.max_title_length.saturating_sub(prefix.chars().count());
        if descriptor.chars().count() <= available {
            return prefix + descriptor;
        }

        truncate(descriptor, available).map_or_else(
            || {
                tracing::debug!("Labels of {id} leave no room for a descriptor");
                format!("{id}: {FALLBACK_DESCRIPTOR}")
            },
            |descriptor| prefix + &descriptor,
        )
    }
}

fn sanitize(component: &str) -> String {
    let cleaned = component
        .replace(['/', '\\'], "-")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if cleaned.is_empty() {
        "-".to_string()
    } else {
        cleaned
    }
}

/// Shorten `text` to at most `max` characters, ending in `...`.
///
/// Returns `None` when not even one character fits before the ellipsis.
fn truncate(text: &str, max: usize) -> Option<String> {
    let keep = max.checked_sub(ELLIPSIS.len()).filter(|&keep| keep > 0)?;
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    Some(truncated)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use test_case::test_case;

    use super::*;
    use crate::domain::Labels;

    fn criterion(ordinal: usize, text: &str) -> AcceptanceCriterion {
        AcceptanceCriterion::new(
            "271309".parse().unwrap(),
            NonZeroUsize::new(ordinal).unwrap(),
            text.to_string(),
            Labels::new("User Management", "Authentication", "Access Control", "Login"),
        )
    }

    fn expander() -> Expander {
        Expander::new(RuleSuggester::new(&Config::default()).unwrap(), 250)
    }

    fn kinds(text: &str) -> Vec<ScenarioKind> {
        let criteria = [criterion(1, text)];
        expander()
            .plan(&criteria)
            .into_iter()
            .filter(|planned| planned.criterion.is_some())
            .map(|planned| planned.kind)
            .collect()
    }

    #[test]
    fn minimal_criterion_gets_happy_path_and_accessibility() {
        assert_eq!(
            kinds("The page has a header."),
            vec![ScenarioKind::HappyPath, ScenarioKind::Accessibility]
        );
    }

    #[test]
    fn numbers_imply_limits() {
        assert_eq!(
            kinds("System must lock account after 5 failed attempts."),
            vec![
                ScenarioKind::HappyPath,
                ScenarioKind::Negative,
                ScenarioKind::Boundary,
                ScenarioKind::CancelRollback,
                ScenarioKind::Persistence,
                ScenarioKind::Accessibility,
            ]
        );
    }

    #[test_case("Title is limited to a maximum length.", ScenarioKind::Boundary; "limits")]
    #[test_case("Invalid email format is rejected.", ScenarioKind::Negative; "validation")]
    #[test_case("Draft is saved when the wizard closes.", ScenarioKind::Persistence; "stateful")]
    #[test_case("User can rename a folder.", ScenarioKind::UndoRedo; "mutation")]
    fn keyword_applicability(text: &str, kind: ScenarioKind) {
        assert!(kinds(text).contains(&kind));
    }

    #[test]
    fn plan_orders_by_criterion_then_taxonomy_and_ends_with_umbrella() {
        let criteria = [
            criterion(1, "User can rename a folder."),
            criterion(2, "The page has a header."),
        ];
        let plan = expander().plan(&criteria);

        let summary: Vec<_> = plan
            .iter()
            .map(|planned| (planned.criterion.map(|c| c.ordinal().get()), planned.kind))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some(1), ScenarioKind::HappyPath),
                (Some(1), ScenarioKind::UndoRedo),
                (Some(1), ScenarioKind::Accessibility),
                (Some(2), ScenarioKind::HappyPath),
                (Some(2), ScenarioKind::Accessibility),
                (None, ScenarioKind::Umbrella),
            ]
        );
    }

    #[test]
    fn custom_suggester_cannot_drop_mandatory_kinds() {
        let mut expander = expander();
        expander.set_suggester(|_: &AcceptanceCriterion| {
            BTreeSet::from([ScenarioKind::Umbrella, ScenarioKind::UndoRedo])
        });

        let criteria = [criterion(1, "Anything.")];
        let kinds: Vec<_> = expander.plan(&criteria).iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ScenarioKind::HappyPath,
                ScenarioKind::UndoRedo,
                ScenarioKind::Accessibility,
                ScenarioKind::Umbrella,
            ]
        );
    }

    #[test]
    fn title_format() {
        let criteria = [criterion(1, "User can log in.")];
        let plan = expander().plan(&criteria);
        let id = InternalId::at("271309".parse().unwrap(), 0);

        assert_eq!(
            expander().title(&id, &plan[0]),
            "271309-AC1: User Management / Authentication / Access Control / Login / Happy Path"
        );
        assert_eq!(
            expander().title(&id, plan.last().unwrap()),
            "271309-AC1: Acceptance Criteria Coverage / Test Coverage / Verification / Sign-off / All Acceptance Criteria"
        );
    }

    #[test]
    fn title_never_contains_criterion_text() {
        let criteria = [criterion(1, "Something <weird> & unusual.")];
        let plan = expander().plan(&criteria);
        let id = InternalId::at("271309".parse().unwrap(), 0);
        assert!(!expander().title(&id, &plan[0]).contains("weird"));
    }

    #[test]
    fn slashes_in_labels_are_replaced() {
        let id = InternalId::at("1".parse().unwrap(), 1);
        let title = expander().compose_title(
            &id,
            ["Input/Output", "A\\B", "  spaced   out ", ""],
            ScenarioKind::Negative,
        );
        assert_eq!(
            title,
            "1-005: Input-Output / A-B / spaced out / - / Negative Input Handling"
        );
    }

    #[test]
    fn long_titles_are_truncated() {
        let expander = Expander::new(RuleSuggester::new(&Config::default()).unwrap(), 40);
        let id = InternalId::at("271309".parse().unwrap(), 2);
        let title = expander.compose_title(&id, ["A", "B", "C", "D"], ScenarioKind::Accessibility);

        assert_eq!(title.chars().count(), 40);
        assert!(title.starts_with("271309-010: A / B / C / D / "));
        assert!(title.ends_with("..."));
    }

    #[test]
    fn only_the_descriptor_is_truncated() {
        let id = InternalId::at("271309".parse().unwrap(), 1);
        let feature = "F".repeat(200);
        let prefix = format!("271309-005: {feature} / B / C / D / ");
        let expander = Expander::new(
            RuleSuggester::new(&Config::default()).unwrap(),
            prefix.len() + 10,
        );

        let labels = [feature.as_str(), "B", "C", "D"];

        let negative = expander.compose_title(&id, labels, ScenarioKind::Negative);
        let boundary = expander.compose_title(&id, labels, ScenarioKind::Boundary);

        assert_eq!(negative, format!("{prefix}Negativ..."));
        assert_eq!(boundary, format!("{prefix}Boundar..."));
    }

    #[test_case(300; "labels longer than the cap")]
    #[test_case(8; "cap shorter than the id")]
    fn labels_filling_the_title_fall_back(max_title_length: usize) {
        let id = InternalId::at("271309".parse().unwrap(), 1);
        let feature = "F".repeat(300);
        let expander = Expander::new(
            RuleSuggester::new(&Config::default()).unwrap(),
            max_title_length,
        );

        let labels = [feature.as_str(), "B", "C", "D"];

        let title = expander.compose_title(&id, labels, ScenarioKind::HappyPath);

        assert_eq!(title, "271309-005: Test Case");
        assert_eq!(InternalId::from_title(&title).unwrap(), id);
    }

    #[test_case("ééééééééé", 6, Some("ééé..."); "char boundaries")]
    #[test_case("Happy Path", 4, Some("H..."); "one character kept")]
    #[test_case("Happy Path", 3, None; "only room for the ellipsis")]
    #[test_case("Happy Path", 0, None; "no room")]
    fn truncate_never_exceeds_max(text: &str, max: usize, expected: Option<&str>) {
        let truncated = truncate(text, max);
        assert_eq!(truncated.as_deref(), expected);
        assert!(truncated.is_none_or(|t| t.chars().count() <= max));
    }
}
