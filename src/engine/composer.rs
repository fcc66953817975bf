//! Step templates for each scenario kind.
//!
//! Every sequence opens by launching the application and closes with the
//! mandatory close step.

use crate::domain::{AcceptanceCriterion, RequirementDocument, ScenarioKind, Step, Steps};

/// The action of the final step of every test case.
pub const CLOSE_ACTION: &str = "Close/Exit the application.";

/// The expected result of the final step of every test case.
pub const CLOSE_EXPECTED: &str =
    "Application closes successfully without crash or freeze; no error dialogs are shown.";

/// What a step template may refer to.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// The requirement under test.
    pub requirement: &'a RequirementDocument,
    /// The criterion under test (`None` for the umbrella).
    pub criterion: Option<&'a AcceptanceCriterion>,
    /// The number of criteria of the requirement.
    pub criteria: usize,
}

impl Context<'_> {
    fn subject(&self) -> &str {
        self.criterion
            .map_or_else(|| self.requirement.title(), AcceptanceCriterion::subject)
    }

    fn area(&self) -> &str {
        self.criterion
            .map_or("application", |criterion| criterion.labels().module.as_str())
    }
}

type Template = fn(&Context<'_>) -> Vec<Step>;

const fn template(kind: ScenarioKind) -> Template {
    match kind {
        ScenarioKind::HappyPath => happy_path,
        ScenarioKind::Negative => negative,
        ScenarioKind::Boundary => boundary,
        ScenarioKind::CancelRollback => cancel_rollback,
        ScenarioKind::Persistence => persistence,
        ScenarioKind::UndoRedo => undo_redo,
        ScenarioKind::Accessibility => accessibility,
        ScenarioKind::Umbrella => umbrella,
    }
}

/// Compose the steps of a scenario.
#[must_use]
pub fn compose(kind: ScenarioKind, context: &Context<'_>) -> Steps {
    Steps::ending_with(
        template(kind)(context),
        Step::new(CLOSE_ACTION, CLOSE_EXPECTED),
    )
}

fn launch() -> Step {
    Step::new(
        "Launch the application.",
        "Application launches successfully and the main window is displayed.",
    )
}

fn navigate(context: &Context<'_>) -> Step {
    let area = context.area();
    Step::new(
        format!("Navigate to the {area} area."),
        format!("The {area} area is displayed and ready for input."),
    )
}

fn happy_path(context: &Context<'_>) -> Vec<Step> {
    let subject = context.subject();
    vec![
        launch(),
        navigate(context),
        Step::new(
            format!("Perform the action under test with valid data: \"{subject}\"."),
            "The action completes without errors or warnings.",
        ),
        Step::new(
            "Verify the outcome.",
            format!("The system behaves as specified: \"{subject}\"."),
        ),
    ]
}

fn negative(context: &Context<'_>) -> Vec<Step> {
    let subject = context.subject();
    vec![
        launch(),
        navigate(context),
        Step::new(
            format!("Attempt \"{subject}\" with invalid, missing or malformed input."),
            "The input is rejected with a clear validation message and no data is changed.",
        ),
        Step::new(
            "Correct the input and retry.",
            "The action succeeds once the input is valid.",
        ),
    ]
}

fn boundary(context: &Context<'_>) -> Vec<Step> {
    let subject = context.subject();
    vec![
        launch(),
        navigate(context),
        Step::new(
            format!("Exercise \"{subject}\" at the minimum allowed value."),
            "The value is accepted and handled correctly.",
        ),
        Step::new(
            format!("Exercise \"{subject}\" at the maximum allowed value."),
            "The value is accepted and handled correctly.",
        ),
        Step::new(
            format!("Exercise \"{subject}\" just beyond the allowed limits."),
            "The value is rejected with a clear message and no data is changed.",
        ),
    ]
}

fn cancel_rollback(context: &Context<'_>) -> Vec<Step> {
    let subject = context.subject();
    vec![
        launch(),
        navigate(context),
        Step::new(
            format!("Start the operation: \"{subject}\"."),
            "The operation starts and offers a way to cancel.",
        ),
        Step::new(
            "Cancel the operation before it completes.",
            "The operation is cancelled and the user is informed.",
        ),
        Step::new(
            "Inspect the affected data.",
            "No partial changes are saved and the previous state is intact.",
        ),
    ]
}

fn persistence(context: &Context<'_>) -> Vec<Step> {
    let subject = context.subject();
    let area = context.area();
    vec![
        launch(),
        navigate(context),
        Step::new(
            format!("Complete the operation: \"{subject}\"."),
            "The operation completes successfully.",
        ),
        Step::new(
            "Close and restart the application.",
            "The application restarts without errors.",
        ),
        Step::new(
            format!("Return to the {area} area and inspect the result."),
            format!("The outcome of \"{subject}\" is preserved after the restart."),
        ),
    ]
}

fn undo_redo(context: &Context<'_>) -> Vec<Step> {
    let subject = context.subject();
    vec![
        launch(),
        navigate(context),
        Step::new(
            format!("Perform the change: \"{subject}\"."),
            "The change is applied and displayed.",
        ),
        Step::new(
            "Undo the last action.",
            "The change is reverted and the previous state is displayed.",
        ),
        Step::new(
            "Redo the last action.",
            "The change is reapplied exactly as before.",
        ),
    ]
}

fn accessibility(context: &Context<'_>) -> Vec<Step> {
    let subject = context.subject();
    let area = context.area();
    vec![
        launch(),
        Step::new(
            format!("Navigate to the {area} area using only the keyboard."),
            "Every control is reachable in a logical tab order with a visible focus indicator.",
        ),
        Step::new(
            format!("Perform \"{subject}\" using only the keyboard."),
            "The action can be completed without a mouse.",
        ),
        Step::new(
            "Repeat the action with a screen reader enabled.",
            "Controls, state changes and messages are announced with meaningful names and roles.",
        ),
        Step::new(
            "Check colour contrast and scale the text to 200%.",
            "Text and controls meet WCAG 2.1 AA contrast and remain usable when scaled.",
        ),
    ]
}

fn umbrella(context: &Context<'_>) -> Vec<Step> {
    let id = context.requirement.id();
    let count = context.criteria;
    vec![
        launch(),
        Step::new(
            format!("Review the acceptance criteria of requirement {id}."),
            format!("All {count} acceptance criteria are listed and understood."),
        ),
        Step::new(
            "Execute the test cases generated for each acceptance criterion.",
            "Every test case passes.",
        ),
        Step::new(
            "Check that each acceptance criterion is covered by at least one passing test case.",
            format!("Coverage is complete for criteria 1 to {count}."),
        ),
        Step::new(
            "Record the sign-off result.",
            format!("Requirement {id} is marked as verified."),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use test_case::test_case;

    use super::*;
    use crate::domain::Labels;

    fn requirement() -> RequirementDocument {
        RequirementDocument::new("271309".parse().unwrap(), "Login".to_string())
    }

    fn criterion() -> AcceptanceCriterion {
        AcceptanceCriterion::new(
            "271309".parse().unwrap(),
            NonZeroUsize::MIN,
            "User can log in.".to_string(),
            Labels::new("User Management", "Authentication", "Access Control", "Login"),
        )
    }

    #[test_case(ScenarioKind::HappyPath, 5)]
    #[test_case(ScenarioKind::Negative, 5)]
    #[test_case(ScenarioKind::Boundary, 6)]
    #[test_case(ScenarioKind::CancelRollback, 6)]
    #[test_case(ScenarioKind::Persistence, 6)]
    #[test_case(ScenarioKind::UndoRedo, 6)]
    #[test_case(ScenarioKind::Accessibility, 6)]
    #[test_case(ScenarioKind::Umbrella, 6)]
    fn every_kind_ends_with_close_step(kind: ScenarioKind, len: usize) {
        let requirement = requirement();
        let criterion = criterion();
        let context = Context {
            requirement: &requirement,
            criterion: (kind != ScenarioKind::Umbrella).then_some(&criterion),
            criteria: 1,
        };

        let steps = compose(kind, &context);
        assert_eq!(steps.len(), len);
        assert_eq!(steps.last().action, CLOSE_ACTION);
        assert_eq!(steps.last().expected, CLOSE_EXPECTED);
        assert!(steps.iter().all(|step| !step.action.trim().is_empty()));
        assert!(steps.iter().all(|step| !step.expected.trim().is_empty()));
    }

    #[test]
    fn steps_refer_to_subject_and_area() {
        let requirement = requirement();
        let criterion = criterion();
        let context = Context {
            requirement: &requirement,
            criterion: Some(&criterion),
            criteria: 1,
        };

        let steps: Vec<Step> = compose(ScenarioKind::HappyPath, &context).into();
        assert_eq!(steps[1].action, "Navigate to the Authentication area.");
        assert!(steps[2].action.contains("\"User can log in\""));
    }

    #[test]
    fn umbrella_refers_to_requirement() {
        let requirement = requirement();
        let context = Context {
            requirement: &requirement,
            criterion: None,
            criteria: 3,
        };

        let steps: Vec<Step> = compose(ScenarioKind::Umbrella, &context).into();
        assert_eq!(
            steps[1].action,
            "Review the acceptance criteria of requirement 271309."
        );
        assert_eq!(steps[3].expected, "Coverage is complete for criteria 1 to 3.");
    }
}
