use nonempty::NonEmpty;
use serde::Serialize;

/// A single test step: an action and the result expected from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    /// What the tester does.
    pub action: String,
    /// What the tester should observe.
    pub expected: String,
}

impl Step {
    /// Construct a step.
    #[must_use]
    pub fn new(action: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            expected: expected.into(),
        }
    }
}

/// An ordered, non-empty sequence of test steps.
///
/// Step identifiers are implicit: the first step is step 1, and identifiers
/// are contiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "Vec<Step>")]
pub struct Steps(NonEmpty<Step>);

impl Steps {
    /// Build a sequence from the given steps followed by a final step.
    #[must_use]
    pub fn ending_with(steps: Vec<Step>, last: Step) -> Self {
        match NonEmpty::from_vec(steps) {
            Some(mut steps) => {
                steps.push(last);
                Self(steps)
            }
            None => Self(NonEmpty::new(last)),
        }
    }

    /// Build a sequence from a vector, returning `None` if it is empty.
    #[must_use]
    pub fn from_vec(steps: Vec<Step>) -> Option<Self> {
        NonEmpty::from_vec(steps).map(Self)
    }

    /// The number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; a step sequence is never empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// The final step.
    #[must_use]
    pub fn last(&self) -> &Step {
        self.0.last()
    }

    /// Iterate over the steps in order.
    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.0.iter()
    }

    /// Iterate over the steps paired with their 1-based identifiers.
    pub fn numbered(&self) -> impl Iterator<Item = (usize, &Step)> {
        self.0.iter().enumerate().map(|(i, step)| (i + 1, step))
    }
}

impl From<Steps> for Vec<Step> {
    fn from(steps: Steps) -> Self {
        steps.0.into()
    }
}
