use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::domain::{Fingerprint, RequirementId};

/// The feature/module/category/sub-category labels of a criterion.
///
/// Labels are used to compose test case titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    /// The product feature, e.g. "User Management".
    pub feature: String,
    /// The module within the feature, e.g. "Authentication".
    pub module: String,
    /// The behavioural category, e.g. "Access Control".
    pub category: String,
    /// The sub-category, e.g. "Login".
    pub sub_category: String,
}

impl Labels {
    /// Construct a label set.
    #[must_use]
    pub fn new(
        feature: impl Into<String>,
        module: impl Into<String>,
        category: impl Into<String>,
        sub_category: impl Into<String>,
    ) -> Self {
        Self {
            feature: feature.into(),
            module: module.into(),
            category: category.into(),
            sub_category: sub_category.into(),
        }
    }

    /// The four components in title order.
    #[must_use]
    pub fn components(&self) -> [&str; 4] {
        [
            &self.feature,
            &self.module,
            &self.category,
            &self.sub_category,
        ]
    }
}

/// An atomic acceptance criterion extracted from a requirement.
///
/// Criteria are created by the normalizer and are immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptanceCriterion {
    requirement: RequirementId,
    ordinal: NonZeroUsize,
    text: String,
    labels: Labels,
    fingerprint: Fingerprint,
}

impl AcceptanceCriterion {
    /// Construct a criterion from normalized text.
    ///
    /// The fingerprint is derived from the text.
    #[must_use]
    pub fn new(
        requirement: RequirementId,
        ordinal: NonZeroUsize,
        text: String,
        labels: Labels,
    ) -> Self {
        let fingerprint = Fingerprint::of(&text.as_str());
        Self {
            requirement,
            ordinal,
            text,
            labels,
            fingerprint,
        }
    }

    /// The parent requirement.
    #[must_use]
    pub const fn requirement(&self) -> &RequirementId {
        &self.requirement
    }

    /// The 1-based position of this criterion within its requirement.
    #[must_use]
    pub const fn ordinal(&self) -> NonZeroUsize {
        self.ordinal
    }

    /// The normalized text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The text without its terminal punctuation.
    ///
    /// This is the form that is quoted inside test steps.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.text.trim_end_matches(['.', '!', '?']).trim_end()
    }

    /// The classifier labels.
    #[must_use]
    pub const fn labels(&self) -> &Labels {
        &self.labels
    }

    /// A stable hash of the normalized text.
    #[must_use]
    pub const fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criterion(text: &str) -> AcceptanceCriterion {
        AcceptanceCriterion::new(
            "1".parse().unwrap(),
            NonZeroUsize::MIN,
            text.to_string(),
            Labels::new("F", "M", "C", "S"),
        )
    }

    #[test]
    fn fingerprint_depends_on_text_only() {
        let a = criterion("User can log in.");
        let mut b = AcceptanceCriterion::new(
            "2".parse().unwrap(),
            NonZeroUsize::new(3).unwrap(),
            "User can log in.".to_string(),
            Labels::new("A", "B", "C", "D"),
        );
        assert_eq!(a.fingerprint(), b.fingerprint());

        b = criterion("User can log out.");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn subject_strips_terminal_punctuation() {
        assert_eq!(criterion("User can log in.").subject(), "User can log in");
        assert_eq!(criterion("Really?!").subject(), "Really");
        assert_eq!(criterion("No punctuation").subject(), "No punctuation");
    }
}
