use std::{fmt, ops::Deref, str::FromStr};

use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};

/// The identifier of a requirement document.
///
/// A non-empty token of ASCII alphanumerics, `-`, `_` and `.`. It may not
/// start or end with `-`, since the `-` is the separator used by
/// [`InternalId`](crate::domain::InternalId).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequirementId(NonEmptyString);

impl RequirementId {
    /// Creates a new `RequirementId` from a string.
    ///
    /// # Errors
    ///
    /// Returns [`RequirementIdError`] if the string is empty, contains
    /// characters outside `[A-Za-z0-9._-]`, or starts or ends with `-`.
    pub fn new(s: String) -> Result<Self, RequirementIdError> {
        let non_empty =
            NonEmptyString::new(s.clone()).map_err(|_| RequirementIdError(s.clone()))?;

        let valid_chars = s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid_chars || s.starts_with('-') || s.ends_with('-') {
            return Err(RequirementIdError(s));
        }

        Ok(Self(non_empty))
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Error returned when a string is not a valid requirement identifier.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error(
    "Invalid requirement ID '{0}': must be non-empty, contain only [A-Za-z0-9._-], and not \
     start or end with '-'"
)]
pub struct RequirementIdError(String);

impl TryFrom<String> for RequirementId {
    type Error = RequirementIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for RequirementId {
    type Error = RequirementIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl FromStr for RequirementId {
    type Err = RequirementIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl From<RequirementId> for String {
    fn from(id: RequirementId) -> Self {
        id.0.as_str().to_string()
    }
}

impl Deref for RequirementId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl fmt::Display for RequirementId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A requirement document, as supplied by the retrieval collaborator.
///
/// This is the immutable input to the generation pipeline. The acceptance
/// criteria may live in a dedicated field, or be embedded in the description
/// under an "Acceptance Criteria" heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementDocument {
    id: RequirementId,
    title: String,
    description: String,
    acceptance_criteria: String,
}

impl RequirementDocument {
    /// Construct a document with an empty description and no dedicated
    /// acceptance criteria.
    #[must_use]
    pub const fn new(id: RequirementId, title: String) -> Self {
        Self {
            id,
            title,
            description: String::new(),
            acceptance_criteria: String::new(),
        }
    }

    /// Set the free-text description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the dedicated acceptance-criteria field.
    #[must_use]
    pub fn with_acceptance_criteria(mut self, acceptance_criteria: impl Into<String>) -> Self {
        self.acceptance_criteria = acceptance_criteria.into();
        self
    }

    /// The requirement identifier.
    #[must_use]
    pub const fn id(&self) -> &RequirementId {
        &self.id
    }

    /// The requirement title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The raw description text.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The raw text of the dedicated acceptance-criteria field.
    ///
    /// This is empty when the field was not populated.
    #[must_use]
    pub fn acceptance_criteria(&self) -> &str {
        &self.acceptance_criteria
    }
}
