use std::{fmt, num::NonZeroUsize, str::FromStr};

use serde::{Serialize, Serializer};

use crate::domain::{RequirementId, requirement::RequirementIdError};

/// The increment between consecutive numbered slots.
///
/// The gaps between allocated numbers are reserved for hand-written test
/// cases.
pub const STEP: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(step) => step,
    None => unreachable!(),
};

/// The zero-padded width of numbered slots.
pub const DIGITS: usize = 3;

/// The suffix of the first test case of a requirement.
const FIRST_SLOT: &str = "AC1";

/// The per-requirement part of an [`InternalId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    /// The first test case of a requirement (`AC1`).
    First,
    /// Any subsequent test case (`005`, `010`, ...).
    Numbered(NonZeroUsize),
}

impl Slot {
    /// The slot allocated to the candidate at the given zero-based position.
    ///
    /// Position 0 is [`Slot::First`]; position `n` is `n * 5`.
    #[must_use]
    pub const fn at(position: usize) -> Self {
        match NonZeroUsize::new(position) {
            None => Self::First,
            Some(n) => Self::Numbered(n.saturating_mul(STEP)),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::First => write!(f, "{FIRST_SLOT}"),
            Self::Numbered(n) => write!(f, "{:0width$}", n, width = DIGITS),
        }
    }
}

/// The stable, human-readable identifier of a generated test case.
///
/// Format: `{RequirementID}-AC1` for the first test case of a requirement,
/// `{RequirementID}-{NNN}` for every other one.
///
/// Examples: `271309-AC1`, `271309-005`, `US-42-010`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternalId {
    requirement: RequirementId,
    slot: Slot,
}

impl InternalId {
    /// Create an internal ID from its parts.
    #[must_use]
    pub const fn new(requirement: RequirementId, slot: Slot) -> Self {
        Self { requirement, slot }
    }

    /// The ID allocated to the candidate at the given zero-based position.
    #[must_use]
    pub const fn at(requirement: RequirementId, position: usize) -> Self {
        Self::new(requirement, Slot::at(position))
    }

    /// The requirement this test case belongs to.
    #[must_use]
    pub const fn requirement(&self) -> &RequirementId {
        &self.requirement
    }

    /// The per-requirement slot.
    #[must_use]
    pub const fn slot(&self) -> Slot {
        self.slot
    }

    /// Parse the internal ID from the prefix of a title.
    ///
    /// Titles have the form `{InternalID}: ...`. The whole prefix before the
    /// first `:` must parse, so `271309-00: ...` never matches `271309-005`.
    ///
    /// Unlike [`str::parse`], the prefix must also be in the form this crate
    /// writes, with the slot zero-padded to three digits. A hand-written
    /// `271309-5: ...` would otherwise claim the slot of `271309-005`.
    /// Titles remain a best-effort key: a hand-edited title that happens to
    /// carry another case's canonical ID still matches that case.
    ///
    /// # Errors
    ///
    /// Returns an error if the title has no `:` separator, or if the prefix is
    /// not a valid internal ID in canonical form.
    pub fn from_title(title: &str) -> Result<Self, Error> {
        let (prefix, _) = title
            .split_once(':')
            .ok_or_else(|| Error::Syntax(title.to_string()))?;
        let prefix = prefix.trim();
        let id: Self = prefix.parse()?;
        if id.to_string().eq_ignore_ascii_case(prefix) {
            Ok(id)
        } else {
            Err(Error::NonCanonical(prefix.to_string()))
        }
    }
}

impl fmt::Display for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.requirement, self.slot)
    }
}

impl Serialize for InternalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Errors that can occur when parsing an internal ID.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// Invalid internal ID format (malformed structure).
    #[error("Invalid internal ID format: {0}")]
    Syntax(String),

    /// The slot is neither `AC1` nor a positive integer.
    #[error("Invalid slot in internal ID '{0}': expected 'AC1' or a non-zero integer, got {1}")]
    Slot(String, String),

    /// The ID is valid but not written the way generated titles write it.
    #[error("Internal ID '{0}' is not zero-padded to the canonical form")]
    NonCanonical(String),

    /// The requirement part is not a valid requirement ID.
    #[error(transparent)]
    Requirement(#[from] RequirementIdError),
}

impl FromStr for InternalId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (requirement, slot) = s
            .rsplit_once('-')
            .ok_or_else(|| Error::Syntax(s.to_string()))?;

        if requirement.is_empty() || slot.is_empty() {
            return Err(Error::Syntax(s.to_string()));
        }

        let slot = if slot.eq_ignore_ascii_case(FIRST_SLOT) {
            Slot::First
        } else {
            if !slot.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::Slot(s.to_string(), slot.to_string()));
            }
            slot.parse::<usize>()
                .ok()
                .and_then(NonZeroUsize::new)
                .map(Slot::Numbered)
                .ok_or_else(|| Error::Slot(s.to_string(), slot.to_string()))?
        };

        Ok(Self::new(requirement.parse()?, slot))
    }
}

impl TryFrom<&str> for InternalId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}
