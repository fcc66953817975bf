//! Splitting raw acceptance-criteria text into atomic criteria.
//!
//! The source text is the requirement's dedicated acceptance-criteria field
//! when it has content, otherwise the acceptance-criteria section of the
//! description. A section starts at a recognised heading and runs until the
//! next markdown heading or terminator heading (`Notes:`, `Out of scope:`, ...).
//!
//! The source is split into items:
//!
//! - Several consecutively numbered items on one line (`1. a 2. b 3. c`) are
//!   first exploded onto separate lines.
//! - If any line starts with a bullet or number marker, the text is a list.
//!   Each marker starts a new item, and unmarked lines continue the current
//!   one.
//! - Otherwise the text is prose, and is split into sentences.
//!
//! In both cases blank lines are hard boundaries. Each item has its inline
//! markdown stripped and its whitespace collapsed, and gets a terminal `.` if
//! it has no terminal punctuation. Items
//! that repeat an earlier item (ignoring case) are dropped.

use std::{collections::BTreeSet, num::NonZeroUsize, sync::LazyLock};

use regex::Regex;

use crate::{
    domain::{AcceptanceCriterion, Config, RequirementDocument, RequirementId},
    engine::{
        Classifier,
        classifier::{RuleError, compile},
    },
};

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\d{1,3}[.)]|[-*•+])\s+").expect("list marker regex is valid")
});
static INLINE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(\d{1,3})[.)]\s").expect("inline number regex is valid")
});
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+").expect("sentence regex is valid"));

/// Inline markdown, paired with the replacement that keeps its text.
static MARKDOWN: LazyLock<[(Regex, &str); 6]> = LazyLock::new(|| {
    [
        (r"^\s*#{1,6}\s+", ""),
        (r"`([^`]+)`", "$1"),
        (r"!?\[([^\]]+)\]\([^)]*\)", "$1"),
        (r"\*\*([^*]+)\*\*", "$1"),
        (r"__([^_]+)__", "$1"),
        (r"\*([^*\s][^*]*)\*", "$1"),
    ]
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("markdown regex is valid"),
            replacement,
        )
    })
});

/// No acceptance-criteria content was found for a requirement.
///
/// This aborts generation for the requirement.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("no acceptance criteria found for requirement {requirement}")]
pub struct EmptyCriteriaError {
    /// The requirement with no criteria.
    pub requirement: RequirementId,
}

/// Extracts atomic criteria from requirement documents.
#[derive(Debug, Clone)]
pub struct Normalizer {
    heading: Regex,
    terminator: Regex,
}

impl Normalizer {
    /// Compile the heading and terminator patterns of a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured pattern is not a valid regex.
    pub fn new(config: &Config) -> Result<Self, RuleError> {
        let headings = alternatives(&config.headings);
        let heading = compile(format!(
            r"(?im)^[ \t]*(?:#{{1,6}}[ \t]*)?(?:\*\*|__)?(?:{headings})\b[ \t]*(?:\*\*|__)?[ \t]*(?::[ \t]*(?:\*\*|__)?|$)"
        ))?;

        let terminators = alternatives(&config.section_terminators);
        let terminator = compile(format!(
            r"(?im)^[ \t]*(?:#{{1,6}}[ \t]+\S|(?:\*\*|__)?(?:{terminators})\b[ \t]*(?:\*\*|__)?[ \t]*:)"
        ))?;

        Ok(Self {
            heading,
            terminator,
        })
    }

    /// Extract the normalized criterion texts of a requirement, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if neither the dedicated field nor the description
    /// yields any criteria.
    pub fn extract(&self, doc: &RequirementDocument) -> Result<Vec<String>, EmptyCriteriaError> {
        let source = if doc.acceptance_criteria().trim().is_empty() {
            let section = self.section(doc.description());
            if section.is_none() {
                tracing::debug!(
                    "No acceptance criteria section in description of {}",
                    doc.id()
                );
            }
            section.unwrap_or_default()
        } else {
            doc.acceptance_criteria()
        };

        let mut seen = BTreeSet::new();
        let items: Vec<String> = split(source)
            .into_iter()
            .filter_map(|item| normalize_item(&item))
            .filter(|item| seen.insert(item.to_lowercase()))
            .collect();

        if items.is_empty() {
            return Err(EmptyCriteriaError {
                requirement: doc.id().clone(),
            });
        }

        tracing::debug!("Extracted {} criteria from {}", items.len(), doc.id());
        Ok(items)
    }

    /// Extract, classify and number the criteria of a requirement.
    ///
    /// # Errors
    ///
    /// Returns an error if no criteria are found.
    pub fn normalize(
        &self,
        doc: &RequirementDocument,
        classifier: &dyn Classifier,
    ) -> Result<Vec<AcceptanceCriterion>, EmptyCriteriaError> {
        Ok(self
            .extract(doc)?
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let labels = classifier.classify(&text);
                AcceptanceCriterion::new(
                    doc.id().clone(),
                    NonZeroUsize::MIN.saturating_add(index),
                    text,
                    labels,
                )
            })
            .collect())
    }

    /// The acceptance-criteria section of a description, if it has one.
    fn section<'a>(&self, description: &'a str) -> Option<&'a str> {
        let heading = self.heading.find(description)?;
        let rest = &description[heading.end()..];

        // terminators are only recognised from the line after the heading
        let next_line = rest.find('\n').map_or(rest.len(), |i| i + 1);
        let end = self
            .terminator
            .find_at(rest, next_line)
            .map_or(rest.len(), |m| m.start());

        Some(&rest[..end])
    }
}

fn alternatives(patterns: &[String]) -> String {
    patterns
        .iter()
        .map(|pattern| format!("(?:{pattern})"))
        .collect::<Vec<_>>()
        .join("|")
}

/// Split source text into raw items.
fn split(source: &str) -> Vec<String> {
    let lines: Vec<String> = source.lines().flat_map(explode_inline_numbering).collect();

    if lines.iter().any(|line| LIST_MARKER.is_match(line)) {
        split_list(&lines)
    } else {
        split_prose(&lines)
    }
}

/// Break a line holding several consecutively numbered items into one line
/// per item.
///
/// A line with a single number, or numbers that do not count up by one, is
/// left alone.
fn explode_inline_numbering(line: &str) -> Vec<String> {
    let markers: Vec<(usize, usize)> = INLINE_NUMBER
        .captures_iter(line)
        .filter_map(|captures| {
            let number = captures.get(1)?;
            Some((number.as_str().parse().ok()?, number.start()))
        })
        .collect();

    let consecutive = markers.len() >= 2
        && markers
            .windows(2)
            .all(|pair| pair[1].0 == pair[0].0 + 1);
    if !consecutive {
        return vec![line.to_string()];
    }

    let mut pieces = Vec::with_capacity(markers.len() + 1);
    let mut start = 0;
    for &(_, offset) in &markers {
        pieces.push(&line[start..offset]);
        start = offset;
    }
    pieces.push(&line[start..]);

    pieces
        .into_iter()
        .filter(|piece| !piece.trim().is_empty())
        .map(ToString::to_string)
        .collect()
}

fn split_list(lines: &[String]) -> Vec<String> {
    let mut items = Vec::new();
    let mut current: Option<String> = None;

    for line in lines {
        if line.trim().is_empty() {
            items.extend(current.take());
        } else if let Some(marker) = LIST_MARKER.find(line) {
            items.extend(current.take());
            current = Some(line[marker.end()..].to_string());
        } else if let Some(item) = current.as_mut() {
            item.push(' ');
            item.push_str(line);
        } else {
            current = Some(line.clone());
        }
    }
    items.extend(current);

    items
}

fn split_prose(lines: &[String]) -> Vec<String> {
    lines
        .split(|line| line.trim().is_empty())
        .filter(|paragraph| !paragraph.is_empty())
        .flat_map(|paragraph| {
            let paragraph = paragraph.join(" ");
            let mut sentences = Vec::new();
            let mut start = 0;
            for end in SENTENCE_END.find_iter(&paragraph) {
                let punctuation = end.as_str().trim_end().len();
                sentences.push(paragraph[start..end.start() + punctuation].to_string());
                start = end.end();
            }
            sentences.push(paragraph[start..].to_string());
            sentences
        })
        .collect()
}

/// Strip inline markdown, collapse whitespace and ensure terminal
/// punctuation.
///
/// Returns `None` for an item with no text.
fn normalize_item(item: &str) -> Option<String> {
    let plain = strip_markdown(item);
    let mut text = plain.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }
    if !text.ends_with(['.', '!', '?']) {
        text.push('.');
    }
    Some(text)
}

/// Reduce inline markdown to its text.
///
/// Heading markers, code spans, links, images and emphasis are removed.
/// Steps are published as plain text.
fn strip_markdown(text: &str) -> String {
    MARKDOWN
        .iter()
        .fold(text.to_string(), |text, (pattern, replacement)| {
            pattern.replace_all(&text, *replacement).into_owned()
        })
}
