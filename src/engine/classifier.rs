use regex::Regex;

use crate::domain::{Config, Labels, Rule};

/// Assigns feature/module/category/sub-category labels to a criterion.
///
/// The rule-based [`RuleClassifier`] is the default. Any other implementation
/// (for example one backed by a model) can be substituted without touching the
/// rest of the pipeline.
pub trait Classifier {
    /// Label a single normalized criterion.
    fn classify(&self, text: &str) -> Labels;
}

impl<F> Classifier for F
where
    F: Fn(&str) -> Labels,
{
    fn classify(&self, text: &str) -> Labels {
        self(text)
    }
}

/// Keyword classification over an ordered rule table.
///
/// The first rule with a keyword in the text wins. When nothing matches, the
/// fallback labels are used.
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    rules: Vec<(Regex, Labels)>,
    fallback: Labels,
}

impl RuleClassifier {
    /// Compile a rule table.
    ///
    /// Rules without keywords are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a keyword produces an invalid pattern.
    pub fn new(rules: &[Rule], fallback: Labels) -> Result<Self, RuleError> {
        let rules = rules
            .iter()
            .filter_map(|rule| {
                keyword_pattern(&rule.keywords)
                    .transpose()
                    .map(|pattern| pattern.map(|regex| (regex, rule.labels.clone())))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { rules, fallback })
    }

    /// Compile the rule table of a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a keyword produces an invalid pattern.
    pub fn from_config(config: &Config) -> Result<Self, RuleError> {
        Self::new(&config.rules, config.fallback.clone())
    }
}

impl Classifier for RuleClassifier {
    fn classify(&self, text: &str) -> Labels {
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.is_match(text))
            .map_or_else(|| self.fallback.clone(), |(_, labels)| labels.clone())
    }
}

/// A configured pattern that failed to compile.
#[derive(Debug, thiserror::Error)]
#[error("invalid pattern '{pattern}': {source}")]
pub struct RuleError {
    /// The pattern as compiled.
    pub pattern: String,
    /// The underlying regex error.
    pub source: regex::Error,
}

pub(crate) fn compile(pattern: String) -> Result<Regex, RuleError> {
    Regex::new(&pattern).map_err(|source| RuleError { pattern, source })
}

/// Compile a keyword list into a single case-insensitive, word-bounded
/// pattern.
///
/// Keywords are literal. Spaces inside a phrase match any run of whitespace.
/// Returns `None` for an empty list.
pub(crate) fn keyword_pattern(keywords: &[String]) -> Result<Option<Regex>, RuleError> {
    let alternatives: Vec<String> = keywords
        .iter()
        .map(|keyword| keyword.trim())
        .filter(|keyword| !keyword.is_empty())
        .map(|keyword| {
            keyword
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect();

    if alternatives.is_empty() {
        return Ok(None);
    }

    compile(format!(r"(?i)\b(?:{})\b", alternatives.join("|"))).map(Some)
}
