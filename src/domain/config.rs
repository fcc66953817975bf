use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::Labels;

/// Configuration for test case generation.
///
/// This holds the rule tables that drive criterion extraction, classification
/// and scenario applicability. Replacing it is how the heuristics are tuned
/// without touching the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Regex fragments that introduce an acceptance-criteria section in a
    /// description.
    ///
    /// Matched case-insensitively at the start of a line, optionally behind a
    /// markdown heading marker or bold markers.
    pub headings: Vec<String>,

    /// Regex fragments naming headings that end an acceptance-criteria section.
    pub section_terminators: Vec<String>,

    /// The ordered classification rule table. The first matching rule wins.
    pub rules: Vec<Rule>,

    /// The labels assigned when no rule matches.
    pub fallback: Labels,

    /// Keyword tables deciding which scenario kinds apply to a criterion.
    pub scenarios: ScenarioRules,

    /// The maximum length of a composed title, in characters.
    ///
    /// Only the scenario descriptor is shortened to fit. A title whose ID
    /// alone does not fit becomes `{id}: Test Case` regardless.
    pub max_title_length: usize,
}

/// A keyword classification rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Words or phrases that trigger this rule.
    ///
    /// Matched case-insensitively on word boundaries.
    pub keywords: Vec<String>,

    /// The labels assigned when the rule matches.
    #[serde(flatten)]
    pub labels: Labels,
}

impl Rule {
    fn new(keywords: &[&str], labels: [&str; 4]) -> Self {
        let [feature, module, category, sub_category] = labels;
        Self {
            keywords: keywords.iter().map(ToString::to_string).collect(),
            labels: Labels::new(feature, module, category, sub_category),
        }
    }
}

/// Keyword tables for scenario applicability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioRules {
    /// Words implying validated input. These add negative and boundary
    /// scenarios.
    pub validation: Vec<String>,

    /// Words implying numeric or size limits. These add negative and boundary
    /// scenarios, as does any number in the criterion.
    pub limits: Vec<String>,

    /// Words implying a multi-step or stateful operation. These add
    /// cancel/rollback and persistence scenarios.
    pub stateful: Vec<String>,

    /// Words implying a mutable action. These add undo/redo scenarios.
    pub mutation: Vec<String>,
}

fn words(words: &[&str]) -> Vec<String> {
    words.iter().map(ToString::to_string).collect()
}

impl Default for ScenarioRules {
    fn default() -> Self {
        Self {
            validation: words(&[
                "valid",
                "invalid",
                "validate",
                "validation",
                "credentials",
                "password",
                "required",
                "mandatory",
                "format",
                "input",
                "enter",
                "reject",
                "error",
            ]),
            limits: words(&[
                "maximum", "minimum", "max", "min", "limit", "at least", "at most", "up to",
                "exceed", "exceeds", "length", "size", "characters", "attempts", "range",
            ]),
            stateful: words(&[
                "save",
                "saved",
                "persist",
                "persists",
                "stored",
                "submit",
                "lock",
                "locked",
                "session",
                "state",
                "workflow",
                "wizard",
                "import",
                "export",
                "upload",
                "after",
                "restart",
            ]),
            mutation: words(&[
                "edit", "modify", "update", "change", "delete", "remove", "create", "add",
                "rename", "move", "reorder", "drag", "undo", "redo",
            ]),
        }
    }
}

fn default_headings() -> Vec<String> {
    words(&[
        r"acceptance\s+criteria(?:\s+are)?",
        r"acceptance\s+requirements",
        r"ac",
        r"criteria",
    ])
}

fn default_section_terminators() -> Vec<String> {
    words(&[
        r"notes?",
        r"additional\s+info(?:rmation)?",
        r"technical\s+details",
        r"implementation\s+notes",
        r"out\s+of\s+scope",
    ])
}

fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            &[
                "accessibility",
                "screen reader",
                "keyboard",
                "wcag",
                "contrast",
                "focus",
            ],
            ["User Interface", "Accessibility", "Compliance", "Assistive Access"],
        ),
        Rule::new(
            &[
                "log in",
                "login",
                "log on",
                "sign in",
                "authentication",
                "authenticate",
                "credentials",
                "password",
            ],
            ["User Management", "Authentication", "Access Control", "Login"],
        ),
        Rule::new(
            &["scroll", "scrolling", "scrollbar"],
            ["User Interface", "Navigation", "Display", "Scrolling"],
        ),
        Rule::new(
            &["sort", "sorted", "order", "ordering", "ascending", "descending"],
            ["Data Management", "Presentation", "Display", "Ordering"],
        ),
        Rule::new(
            &["retain", "retention", "limit", "maximum", "most recent", "oldest"],
            ["Data Management", "Storage", "Constraints", "Limit-Retention"],
        ),
        Rule::new(
            &["only", "restrict", "restricted", "scope", "per user", "permission"],
            ["Data Management", "Access Rules", "Constraints", "Restrictions-Scope"],
        ),
        Rule::new(
            &["refresh", "refreshes", "real-time", "automatically update", "live"],
            ["User Interface", "Display", "Behavior", "Dynamic Refresh"],
        ),
        Rule::new(
            &["reset", "cleared", "clear", "reinitialize"],
            ["Data Management", "State", "Behavior", "Reset Conditions"],
        ),
        Rule::new(
            &["log", "logged", "history", "audit", "track", "tracked", "recent"],
            ["Data Management", "History", "Tracking", "Logging-Tracking"],
        ),
        Rule::new(
            &["save", "saved", "persist", "persists", "stored", "store"],
            ["Data Management", "Storage", "Persistence", "Save-Load"],
        ),
        Rule::new(
            &["delete", "deleted", "remove", "removed"],
            ["Data Management", "Records", "Modification", "Deletion"],
        ),
        Rule::new(
            &["create", "created", "add", "added", "new"],
            ["Data Management", "Records", "Modification", "Creation"],
        ),
        Rule::new(
            &["edit", "edited", "modify", "modified", "update", "updated", "change"],
            ["Data Management", "Records", "Modification", "Editing"],
        ),
        Rule::new(
            &["display", "displayed", "show", "shown", "visible", "hidden", "view"],
            ["User Interface", "Display", "Visibility", "Presentation"],
        ),
    ]
}

fn default_fallback() -> Labels {
    Labels::new("General", "Functional", "Behavior", "Default")
}

const fn default_max_title_length() -> usize {
    250
}

impl Default for Config {
    fn default() -> Self {
        Self {
            headings: default_headings(),
            section_terminators: default_section_terminators(),
            rules: default_rules(),
            fallback: default_fallback(),
            scenarios: ScenarioRules::default(),
            max_title_length: default_max_title_length(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_max_title_length")]
        max_title_length: usize,

        #[serde(default = "default_headings")]
        headings: Vec<String>,

        #[serde(default = "default_section_terminators")]
        section_terminators: Vec<String>,

        #[serde(default = "default_fallback")]
        fallback: Labels,

        #[serde(default)]
        scenarios: ScenarioRules,

        /// Kept last so that TOML renders the table array after the plain keys.
        #[serde(default = "default_rules")]
        rules: Vec<Rule>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                max_title_length,
                headings,
                section_terminators,
                fallback,
                scenarios,
                rules,
            } => Self {
                headings,
                section_terminators,
                rules,
                fallback,
                scenarios,
                max_title_length,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            max_title_length: config.max_title_length,
            headings: config.headings,
            section_terminators: config.section_terminators,
            fallback: config.fallback,
            scenarios: config.scenarios,
            rules: config.rules,
        }
    }
}
