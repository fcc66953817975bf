use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::domain::{RequirementDocument, RequirementId, RequirementIdError};

/// A requirement serialized in markdown format.
///
/// ```markdown
/// ---
/// _version: '1'
/// acceptance_criteria: |
///   1. User can log in with valid credentials.
/// ---
/// # 271309 Login
///
/// Free-text description.
/// ```
///
/// The frontmatter is optional. When present, it may carry a dedicated
/// acceptance-criteria block. The first heading holds the requirement ID and
/// title, and everything after it is the description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownRequirement {
    frontmatter: FrontMatter,
    id: RequirementId,
    title: String,
    body: String,
}

impl MarkdownRequirement {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let heading = format!("# {} {}", self.id, self.title);

        let mut result = String::new();
        if self.frontmatter != FrontMatter::default() {
            let frontmatter =
                serde_yaml::to_string(&self.frontmatter).expect("this must never fail");
            result.push_str(&format!("---\n{frontmatter}---\n"));
        }
        if self.body.is_empty() {
            result.push_str(&format!("{heading}\n"));
        } else {
            result.push_str(&format!("{heading}\n\n{}\n", self.body));
        }

        writer.write_all(result.as_bytes())
    }

    pub(crate) fn read<R: BufRead>(reader: &mut R) -> Result<Self, LoadError> {
        let mut lines = reader.lines().peekable();

        // Skip leading blank lines
        while lines
            .next_if(|line| line.as_ref().is_ok_and(|l| l.trim().is_empty()))
            .is_some()
        {}

        let has_frontmatter = lines
            .peek()
            .is_some_and(|line| line.as_ref().is_ok_and(|l| l.trim() == "---"));

        let frontmatter = if has_frontmatter {
            lines.next();

            // Collect lines until next '---', keeping every line terminator so
            // that block scalars keep their final newline
            let mut yaml = String::new();
            for line in lines.by_ref().map_while(|line| match line {
                Ok(content) if content.trim() == "---" => None,
                other => Some(other),
            }) {
                yaml.push_str(&line?);
                yaml.push('\n');
            }
            serde_yaml::from_str(&yaml)?
        } else {
            FrontMatter::default()
        };

        // The rest of the lines are Markdown content
        let content = lines.collect::<Result<Vec<_>, _>>()?.join("\n");

        let (id, title, body) = parse_content(&content)?;

        Ok(Self {
            frontmatter,
            id,
            title,
            body,
        })
    }

    /// Writes the requirement to a specific file path.
    ///
    /// Parent directories are created automatically if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    pub fn save_to_path(&self, file_path: &Path) -> io::Result<()> {
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(file_path)?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer)?;
        writer.flush()
    }

    /// Reads a requirement from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(file_path: &Path) -> Result<Self, LoadError> {
        let file = File::open(file_path).map_err(|io_error| match io_error.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound,
            _ => LoadError::Io(io_error),
        })?;

        let mut reader = BufReader::new(file);
        Self::read(&mut reader)
    }
}

/// Parses markdown content into requirement ID, title, and body.
///
/// The requirement ID must be the first token in the first heading (after the
/// `#` markers), followed by the title. The body is everything after the
/// first heading.
fn parse_content(content: &str) -> Result<(RequirementId, String, String), LoadError> {
    let (heading_line_idx, line) = content
        .lines()
        .enumerate()
        .find(|(_, line)| line.trim().starts_with('#'))
        .ok_or(LoadError::MissingHeading)?;

    let after_hashes = line.trim().trim_start_matches('#').trim();

    let first_token = after_hashes
        .split_whitespace()
        .next()
        .ok_or(LoadError::MissingHeading)?;

    let id = first_token.parse::<RequirementId>()?;

    let title = after_hashes
        .strip_prefix(first_token)
        .unwrap_or("")
        .trim()
        .to_string();

    let body = content
        .lines()
        .skip(heading_line_idx + 1)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    Ok((id, title, body))
}

/// Errors that can occur when loading a requirement from markdown.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The requirement file was not found.
    #[error("requirement file not found")]
    NotFound,
    /// An I/O error occurred.
    #[error("failed to read from markdown: {0}")]
    Io(#[from] io::Error),
    /// The YAML frontmatter could not be parsed.
    #[error("invalid frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// No `# {id} {title}` heading was found.
    #[error("no heading found; the requirement ID must be the first token of the first heading")]
    MissingHeading,
    /// The requirement ID could not be parsed.
    #[error(transparent)]
    Id(#[from] RequirementIdError),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(from = "FrontMatterVersion")]
#[serde(into = "FrontMatterVersion")]
struct FrontMatter {
    acceptance_criteria: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum FrontMatterVersion {
    #[serde(rename = "1")]
    V1 {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        acceptance_criteria: String,
    },
}

impl From<FrontMatterVersion> for FrontMatter {
    fn from(version: FrontMatterVersion) -> Self {
        match version {
            FrontMatterVersion::V1 {
                acceptance_criteria,
            } => Self {
                acceptance_criteria,
            },
        }
    }
}

impl From<FrontMatter> for FrontMatterVersion {
    fn from(front_matter: FrontMatter) -> Self {
        let FrontMatter {
            acceptance_criteria,
        } = front_matter;
        Self::V1 {
            acceptance_criteria,
        }
    }
}

impl From<RequirementDocument> for MarkdownRequirement {
    fn from(doc: RequirementDocument) -> Self {
        Self {
            frontmatter: FrontMatter {
                acceptance_criteria: doc.acceptance_criteria().to_string(),
            },
            id: doc.id().clone(),
            title: doc.title().to_string(),
            body: doc.description().to_string(),
        }
    }
}

impl From<MarkdownRequirement> for RequirementDocument {
    fn from(req: MarkdownRequirement) -> Self {
        let MarkdownRequirement {
            frontmatter: FrontMatter {
                acceptance_criteria,
            },
            id,
            title,
            body,
        } = req;

        Self::new(id, title)
            .with_description(body)
            .with_acceptance_criteria(acceptance_criteria)
    }
}
