//! Loading requirement documents from the filesystem.
//!
//! Paths may name markdown files or directories. Directories are walked
//! recursively and every `.md` file found is parsed as a requirement.

use std::{
    collections::BTreeMap,
    ffi::OsStr,
    fmt,
    path::{Path, PathBuf},
};

use nonempty::NonEmpty;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use walkdir::WalkDir;

use crate::{
    domain::{RequirementDocument, RequirementId},
    storage::{LoadError, MarkdownRequirement},
};

/// Load every requirement under the given paths.
///
/// Files are parsed in parallel. The result is ordered by path, so the same
/// tree always loads in the same order.
///
/// # Errors
///
/// Returns an error if any file cannot be parsed, or if two files declare the
/// same requirement ID.
pub fn load_all(paths: &[PathBuf]) -> Result<Vec<RequirementDocument>, DirectoryLoadError> {
    let md_paths: Vec<_> = paths
        .iter()
        .flat_map(|path| collect_markdown_paths(path))
        .collect();

    tracing::debug!("Found {} requirement files", md_paths.len());

    let loaded: Vec<_> = md_paths
        .par_iter()
        .map(|path| {
            MarkdownRequirement::load(path)
                .map(|md| (path.clone(), RequirementDocument::from(md)))
                .map_err(|e| (path.clone(), e))
        })
        .collect();

    let (requirements, failures): (Vec<_>, Vec<_>) = loaded.into_iter().partition(Result::is_ok);

    let failures: Vec<_> = failures.into_iter().filter_map(Result::err).collect();
    if let Some(failures) = NonEmpty::from_vec(failures) {
        return Err(DirectoryLoadError::Unreadable(failures));
    }

    let mut seen: BTreeMap<RequirementId, PathBuf> = BTreeMap::new();
    let mut documents = Vec::with_capacity(requirements.len());
    for (path, doc) in requirements.into_iter().filter_map(Result::ok) {
        if let Some(first) = seen.get(doc.id()) {
            return Err(DirectoryLoadError::DuplicateId {
                id: doc.id().clone(),
                first: first.clone(),
                second: path,
            });
        }
        seen.insert(doc.id().clone(), path);
        documents.push(doc);
    }

    Ok(documents)
}

fn collect_markdown_paths(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension() == Some(OsStr::new("md")))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Errors that can occur when loading a set of requirement files.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryLoadError {
    /// One or more files could not be parsed.
    Unreadable(NonEmpty<(PathBuf, LoadError)>),

    /// Two files declare the same requirement ID.
    DuplicateId {
        /// The contested ID.
        id: RequirementId,
        /// The file that declared it first.
        first: PathBuf,
        /// The file that declared it again.
        second: PathBuf,
    },
}

impl fmt::Display for DirectoryLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MAX_DISPLAY: usize = 5;

        match self {
            Self::Unreadable(failures) => {
                write!(f, "failed to load requirements: ")?;

                let total = failures.len();

                let displayed: Vec<String> = failures
                    .iter()
                    .take(MAX_DISPLAY)
                    .map(|(p, e)| format!("{} ({e})", p.display()))
                    .collect();

                let msg = displayed.join(", ");

                if total <= MAX_DISPLAY {
                    write!(f, "{msg}")
                } else {
                    write!(f, "{msg}... (and {} more)", total - MAX_DISPLAY)
                }
            }
            Self::DuplicateId { id, first, second } => write!(
                f,
                "requirement {id} is declared in both {} and {}",
                first.display(),
                second.display()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_nested_directories_in_path_order() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "b/2.md", "# 2 Second\n");
        write(tmp.path(), "a/1.md", "# 1 First\n");
        write(tmp.path(), "notes.txt", "not a requirement");

        let docs = load_all(&[tmp.path().to_path_buf()]).unwrap();
        let ids: Vec<_> = docs.iter().map(|doc| doc.id().as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn loads_individual_files() {
        let tmp = TempDir::new().unwrap();
        let path = write(tmp.path(), "US-1.md", "# US-1 Login\n\nBody\n");

        let docs = load_all(&[path]).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].description(), "Body");
    }

    #[test]
    fn reports_unparseable_files() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "good.md", "# 1 Good\n");
        write(tmp.path(), "bad.md", "no heading\n");

        let error = load_all(&[tmp.path().to_path_buf()]).unwrap_err();
        assert!(matches!(&error, DirectoryLoadError::Unreadable(failures) if failures.len() == 1));
        assert!(error.to_string().contains("bad.md"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.md", "# 1 First\n");
        write(tmp.path(), "b.md", "# 1 Again\n");

        assert!(matches!(
            load_all(&[tmp.path().to_path_buf()]),
            Err(DirectoryLoadError::DuplicateId { .. })
        ));
    }
}
