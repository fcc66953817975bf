//! Storage formats.
//!
//! Requirement documents are read from markdown files, steps are serialized in
//! the structural steps format, and published artifacts can be kept in a local
//! JSON snapshot.

/// Loading requirement documents from directories.
pub mod directory;
pub use directory::{DirectoryLoadError, load_all};

/// Markdown serialization for requirements.
pub mod markdown;
pub use markdown::{LoadError, MarkdownRequirement};

pub mod snapshot;
pub use snapshot::{Applied, Snapshot, SnapshotError};

pub mod steps_xml;
