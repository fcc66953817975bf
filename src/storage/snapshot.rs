//! A local JSON file standing in for the external system's published
//! artifacts.
//!
//! The file holds a flat list of [`SnapshotRecord`]s across all requirements.
//! Applying a change-set to it does what a publisher would: creates get a
//! fresh `local-N` handle, updates are rewritten in place. Nothing is ever
//! deleted.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::domain::{ArtifactHandle, ChangeSet, RequirementId, SnapshotRecord};

const LOCAL_PREFIX: &str = "local-";

/// A snapshot of published artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    records: Vec<SnapshotRecord>,
}

impl Snapshot {
    /// Wrap a list of records.
    #[must_use]
    pub const fn new(records: Vec<SnapshotRecord>) -> Self {
        Self { records }
    }

    /// Reads a snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON list of
    /// records.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let file = File::open(path).map_err(|io_error| match io_error.kind() {
            io::ErrorKind::NotFound => SnapshotError::NotFound,
            _ => SnapshotError::Io(io_error),
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Writes the snapshot to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// All records.
    #[must_use]
    pub fn records(&self) -> &[SnapshotRecord] {
        &self.records
    }

    /// The records that belong to the given requirement.
    #[must_use]
    pub fn for_requirement(&self, requirement: &RequirementId) -> Vec<SnapshotRecord> {
        self.records
            .iter()
            .filter(|record| record.belongs_to(requirement))
            .cloned()
            .collect()
    }

    /// The records that belong to none of the given requirements.
    ///
    /// [`Self::for_requirement`] never hands these to reconciliation. They
    /// are either artifacts of requirements not loaded this run, or records
    /// whose owner cannot be recovered at all.
    #[must_use]
    pub fn unclaimed(&self, requirements: &[&RequirementId]) -> Vec<&SnapshotRecord> {
        self.records
            .iter()
            .filter(|record| {
                !requirements
                    .iter()
                    .any(|requirement| record.belongs_to(requirement))
            })
            .collect()
    }

    /// Publish a change-set into the snapshot.
    ///
    /// Returns the number of records created and updated.
    pub fn apply(&mut self, change_set: &ChangeSet) -> Applied {
        let mut applied = Applied::default();

        for matched in &change_set.to_update {
            if let Some(record) = self
                .records
                .iter_mut()
                .find(|record| record.handle == matched.handle)
            {
                *record = SnapshotRecord::published(&matched.candidate, matched.handle.clone());
                applied.updated += 1;
            } else {
                tracing::warn!(
                    "Artifact {} for {} is no longer in the snapshot",
                    matched.handle,
                    matched.candidate.id()
                );
            }
        }

        let mut next = self.next_local_number();
        for candidate in &change_set.to_create {
            let handle = ArtifactHandle::new(format!("{LOCAL_PREFIX}{next}"));
            next += 1;
            self.records
                .push(SnapshotRecord::published(candidate, handle));
            applied.created += 1;
        }

        applied
    }

    fn next_local_number(&self) -> u64 {
        self.records
            .iter()
            .filter_map(|record| {
                record
                    .handle
                    .as_str()
                    .strip_prefix(LOCAL_PREFIX)?
                    .parse::<u64>()
                    .ok()
            })
            .max()
            .map_or(1, |max| max + 1)
    }
}

/// The outcome of applying a change-set to a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Applied {
    /// Records created.
    pub created: usize,
    /// Records rewritten.
    pub updated: usize,
}

/// Errors that can occur when reading or writing a snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot file was not found.
    #[error("snapshot file not found")]
    NotFound,
    /// An I/O error occurred.
    #[error("failed to access snapshot file: {0}")]
    Io(#[from] io::Error),
    /// The snapshot is not valid JSON, or not a list of records.
    #[error("invalid snapshot file: {0}")]
    Json(#[from] serde_json::Error),
}
