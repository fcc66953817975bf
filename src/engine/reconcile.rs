//! Diffing generated candidates against previously published artifacts.

use std::collections::{BTreeMap, btree_map::Entry};

use crate::domain::{
    ChangeSet, Generation, InternalId, Matched, MalformedSnapshotError, PublishedArtifact,
    RequirementId, SnapshotRecord,
};

/// Classify every candidate as create, update or skip.
///
/// Published artifacts are keyed by internal ID. A candidate with no
/// published counterpart is created. One whose counterpart has the same
/// content fingerprint is skipped. Anything else (including a counterpart
/// whose fingerprint cannot be recovered) is updated.
///
/// Records that cannot be keyed are reported in `unmatched` and otherwise
/// ignored. Published artifacts with no candidate are reported in `untouched`
/// and never deleted.
#[must_use]
pub fn reconcile(
    requirement: &RequirementId,
    generation: Generation,
    snapshot: &[SnapshotRecord],
) -> ChangeSet {
    let mut change_set = ChangeSet::new(requirement.clone());
    let mut published = index(requirement, snapshot, &mut change_set.unmatched);

    for candidate in generation.candidates {
        match published.remove(candidate.id()) {
            None => change_set.to_create.push(candidate),
            Some(artifact) => {
                let handle = artifact.handle().clone();
                if artifact.fingerprint() == Some(candidate.fingerprint()) {
                    change_set.to_skip.push(Matched { candidate, handle });
                } else {
                    tracing::debug!(
                        "{} changed since it was published as {handle}",
                        candidate.id()
                    );
                    change_set.to_update.push(Matched { candidate, handle });
                }
            }
        }
    }

    change_set.errors = generation.errors;
    change_set.untouched = published
        .into_values()
        .map(|artifact| artifact.handle().clone())
        .collect();

    tracing::debug!(
        "{requirement}: {} to create, {} to update, {} to skip, {} untouched",
        change_set.to_create.len(),
        change_set.to_update.len(),
        change_set.to_skip.len(),
        change_set.untouched.len()
    );

    change_set
}

/// Build the lookup of published artifacts by internal ID.
///
/// When two records claim the same ID, the first one wins.
fn index(
    requirement: &RequirementId,
    snapshot: &[SnapshotRecord],
    unmatched: &mut Vec<MalformedSnapshotError>,
) -> BTreeMap<InternalId, PublishedArtifact> {
    let mut published = BTreeMap::new();

    for record in snapshot {
        let artifact = match PublishedArtifact::resolve(record, requirement) {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::warn!("Ignoring snapshot record: {e}");
                unmatched.push(e);
                continue;
            }
        };

        match published.entry(artifact.id().clone()) {
            Entry::Vacant(entry) => {
                entry.insert(artifact);
            }
            Entry::Occupied(entry) => {
                let e = MalformedSnapshotError::Duplicate {
                    handle: artifact.handle().clone(),
                    id: artifact.id().clone(),
                    existing: entry.get().handle().clone(),
                };
                tracing::warn!("Ignoring snapshot record: {e}");
                unmatched.push(e);
            }
        }
    }

    published
}
