use std::{path::PathBuf, process};

use clap::Parser;
use rayon::prelude::*;
use testgen::{
    ChangeSet, Config, GenerationError, Generator, RequirementDocument, Snapshot,
    storage::{Applied, SnapshotError},
};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
pub struct Generate {
    /// Requirement files, or directories to search for them
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// A JSON snapshot of previously published test cases
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// Apply the change-sets to the snapshot file
    #[arg(long, requires = "snapshot")]
    write_snapshot: bool,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

impl Generate {
    #[instrument(level = "debug", skip(config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let documents = testgen::load_all(&self.paths)?;
        if documents.is_empty() {
            println!("No requirements found.");
            return Ok(());
        }

        let mut snapshot = match &self.snapshot {
            None => Snapshot::default(),
            Some(path) => match Snapshot::load(path) {
                Ok(snapshot) => snapshot,
                Err(SnapshotError::NotFound) => {
                    tracing::info!("{} does not exist yet, starting empty", path.display());
                    Snapshot::default()
                }
                Err(e) => anyhow::bail!("Failed to load {}: {e}", path.display()),
            },
        };

        let requirements: Vec<_> = documents.iter().map(RequirementDocument::id).collect();
        let unclaimed = snapshot.unclaimed(&requirements);
        for record in &unclaimed {
            tracing::debug!(
                "Snapshot record {} ('{}') belongs to no loaded requirement",
                record.handle,
                record.title
            );
        }
        if !unclaimed.is_empty() {
            tracing::info!(
                "{} snapshot record(s) belong to no loaded requirement and are left untouched",
                unclaimed.len()
            );
        }

        let generator = Generator::new(config)?;

        let results: Vec<(&RequirementDocument, Result<ChangeSet, GenerationError>)> = documents
            .par_iter()
            .map(|doc| {
                let published = snapshot.for_requirement(doc.id());
                (doc, generator.reconcile(doc, &published))
            })
            .collect();

        let mut change_sets = Vec::with_capacity(results.len());
        let mut failed = Vec::new();
        for (doc, result) in results {
            match result {
                Ok(change_set) => change_sets.push((doc, change_set)),
                Err(e) => {
                    tracing::warn!("Skipping requirement {}: {e}", doc.id());
                    failed.push((doc, e));
                }
            }
        }

        match self.output {
            OutputFormat::Json => Self::output_json(&change_sets, &failed)?,
            OutputFormat::Pretty => Self::output_pretty(&change_sets, &failed),
        }

        if let Some(path) = self.snapshot.as_ref().filter(|_| self.write_snapshot) {
            let applied = change_sets
                .iter()
                .map(|(_, change_set)| snapshot.apply(change_set))
                .fold(Applied::default(), |total, applied| Applied {
                    created: total.created + applied.created,
                    updated: total.updated + applied.updated,
                });
            snapshot
                .save(path)
                .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;

            if matches!(self.output, OutputFormat::Pretty) {
                println!(
                    "{}",
                    format!(
                        "Wrote {}: {} created, {} updated",
                        path.display(),
                        applied.created,
                        applied.updated
                    )
                    .dim()
                );
            }
        }

        if !failed.is_empty() {
            process::exit(2);
        }

        Ok(())
    }

    fn output_json(
        change_sets: &[(&RequirementDocument, ChangeSet)],
        failed: &[(&RequirementDocument, GenerationError)],
    ) -> anyhow::Result<()> {
        use serde_json::json;

        let failed: Vec<_> = failed
            .iter()
            .map(|(doc, e)| {
                json!({
                    "requirement": doc.id(),
                    "error": e.to_string(),
                })
            })
            .collect();

        let change_sets: Vec<&ChangeSet> = change_sets
            .iter()
            .map(|(_, change_set)| change_set)
            .collect();

        let output = json!({
            "change_sets": change_sets,
            "failed": failed,
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_pretty(
        change_sets: &[(&RequirementDocument, ChangeSet)],
        failed: &[(&RequirementDocument, GenerationError)],
    ) {
        let mut totals = [0usize; 3];

        for (doc, change_set) in change_sets {
            println!("{} {}", doc.id().to_string().info(), doc.title());

            for candidate in &change_set.to_create {
                println!("  {} {}", "create ".success(), candidate.title());
            }
            for matched in &change_set.to_update {
                println!(
                    "  {} {} {}",
                    "update ".warning(),
                    matched.candidate.title(),
                    format!("({})", matched.handle).dim()
                );
            }
            for matched in &change_set.to_skip {
                println!("  {}", format!("skip    {}", matched.candidate.title()).dim());
            }
            for error in &change_set.errors {
                println!(
                    "  {} {} ({}): {}",
                    "error  ".error(),
                    error.id,
                    error.kind,
                    error.error
                );
            }
            for malformed in &change_set.unmatched {
                println!("  {} {malformed}", "ignored".warning());
            }
            if !change_set.untouched.is_empty() {
                let handles: Vec<_> = change_set
                    .untouched
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                println!(
                    "  {}",
                    format!("untouched (no longer generated): {}", handles.join(", ")).dim()
                );
            }

            totals[0] += change_set.to_create.len();
            totals[1] += change_set.to_update.len();
            totals[2] += change_set.to_skip.len();
        }

        for (doc, e) in failed {
            println!("{} {}: {e}", doc.id().to_string().error(), doc.title());
        }

        println!();
        println!(
            "{} to create, {} to update, {} unchanged",
            totals[0].to_string().success(),
            totals[1].to_string().warning(),
            totals[2]
        );
    }
}
