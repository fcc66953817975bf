use std::path::PathBuf;

use clap::Parser;
use testgen::{Config, Generator};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
pub struct Criteria {
    /// Requirement files, or directories to search for them
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Output format (pretty, json)
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

impl Criteria {
    #[instrument(level = "debug", skip(config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let documents = testgen::load_all(&self.paths)?;
        let generator = Generator::new(config)?;

        let mut json = Vec::new();

        for doc in &documents {
            let criteria = match generator.criteria(doc) {
                Ok(criteria) => criteria,
                Err(e) => {
                    tracing::warn!("Skipping requirement {}: {e}", doc.id());
                    continue;
                }
            };

            match self.output {
                OutputFormat::Json => json.push(serde_json::json!({
                    "requirement": doc.id(),
                    "criteria": criteria,
                })),
                OutputFormat::Pretty => {
                    println!("{} {}", doc.id().to_string().info(), doc.title());
                    for criterion in &criteria {
                        println!("  {:>3}. {}", criterion.ordinal(), criterion.text());
                        println!("       {}", criterion.labels().components().join(" / ").dim());
                    }
                    println!();
                }
            }
        }

        if matches!(self.output, OutputFormat::Json) {
            println!("{}", serde_json::to_string_pretty(&json)?);
        }

        Ok(())
    }
}
