use std::path::{Path, PathBuf};

mod criteria;
mod generate;
mod terminal;

use clap::ArgAction;
use criteria::Criteria;
use generate::Generate;
use testgen::Config;
use tracing::instrument;

/// The configuration file picked up from the working directory.
const DEFAULT_CONFIG: &str = "testgen.toml";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The configuration file [default: ./testgen.toml, if present]
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);
        self.command.run(self.config.as_deref())
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Generate test cases and reconcile them against published ones
    Generate(Generate),

    /// Show the normalized acceptance criteria of requirements
    Criteria(Criteria),

    /// Write a default configuration file
    Init(Init),
}

impl Command {
    fn run(self, config: Option<&Path>) -> anyhow::Result<()> {
        match self {
            Self::Generate(command) => command.run(&load_config(config)?)?,
            Self::Criteria(command) => command.run(&load_config(config)?)?,
            Self::Init(command) => command.run(config)?,
        }
        Ok(())
    }
}

/// Load the configuration.
///
/// An explicitly requested file must exist. Otherwise `testgen.toml` is used
/// if present, and the defaults if not.
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        return Config::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load {}: {e}", path.display()));
    }

    let path = Path::new(DEFAULT_CONFIG);
    if path.exists() {
        tracing::debug!("Using configuration from {}", path.display());
        Config::load(path).map_err(|e| anyhow::anyhow!("Failed to load {DEFAULT_CONFIG}: {e}"))
    } else {
        tracing::debug!("No {DEFAULT_CONFIG} found, using the default configuration");
        Ok(Config::default())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {
    /// Overwrite an existing configuration file
    #[arg(long)]
    force: bool,
}

impl Init {
    #[instrument]
    fn run(self, path: Option<&Path>) -> anyhow::Result<()> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG));
        if path.exists() && !self.force {
            anyhow::bail!(
                "Configuration already exists at {} (use --force to overwrite)",
                path.display()
            );
        }

        Config::default()
            .save(path)
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", path.display()))?;

        println!("Created: {}", path.display());
        Ok(())
    }
}
