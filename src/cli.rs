use std::path::{Path, PathBuf};

mod bind;
mod check;
mod terminal;

use bind::Bind;
use check::Check;
use clap::ArgAction;
use formbind::{Config, Directory};

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file; defaults to `formbind.toml` in the forms directory
    #[arg(short, long, global = true)]
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
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Bind a document to a form and print the output tree
    Bind(Bind),

    /// Check a directory of forms for dangling references and cycles
    Check(Check),
}

impl Command {
    fn run(self, config: Option<&Path>) -> anyhow::Result<()> {
        match self {
            Self::Bind(command) => command.run(config),
            Self::Check(command) => command.run(config),
        }
    }
}

/// Loads the forms below `forms`, honouring an explicit configuration file.
fn load_directory(
    forms: PathBuf,
    config: Option<&Path>,
) -> anyhow::Result<Directory<formbind::storage::directory::Loaded>> {
    let directory = Directory::new(forms);
    let loaded = match config {
        Some(path) => {
            let config = Config::load(path)
                .map_err(|e| anyhow::anyhow!("Failed to load {}: {e}", path.display()))?;
            directory.load_with_config(config)?
        }
        None => directory.load_all()?,
    };
    tracing::info!(
        "Loaded {} forms from {}",
        loaded.registry().len(),
        loaded.root().display()
    );
    Ok(loaded)
}
