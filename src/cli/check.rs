use std::{
    path::{Path, PathBuf},
    process,
};

use clap::Parser;
use tracing::instrument;

use super::{
    load_directory,
    terminal::{Status, detail},
};

#[derive(Debug, Parser)]
#[command(about = "Check a directory of forms for dangling references and cycles")]
pub struct Check {
    /// The directory holding the form files
    #[arg(long, value_name = "DIR", default_value = ".")]
    forms: PathBuf,

    /// Suppress everything but the summary line
    #[arg(long, short)]
    quiet: bool,
}

impl Check {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config: Option<&Path>) -> anyhow::Result<()> {
        let directory = load_directory(self.forms, config)?;
        let registry = directory.registry();

        let dangling = registry.dangling_references();
        let cycles = registry.reference_cycles();

        if !self.quiet {
            for reference in &dangling {
                println!(
                    "{} form {} references missing form {}",
                    Status::Dangling.tag(),
                    reference.form,
                    reference.target
                );
            }
            for cycle in &cycles {
                let members: Vec<_> = cycle.iter().map(ToString::to_string).collect();
                println!("{} {}", Status::Cycle.tag(), detail(&members.join(" -> ")));
            }
        }

        let summary = format!(
            "{} forms, {} dangling references, {} reference cycles",
            registry.len(),
            dangling.len(),
            cycles.len()
        );

        let status = Status::of_report(dangling.len());
        println!("{}", status.paint(&summary));
        if status == Status::Dangling {
            process::exit(2);
        }
        Ok(())
    }
}
