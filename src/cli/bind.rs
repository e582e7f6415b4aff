use std::path::{Path, PathBuf};

use clap::Parser;
use formbind::{
    Document, DocumentBinder, Engine,
    binding::{CommentBuilder, ExtensionRegistry, InlineBuilder},
};
use tracing::instrument;

use super::load_directory;

#[derive(Debug, Parser)]
#[command(about = "Bind a document to a form and print the output tree")]
pub struct Bind {
    /// The directory holding the form files
    #[arg(long, value_name = "DIR", default_value = ".")]
    forms: PathBuf,

    /// The id of the root form
    #[arg(long, value_name = "ID")]
    form: String,

    /// The group of the root form
    #[arg(long, value_name = "GROUP")]
    group: Option<String>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "yaml")]
    format: OutputFormat,

    /// The document to bind (JSON or YAML)
    document: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl Bind {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config: Option<&Path>) -> anyhow::Result<()> {
        let directory = load_directory(self.forms, config)?;
        let document = Document::load(&self.document)?;

        let extensions = ExtensionRegistry::new()
            .with(CommentBuilder::new())
            .with(InlineBuilder);
        let engine = Engine::new(directory.registry())
            .with_config(directory.config())
            .with_extensions(extensions);

        let output = engine.bind_form_id(
            &self.form,
            self.group.as_deref(),
            &document,
            &mut DocumentBinder,
        )?;

        match self.format {
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&output)?),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        }
        Ok(())
    }
}
