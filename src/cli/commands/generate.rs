//! `dtgen generate` command - render every data type through a template

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{into_report, read_extensions, SCHEMA_EXTENSIONS};
use crate::cli::GlobalOpts;
use crate::core::generator::{GenerationInputs, Generator, GeneratorOptions};
use crate::core::loader::{read_file, read_sources, DirectorySink};
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Directory of schema documents (.json, .yaml, .yml)
    pub schemas: PathBuf,

    /// Template file
    pub template: PathBuf,

    /// Output directory (default: a new temporary directory)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Directory of Lua extension scripts
    #[arg(long, short = 'e')]
    pub extensions: Option<PathBuf>,

    /// Sort properties and enum values by name
    #[arg(long)]
    pub alphabetize: bool,

    /// File extension for generated artifacts (default: from the template name)
    #[arg(long = "extension", value_name = "EXT")]
    pub file_extension: Option<String>,
}

impl GenerateArgs {
    fn as_config(&self) -> Config {
        Config {
            alphabetize: self.alphabetize.then_some(true),
            extensions: self.extensions.clone(),
            output: self.output.clone(),
            file_extension: self.file_extension.clone(),
        }
    }
}

pub fn run(args: GenerateArgs, global: &GlobalOpts) -> Result<()> {
    let mut config = Config::load();
    config.merge(args.as_config());

    let schemas = read_sources(&args.schemas, SCHEMA_EXTENSIONS)?;
    let template = read_file(&args.template)?;
    let extensions = read_extensions(config.extensions.as_deref())?;

    let output = match &config.output {
        Some(dir) => dir.clone(),
        None => tempfile::Builder::new()
            .prefix("dtgen-")
            .tempdir()
            .into_diagnostic()?
            .keep(),
    };
    let mut sink = DirectorySink::create(&output)?;

    let mut generator = Generator::new(GeneratorOptions {
        mapping: config.mapping_options(),
        file_extension: config.file_extension.clone(),
    });
    let inputs = GenerationInputs {
        schemas,
        template,
        extensions,
    };
    let report = generator.generate(&inputs, &mut sink).map_err(into_report)?;

    if global.quiet {
        println!("{}", sink.root().display());
    } else {
        println!(
            "{} Generated {} artifact(s) in {}",
            style("✓").green(),
            report.artifacts.len(),
            style(sink.root().display()).cyan()
        );
    }

    Ok(())
}
