//! `dtgen validate` command - check schema documents without rendering

use console::style;
use miette::Result;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{into_report, read_extensions, SCHEMA_EXTENSIONS};
use crate::cli::GlobalOpts;
use crate::core::generator::{Generator, GeneratorOptions};
use crate::core::loader::read_sources;
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Directory of schema documents (.json, .yaml, .yml)
    pub schemas: PathBuf,

    /// Directory of Lua extension scripts
    #[arg(long, short = 'e')]
    pub extensions: Option<PathBuf>,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let mut config = Config::load();
    config.merge(Config {
        extensions: args.extensions.clone(),
        ..Default::default()
    });

    let schemas = read_sources(&args.schemas, SCHEMA_EXTENSIONS)?;
    let extensions = read_extensions(config.extensions.as_deref())?;

    let mut generator = Generator::new(GeneratorOptions {
        mapping: config.mapping_options(),
        file_extension: None,
    });
    let prepared = generator
        .prepare(&schemas, &extensions)
        .map_err(into_report)?;

    if global.quiet {
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["Name", "Kind", "Members"]);
    for data_type in prepared.schema.data_types() {
        builder.push_record([
            data_type.name().to_string(),
            data_type.kind().to_string(),
            data_type.member_count().to_string(),
        ]);
    }
    println!("{}", builder.build().with(Style::markdown()));

    let version = &prepared.schema.schema().version;
    println!(
        "\n{} {} data type(s) valid{}",
        style("✓").green(),
        prepared.schema.data_types().len(),
        if version.is_empty() {
            String::new()
        } else {
            format!(" (schema version {})", version)
        }
    );

    Ok(())
}
