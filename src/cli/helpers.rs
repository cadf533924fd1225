//! Shared helper functions for CLI commands

use std::path::Path;
use tracing::{error, warn};

use crate::core::generator::GenerateError;
use crate::core::loader::{read_sources, require_directory, InputError, SourceFile};

/// File extensions accepted as schema documents
pub const SCHEMA_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// File extensions accepted as extension scripts
pub const SCRIPT_EXTENSIONS: &[&str] = &["lua"];

/// Exit status when an extension script fails to load
pub const FATAL_EXTENSION_EXIT: i32 = 3;

/// Read extension scripts, if a directory was given
///
/// A directory without any `.lua` files is allowed and loads nothing.
pub fn read_extensions(dir: Option<&Path>) -> Result<Vec<SourceFile>, InputError> {
    let Some(dir) = dir else {
        return Ok(Vec::new());
    };
    require_directory(dir)?;

    match read_sources(dir, SCRIPT_EXTENSIONS) {
        Err(InputError::Empty(dir)) => {
            warn!(dir = %dir.display(), "no extension scripts found");
            Ok(Vec::new())
        }
        other => other,
    }
}

/// Turn a pipeline error into a report, or exit if an extension failed to load
pub fn into_report(err: GenerateError) -> miette::Report {
    if err.is_fatal_extension() {
        error!("{}", err);
        std::process::exit(FATAL_EXTENSION_EXIT);
    }
    miette::Report::new(err)
}
