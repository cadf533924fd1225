//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::model::MappingOptions;

/// Project configuration file, looked up in the working directory
pub const PROJECT_CONFIG: &str = ".dtgen.yaml";

/// dtgen configuration with layered hierarchy
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sort properties and enum values by name
    pub alphabetize: Option<bool>,

    /// Directory of Lua extension scripts
    pub extensions: Option<PathBuf>,

    /// Output directory for generated artifacts
    pub output: Option<PathBuf>,

    /// File extension for generated artifacts
    pub file_extension: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        Self::load_from(
            Self::global_config_path().as_deref(),
            Some(Path::new(PROJECT_CONFIG)),
            |key| std::env::var(key).ok(),
        )
    }

    /// Load from explicit file locations and an environment lookup
    pub fn load_from(
        global: Option<&Path>,
        project: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        // 1. Built-in defaults (already in Default impl)
        let mut config = Config::default();

        // 2. Global user config (~/.config/dtgen/config.yaml)
        if let Some(global) = global.and_then(Self::read_file) {
            config.merge(global);
        }

        // 3. Project config (./.dtgen.yaml)
        if let Some(project) = project.and_then(Self::read_file) {
            config.merge(project);
        }

        // 4. Environment variables
        if let Some(extensions) = env("DTGEN_EXTENSIONS") {
            config.extensions = Some(PathBuf::from(extensions));
        }
        if let Some(output) = env("DTGEN_OUTPUT") {
            config.output = Some(PathBuf::from(output));
        }
        if let Some(ext) = env("DTGEN_FILE_EXTENSION") {
            config.file_extension = Some(ext);
        }
        if let Some(alphabetize) = env("DTGEN_ALPHABETIZE") {
            match parse_flag(&alphabetize) {
                Some(flag) => config.alphabetize = Some(flag),
                None => warn!(value = %alphabetize, "ignoring DTGEN_ALPHABETIZE, expected true or false"),
            }
        }

        config
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "dtgen")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => {
                debug!(path = %path.display(), "loaded config");
                Some(config)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping malformed config");
                None
            }
        }
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.alphabetize.is_some() {
            self.alphabetize = other.alphabetize;
        }
        if other.extensions.is_some() {
            self.extensions = other.extensions;
        }
        if other.output.is_some() {
            self.output = other.output;
        }
        if other.file_extension.is_some() {
            self.file_extension = other.file_extension;
        }
    }

    pub fn mapping_options(&self) -> MappingOptions {
        MappingOptions {
            alphabetize: self.alphabetize.unwrap_or(false),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
