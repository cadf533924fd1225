//! Input loading and artifact output
//!
//! The generator core only sees [`SourceFile`] values and an
//! [`ArtifactSink`]; this module is where the filesystem comes in.

use miette::Diagnostic;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// A named in-memory input (schema document, template or script)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File name, used in diagnostics and to pick the document format
    pub name: String,
    pub contents: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum InputError {
    #[error("{} does not exist", .0.display())]
    #[diagnostic(code(dtgen::input::missing))]
    Missing(PathBuf),

    #[error("{} is not a directory", .0.display())]
    #[diagnostic(code(dtgen::input::not_a_directory))]
    NotADirectory(PathBuf),

    #[error("{} contains no usable files", .0.display())]
    #[diagnostic(
        code(dtgen::input::empty),
        help("schema documents end in .json, .yaml or .yml; extension scripts end in .lua")
    )]
    Empty(PathBuf),

    #[error("{} is not a file", .0.display())]
    #[diagnostic(code(dtgen::input::not_a_file))]
    NotAFile(PathBuf),

    #[error("cannot access {}: {message}", .path.display())]
    #[diagnostic(code(dtgen::input::io))]
    Io { path: PathBuf, message: String },
}

impl InputError {
    fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        InputError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Check that `dir` exists and is a directory
pub fn require_directory(dir: &Path) -> Result<(), InputError> {
    if !dir.exists() {
        return Err(InputError::Missing(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(InputError::NotADirectory(dir.to_path_buf()));
    }
    Ok(())
}

/// Read every file directly inside `dir` whose extension is one of `extensions`
///
/// Subdirectories are not descended into. Files come back sorted by name
/// so runs are reproducible. An empty result is an error.
pub fn read_sources(dir: &Path, extensions: &[&str]) -> Result<Vec<SourceFile>, InputError> {
    require_directory(dir)?;

    let mut sources = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| InputError::io(dir, e))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
        if !matches {
            continue;
        }

        let contents = fs::read_to_string(path).map_err(|e| InputError::io(path, e))?;
        sources.push(SourceFile::new(
            entry.file_name().to_string_lossy(),
            contents,
        ));
    }

    if sources.is_empty() {
        return Err(InputError::Empty(dir.to_path_buf()));
    }
    Ok(sources)
}

/// Read a single file
pub fn read_file(path: &Path) -> Result<SourceFile, InputError> {
    if !path.exists() {
        return Err(InputError::Missing(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(InputError::NotAFile(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path).map_err(|e| InputError::io(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(SourceFile::new(name, contents))
}

/// Destination for rendered artifacts
pub trait ArtifactSink {
    fn write(&mut self, name: &str, contents: &str) -> std::io::Result<()>;
}

/// Writes each artifact as a file in one directory
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    /// Create the directory (and parents) if needed
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, InputError> {
        let root = root.into();
        if root.exists() && !root.is_dir() {
            return Err(InputError::NotADirectory(root));
        }
        fs::create_dir_all(&root).map_err(|e| InputError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactSink for DirectorySink {
    fn write(&mut self, name: &str, contents: &str) -> std::io::Result<()> {
        fs::write(self.root.join(name), contents)
    }
}

/// Collects artifacts in memory, keyed by name
#[derive(Debug, Default)]
pub struct MemorySink {
    pub artifacts: BTreeMap<String, String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.artifacts.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl ArtifactSink for MemorySink {
    fn write(&mut self, name: &str, contents: &str) -> std::io::Result<()> {
        self.artifacts.insert(name.to_string(), contents.to_string());
        Ok(())
    }
}
