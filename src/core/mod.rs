//! Core module - configuration, input loading and the generation pipeline

pub mod config;
pub mod generator;
pub mod loader;

pub use config::Config;
pub use generator::{
    GenerateError, GenerationInputs, GenerationReport, Generator, GeneratorOptions, Stage,
};
pub use loader::{ArtifactSink, DirectorySink, InputError, MemorySink, SourceFile};
