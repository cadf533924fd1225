//! Generation orchestrator
//!
//! Runs one generation pass:
//! `Idle -> LoadingExtensions -> ParsingSchemas -> Validating -> Rendering -> Done`.
//! Any failure moves to `Failed` and nothing after it runs. [`Generator::prepare`]
//! stops early and ends in `Validated`.

use miette::Diagnostic;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::loader::{ArtifactSink, InputError, SourceFile};
use crate::extension::{ExtensionError, Extensions};
use crate::model::MappingOptions;
use crate::schema::{
    validate, DocumentParser, RenderError, SchemaError, TemplateGenerator, ValidatedSchema,
    ValidationError,
};

/// Suffix stripped from template names before deriving the artifact extension
const TEMPLATE_SUFFIX: &str = ".tera";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    LoadingExtensions,
    ParsingSchemas,
    Validating,
    /// Terminal stage of a successful `prepare`
    Validated,
    Rendering { current: usize, total: usize },
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Idle => write!(f, "idle"),
            Stage::LoadingExtensions => write!(f, "loading extensions"),
            Stage::ParsingSchemas => write!(f, "parsing schemas"),
            Stage::Validating => write!(f, "validating"),
            Stage::Validated => write!(f, "validated"),
            Stage::Rendering { current, total } => write!(f, "rendering {}/{}", current, total),
            Stage::Done => write!(f, "done"),
            Stage::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum GenerateError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Extension(#[from] ExtensionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),

    #[error("cannot write artifact '{artifact}': {message}")]
    #[diagnostic(code(dtgen::output::write))]
    Output { artifact: String, message: String },
}

impl GenerateError {
    /// Whether this error came from evaluating an extension script
    pub fn is_fatal_extension(&self) -> bool {
        matches!(self, GenerateError::Extension(ExtensionError::Evaluation { .. }))
    }
}

/// Everything one run reads, already in memory
#[derive(Debug, Clone)]
pub struct GenerationInputs {
    pub schemas: Vec<SourceFile>,
    pub template: SourceFile,
    pub extensions: Vec<SourceFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorOptions {
    pub mapping: MappingOptions,
    /// Artifact file extension; derived from the template name when unset
    pub file_extension: Option<String>,
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub version: String,
    /// Artifact names in rendering order
    pub artifacts: Vec<String>,
}

/// A checked schema plus the extensions it was checked against
pub struct Prepared {
    pub extensions: Extensions,
    pub schema: ValidatedSchema,
}

pub struct Generator {
    options: GeneratorOptions,
    stage: Stage,
}

impl Generator {
    pub fn new(options: GeneratorOptions) -> Self {
        Self {
            options,
            stage: Stage::Idle,
        }
    }

    /// Current stage; `Done`, `Validated` and `Failed` are terminal
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Load extensions, parse and validate without rendering
    pub fn prepare(
        &mut self,
        schemas: &[SourceFile],
        extensions: &[SourceFile],
    ) -> Result<Prepared, GenerateError> {
        let result = self.load_and_validate(schemas, extensions);
        match &result {
            Ok(_) => self.transition(Stage::Validated),
            Err(_) => self.transition(Stage::Failed),
        }
        result
    }

    /// Render one artifact per data type into `sink`
    ///
    /// Stops at the first failure; artifacts already written stay in the sink.
    pub fn generate(
        &mut self,
        inputs: &GenerationInputs,
        sink: &mut dyn ArtifactSink,
    ) -> Result<GenerationReport, GenerateError> {
        let result = self
            .load_and_validate(&inputs.schemas, &inputs.extensions)
            .and_then(|prepared| self.render(&prepared, &inputs.template, sink));

        match &result {
            Ok(report) => {
                self.transition(Stage::Done);
                info!(artifacts = report.artifacts.len(), "generation finished");
            }
            Err(_) => self.transition(Stage::Failed),
        }
        result
    }

    fn load_and_validate(
        &mut self,
        schemas: &[SourceFile],
        extensions: &[SourceFile],
    ) -> Result<Prepared, GenerateError> {
        self.transition(Stage::LoadingExtensions);
        let extensions = Extensions::load(extensions)?;

        self.transition(Stage::ParsingSchemas);
        let parser = DocumentParser::new(self.options.mapping)?;
        let schema = parser.parse_all(schemas)?;

        self.transition(Stage::Validating);
        let schema = validate(schema, extensions.predefined_types())?;

        Ok(Prepared { extensions, schema })
    }

    fn render(
        &mut self,
        prepared: &Prepared,
        template: &SourceFile,
        sink: &mut dyn ArtifactSink,
    ) -> Result<GenerationReport, GenerateError> {
        let data_types = prepared.schema.data_types();
        let total = data_types.len();
        self.transition(Stage::Rendering { current: 0, total });

        let generator = TemplateGenerator::new(&template.name, &template.contents, &prepared.extensions)?;
        let extension = self.artifact_extension(&template.name);

        let mut artifacts = Vec::with_capacity(total);
        for (i, data_type) in data_types.iter().enumerate() {
            self.transition(Stage::Rendering { current: i + 1, total });

            let output = generator.render(data_type, &prepared.extensions)?;
            let artifact = artifact_name(data_type.name(), extension.as_deref());
            sink.write(&artifact, &output)
                .map_err(|e| GenerateError::Output {
                    artifact: artifact.clone(),
                    message: e.to_string(),
                })?;
            debug!(artifact = %artifact, bytes = output.len(), "artifact written");
            artifacts.push(artifact);
        }

        Ok(GenerationReport {
            version: prepared.schema.schema().version.clone(),
            artifacts,
        })
    }

    /// Configured extension, else the one implied by the template name
    pub fn artifact_extension(&self, template_name: &str) -> Option<String> {
        match self.options.file_extension.as_deref() {
            Some(ext) => {
                let ext = ext.trim_start_matches('.');
                (!ext.is_empty()).then(|| ext.to_string())
            }
            None => extension_from_template(template_name),
        }
    }

    fn transition(&mut self, next: Stage) {
        debug!(from = %self.stage, to = %next, "stage transition");
        self.stage = next;
    }
}

/// `model.swift.tera` -> `swift`, `model.kt` -> `kt`, `model.tera` -> none
pub fn extension_from_template(template_name: &str) -> Option<String> {
    let stem = template_name
        .strip_suffix(TEMPLATE_SUFFIX)
        .unwrap_or(template_name);
    Path::new(stem)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_string)
}

pub fn artifact_name(data_type: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("{}.{}", data_type, ext),
        None => data_type.to_string(),
    }
}
