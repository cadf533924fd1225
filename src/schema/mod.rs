//! Schema system - document parsing, validation and template rendering

pub mod document;
pub mod registry;
pub mod template;
pub mod validator;

pub use document::{DocumentParser, SchemaError};
pub use registry::{PredefinedTypes, TypeRegistry};
pub use template::{RenderError, TemplateContext, TemplateGenerator};
pub use validator::{validate, ValidatedSchema, ValidationError};
