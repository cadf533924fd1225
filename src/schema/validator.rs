//! Schema validation - unique names and resolvable type references

use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::model::{DataType, Schema};
use crate::schema::registry::{PredefinedTypes, TypeRegistry};

/// A type graph inconsistency
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ValidationError {
    #[error("data type '{name}' is defined more than once")]
    #[diagnostic(
        code(dtgen::validation::duplicate_type),
        help("data type names must be unique across all schema documents")
    )]
    DuplicateTypeDefined { name: String },

    #[error("undefined type '{name}' used by '{used_by}'")]
    #[diagnostic(
        code(dtgen::validation::undefined_type),
        help("define a data type with this name, or register it from an extension with registerPredefinedTypes")
    )]
    UndefinedTypeUsed { name: String, used_by: String },
}

impl ValidationError {
    /// The offending type name
    pub fn type_name(&self) -> &str {
        match self {
            ValidationError::DuplicateTypeDefined { name } => name,
            ValidationError::UndefinedTypeUsed { name, .. } => name,
        }
    }
}

/// A schema whose type graph has been checked
///
/// Only obtainable through [`validate`].
#[derive(Debug, Clone)]
pub struct ValidatedSchema {
    schema: Schema,
}

impl ValidatedSchema {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn data_types(&self) -> &[DataType] {
        &self.schema.data_types
    }

    pub fn into_inner(self) -> Schema {
        self.schema
    }
}

/// Check the schema in two passes: name uniqueness, then references
///
/// Fails fast on the first problem found in input order. Cyclic
/// references between classes are allowed.
pub fn validate(schema: Schema, predefined: &PredefinedTypes) -> Result<ValidatedSchema, ValidationError> {
    {
        let registry = TypeRegistry::build(&schema.data_types)?;

        for data_type in &schema.data_types {
            for referenced in data_type.referenced_types() {
                if !registry.resolves(referenced, predefined) {
                    return Err(ValidationError::UndefinedTypeUsed {
                        name: referenced.to_string(),
                        used_by: data_type.name().to_string(),
                    });
                }
            }
        }

        debug!(
            data_types = registry.len(),
            predefined = predefined.len(),
            "schema validated"
        );
    }

    Ok(ValidatedSchema { schema })
}
