//! Schema document parsing (JSON or YAML) into a [`Schema`]

use jsonschema::Validator as JsonValidator;
use miette::Diagnostic;
use rust_embed::Embed;
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::core::loader::SourceFile;
use crate::diagnostics::DocumentSyntaxError;
use crate::model::{Class, DataType, DataTypeKind, Enum, MappingOptions, Schema};

#[derive(Embed)]
#[folder = "schemas/"]
struct EmbeddedSchemas;

const DOCUMENT_SCHEMA: &str = "schema-document.schema.json";

/// Errors raised while turning a schema document into data types
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] DocumentSyntaxError),

    #[error("unsupported schema document format: {file}")]
    #[diagnostic(
        code(dtgen::schema::unsupported_format),
        help("schema documents must end in .json, .yaml or .yml")
    )]
    UnsupportedFormat { file: String },

    #[error("{file} is not a valid schema document:\n  {}", .violations.join("\n  "))]
    #[diagnostic(code(dtgen::schema::structure))]
    Structure { file: String, violations: Vec<String> },

    #[error("{file}: cannot decode data type '{data_type}': {message}")]
    #[diagnostic(code(dtgen::schema::decode))]
    Decode {
        file: String,
        data_type: String,
        message: String,
    },

    #[error("{file}: data type '{name}' has unknown type '{kind}'")]
    #[diagnostic(code(dtgen::schema::unknown_kind), help("use \"class\" or \"enum\""))]
    UnknownKind {
        file: String,
        name: String,
        kind: String,
    },

    #[error("{file}: data type name '{name}' cannot be used as an artifact file name")]
    #[diagnostic(
        code(dtgen::schema::invalid_name),
        help("data type names must not contain '/', '\\', '..' or NUL characters")
    )]
    InvalidName { file: String, name: String },

    #[error("{file}: enum '{name}' must be backed by a plain type name, found '{expr}'")]
    #[diagnostic(code(dtgen::schema::enum_backing))]
    InvalidEnumBacking {
        file: String,
        name: String,
        expr: String,
    },

    #[error("{file}: '{member}' is declared more than once in '{data_type}'")]
    #[diagnostic(code(dtgen::schema::duplicate_member))]
    DuplicateMember {
        file: String,
        data_type: String,
        member: String,
    },

    #[error("embedded document schema is unusable: {0}")]
    #[diagnostic(code(dtgen::schema::internal))]
    Internal(String),
}

/// Parses schema documents with a fixed ordering policy
pub struct DocumentParser {
    shape: JsonValidator,
    options: MappingOptions,
}

impl DocumentParser {
    /// Create a parser, compiling the embedded document schema
    pub fn new(options: MappingOptions) -> Result<Self, SchemaError> {
        let file = EmbeddedSchemas::get(DOCUMENT_SCHEMA)
            .ok_or_else(|| SchemaError::Internal(format!("{} is not embedded", DOCUMENT_SCHEMA)))?;
        let schema_json: JsonValue = serde_json::from_slice(&file.data)
            .map_err(|e| SchemaError::Internal(e.to_string()))?;
        let shape = jsonschema::validator_for(&schema_json)
            .map_err(|e| SchemaError::Internal(e.to_string()))?;

        Ok(Self { shape, options })
    }

    pub fn options(&self) -> MappingOptions {
        self.options
    }

    /// Parse every source in order and merge the results
    pub fn parse_all(&self, sources: &[SourceFile]) -> Result<Schema, SchemaError> {
        let schemas = sources
            .iter()
            .map(|source| self.parse(&source.name, &source.contents))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Schema::merge(schemas))
    }

    /// Parse a single document; the format is chosen by file extension
    pub fn parse(&self, file: &str, source: &str) -> Result<Schema, SchemaError> {
        let document = read_document(file, source)?;

        let violations: Vec<String> = self
            .shape
            .iter_errors(&document)
            .map(|error| {
                let path = error.instance_path.as_str();
                if path.is_empty() {
                    format!("document root: {}", error)
                } else {
                    format!("{}: {}", path, error)
                }
            })
            .collect();
        if !violations.is_empty() {
            return Err(SchemaError::Structure {
                file: file.to_string(),
                violations,
            });
        }

        let JsonValue::Object(mut root) = document else {
            return Err(SchemaError::Internal("document root is not an object".to_string()));
        };
        // YAML reads an unquoted `version: 1.0` as a number
        let version = match root.remove("version") {
            Some(JsonValue::String(v)) => v,
            Some(JsonValue::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let entries = match root.remove("dataTypes") {
            Some(JsonValue::Array(entries)) => entries,
            _ => Vec::new(),
        };

        let mut data_types = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut data_type = decode_data_type(file, entry)?;
            if let Some(member) = data_type.duplicate_member() {
                return Err(SchemaError::DuplicateMember {
                    file: file.to_string(),
                    data_type: data_type.name().to_string(),
                    member: member.to_string(),
                });
            }
            if self.options.alphabetize {
                data_type.alphabetize();
            }
            data_types.push(data_type);
        }

        debug!(file, count = data_types.len(), "parsed schema document");
        Ok(Schema::new(version, data_types))
    }
}

fn read_document(file: &str, source: &str) -> Result<JsonValue, SchemaError> {
    let extension = Path::new(file)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => serde_json::from_str(source)
            .map_err(|e| DocumentSyntaxError::from_json_error(&e, source, file).into()),
        Some("yaml") | Some("yml") => serde_yml::from_str(source)
            .map_err(|e| DocumentSyntaxError::from_yaml_error(&e, source, file).into()),
        _ => Err(SchemaError::UnsupportedFormat {
            file: file.to_string(),
        }),
    }
}

/// Decode one `dataTypes` entry by inspecting its `type` discriminant first
fn decode_data_type(file: &str, entry: JsonValue) -> Result<DataType, SchemaError> {
    let mut object: Map<String, JsonValue> = match entry {
        JsonValue::Object(object) => object,
        other => {
            return Err(SchemaError::Decode {
                file: file.to_string(),
                data_type: other.to_string(),
                message: "expected an object".to_string(),
            })
        }
    };

    let name = object
        .get("name")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string();
    if !is_file_name_safe(&name) {
        return Err(SchemaError::InvalidName {
            file: file.to_string(),
            name,
        });
    }

    let kind = match object.remove("type") {
        None => DataTypeKind::default(),
        Some(JsonValue::String(s)) => s.parse().map_err(|kind| SchemaError::UnknownKind {
            file: file.to_string(),
            name: name.clone(),
            kind,
        })?,
        Some(other) => {
            return Err(SchemaError::UnknownKind {
                file: file.to_string(),
                name,
                kind: other.to_string(),
            })
        }
    };

    let decode_error = |e: serde_json::Error| SchemaError::Decode {
        file: file.to_string(),
        data_type: name.clone(),
        message: e.to_string(),
    };

    match kind {
        DataTypeKind::Class => serde_json::from_value::<Class>(JsonValue::Object(object))
            .map(DataType::Class)
            .map_err(decode_error),
        DataTypeKind::Enum => {
            let e = serde_json::from_value::<Enum>(JsonValue::Object(object)).map_err(decode_error)?;
            if !e.data_type.is_plain() {
                return Err(SchemaError::InvalidEnumBacking {
                    file: file.to_string(),
                    name: e.name,
                    expr: e.data_type.to_string(),
                });
            }
            Ok(DataType::Enum(e))
        }
    }
}

/// Data type names become artifact file names and must stay one path component
fn is_file_name_safe(name: &str) -> bool {
    !name.contains(['/', '\\', '\0']) && !name.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> DocumentParser {
        DocumentParser::new(MappingOptions::default()).unwrap()
    }

    const USERS: &str = r#"{
        "version": "1.0",
        "dataTypes": [
            {
                "name": "User",
                "properties": [
                    { "name": "name", "dataType": "String", "description": "Full name" },
                    { "name": "roles", "dataType": "[Role]?", "jsonKey": "user_roles" }
                ],
                "table": "users"
            },
            {
                "name": "Role",
                "type": "enum",
                "dataType": "Int",
                "values": [
                    { "name": "admin", "value": 1 },
                    { "name": "guest", "value": "2" }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_json_document() {
        let schema = parser().parse("users.json", USERS).unwrap();
        assert_eq!(schema.version, "1.0");
        assert_eq!(schema.len(), 2);

        let DataType::Class(user) = &schema.data_types[0] else {
            panic!("expected class");
        };
        assert_eq!(user.properties.len(), 2);
        assert_eq!(user.properties[0].description.as_deref(), Some("Full name"));
        assert!(user.properties[1].is_collection());
        assert_eq!(user.properties[1].extra.get("jsonKey").unwrap(), "user_roles");
        assert_eq!(user.extra.get("table").unwrap(), "users");
        assert!(!user.extra.contains_key("type"));

        let DataType::Enum(role) = &schema.data_types[1] else {
            panic!("expected enum");
        };
        assert_eq!(role.raw_data_type(), "Int");
        assert_eq!(role.values[0].value, "1");
        assert!(!role.extra.contains_key("type"));
    }

    #[test]
    fn test_parse_yaml_document() {
        let yaml = r#"
version: "2"
dataTypes:
  - name: Point
    properties:
      - name: x
        dataType: Int
      - name: y
        dataType: Int
"#;
        let schema = parser().parse("points.yml", yaml).unwrap();
        assert_eq!(schema.version, "2");
        assert_eq!(schema.data_types[0].kind(), DataTypeKind::Class);
        assert_eq!(schema.data_types[0].member_count(), 2);
    }

    #[test]
    fn test_alphabetize_option() {
        let doc = r#"{"dataTypes": [{"name": "T", "properties": [
            {"name": "b", "dataType": "Int"},
            {"name": "a", "dataType": "Int"},
            {"name": "c", "dataType": "Int"}
        ]}]}"#;

        let names = |schema: &Schema| -> Vec<String> {
            match &schema.data_types[0] {
                DataType::Class(c) => c.properties.iter().map(|p| p.name.clone()).collect(),
                DataType::Enum(_) => unreachable!(),
            }
        };

        let plain = parser().parse("t.json", doc).unwrap();
        assert_eq!(names(&plain), ["b", "a", "c"]);

        let sorted = DocumentParser::new(MappingOptions::alphabetized())
            .unwrap()
            .parse("t.json", doc)
            .unwrap();
        assert_eq!(names(&sorted), ["a", "b", "c"]);
    }

    #[test]
    fn test_syntax_error() {
        let err = parser().parse("broken.json", "{\"dataTypes\": [").unwrap_err();
        assert!(matches!(err, SchemaError::Syntax(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let err = parser().parse("schema.toml", "").unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_structure_violations_are_collected() {
        let doc = r#"{"dataTypes": [
            {"name": "A", "properties": [{"name": "x"}]},
            {"name": "B", "type": "enum", "values": []}
        ]}"#;
        let err = parser().parse("bad.json", doc).unwrap_err();
        let SchemaError::Structure { violations, .. } = err else {
            panic!("expected structure error, got {err:?}");
        };
        assert!(violations.len() >= 2, "{violations:?}");
        assert!(violations.iter().any(|v| v.contains("/dataTypes/0")));
        assert!(violations.iter().any(|v| v.contains("/dataTypes/1")));
    }

    #[test]
    fn test_unknown_kind() {
        let doc = r#"{"dataTypes": [{"name": "A", "type": "struct"}]}"#;
        // The structural check rejects it before decoding
        assert!(matches!(
            parser().parse("a.json", doc).unwrap_err(),
            SchemaError::Structure { .. }
        ));

        let err = decode_data_type("a.json", serde_json::json!({"name": "A", "type": "struct"}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownKind { ref kind, .. } if kind == "struct"));
    }

    #[test]
    fn test_malformed_type_expression() {
        let doc = r#"{"dataTypes": [{"name": "A", "properties": [{"name": "x", "dataType": "[Int"}]}]}"#;
        let err = parser().parse("a.json", doc).unwrap_err();
        let SchemaError::Decode { data_type, message, .. } = err else {
            panic!("expected decode error");
        };
        assert_eq!(data_type, "A");
        assert!(message.contains("[Int"));
    }

    #[test]
    fn test_enum_backing_must_be_plain() {
        let doc = r#"{"dataTypes": [{"name": "E", "type": "enum", "dataType": "[Int]", "values": []}]}"#;
        let err = parser().parse("e.json", doc).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidEnumBacking { ref expr, .. } if expr == "[Int]"));
    }

    #[test]
    fn test_duplicate_member() {
        let doc = r#"{"dataTypes": [{"name": "E", "type": "enum", "dataType": "Int", "values": [
            {"name": "a", "value": 1}, {"name": "a", "value": 2}
        ]}]}"#;
        let err = parser().parse("e.json", doc).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateMember { ref member, .. } if member == "a"));
    }

    #[test]
    fn test_numeric_version_is_kept_as_text() {
        let schema = parser()
            .parse("v.yaml", "version: 1.0\ndataTypes:\n  - name: A\n")
            .unwrap();
        assert_eq!(schema.version, "1.0");
    }

    #[test]
    fn test_path_like_names_are_rejected() {
        for name in ["../escaped", "a/b", "a\\\\b", "..", "nul\\u0000"] {
            let doc = format!(r#"{{"dataTypes": [{{"name": "{}"}}]}}"#, name);
            let err = parser().parse("n.json", &doc).unwrap_err();
            assert!(
                matches!(err, SchemaError::InvalidName { .. }),
                "{name}: {err:?}"
            );
        }
        assert!(parser()
            .parse("n.json", r#"{"dataTypes": [{"name": "User.v2"}]}"#)
            .is_ok());
    }

    #[test]
    fn test_parse_all_merges_in_order() {
        let sources = vec![
            SourceFile::new("a.json", r#"{"version": "1", "dataTypes": [{"name": "A"}]}"#),
            SourceFile::new("b.yaml", "dataTypes:\n  - name: B\n"),
        ];
        let schema = parser().parse_all(&sources).unwrap();
        let names: Vec<_> = schema.iter().map(DataType::name).collect();
        assert_eq!(names, ["A", "B"]);
    }
}
