//! Data type definitions: classes, enums, and their members

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

use crate::model::type_expr::TypeExpr;

/// Document keys that are not part of the formal model
pub type Extra = Map<String, JsonValue>;

/// Discriminant of a data type (`type` key in schema documents)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataTypeKind {
    #[default]
    Class,
    Enum,
}

impl DataTypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataTypeKind::Class => "class",
            DataTypeKind::Enum => "enum",
        }
    }
}

impl fmt::Display for DataTypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataTypeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "class" => Ok(DataTypeKind::Class),
            "enum" => Ok(DataTypeKind::Enum),
            other => Err(other.to_string()),
        }
    }
}

/// A named, typed field of a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,

    #[serde(rename = "dataType")]
    pub data_type: TypeExpr,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Property {
    pub fn new(name: impl Into<String>, data_type: TypeExpr) -> Self {
        Self {
            name: name.into(),
            data_type,
            description: None,
            extra: Extra::new(),
        }
    }

    pub fn is_collection(&self) -> bool {
        self.data_type.is_collection()
    }

    pub fn is_optional(&self) -> bool {
        self.data_type.is_optional()
    }

    pub fn raw_data_type(&self) -> &str {
        self.data_type.raw_data_type()
    }
}

/// A single enum case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub name: String,

    /// Literal form used at the wire/storage boundary
    #[serde(deserialize_with = "literal_string")]
    pub value: String,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Value {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            extra: Extra::new(),
        }
    }
}

/// Accept strings, numbers and booleans, keeping their literal text
fn literal_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "enum value must be a string, number or boolean, found {}",
            other
        ))),
    }
}

/// A data type with an ordered list of properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,

    #[serde(default)]
    pub properties: Vec<Property>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Class {
    pub fn new(name: impl Into<String>, properties: Vec<Property>) -> Self {
        Self {
            name: name.into(),
            properties,
            extra: Extra::new(),
        }
    }
}

/// A data type backed by a scalar type with an ordered list of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    pub name: String,

    /// Backing scalar type, always a plain name
    #[serde(rename = "dataType")]
    pub data_type: TypeExpr,

    pub values: Vec<Value>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Enum {
    pub fn new(name: impl Into<String>, raw_data_type: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            data_type: TypeExpr::new(raw_data_type, false, false),
            values,
            extra: Extra::new(),
        }
    }

    pub fn raw_data_type(&self) -> &str {
        self.data_type.raw_data_type()
    }
}

/// A named schema entity
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Class(Class),
    Enum(Enum),
}

impl DataType {
    pub fn name(&self) -> &str {
        match self {
            DataType::Class(c) => &c.name,
            DataType::Enum(e) => &e.name,
        }
    }

    pub fn kind(&self) -> DataTypeKind {
        match self {
            DataType::Class(_) => DataTypeKind::Class,
            DataType::Enum(_) => DataTypeKind::Enum,
        }
    }

    pub fn extra(&self) -> &Extra {
        match self {
            DataType::Class(c) => &c.extra,
            DataType::Enum(e) => &e.extra,
        }
    }

    /// Number of properties or enum values
    pub fn member_count(&self) -> usize {
        match self {
            DataType::Class(c) => c.properties.len(),
            DataType::Enum(e) => e.values.len(),
        }
    }

    /// Raw type names this data type depends on, in declaration order
    pub fn referenced_types(&self) -> Vec<&str> {
        match self {
            DataType::Class(c) => c.properties.iter().map(Property::raw_data_type).collect(),
            DataType::Enum(e) => vec![e.raw_data_type()],
        }
    }

    /// Sort properties or values lexicographically by name
    pub fn alphabetize(&mut self) {
        match self {
            DataType::Class(c) => c.properties.sort_by(|a, b| a.name.cmp(&b.name)),
            DataType::Enum(e) => e.values.sort_by(|a, b| a.name.cmp(&b.name)),
        }
    }

    /// First member name that appears more than once, if any
    pub fn duplicate_member(&self) -> Option<&str> {
        let names: Vec<&str> = match self {
            DataType::Class(c) => c.properties.iter().map(|p| p.name.as_str()).collect(),
            DataType::Enum(e) => e.values.iter().map(|v| v.name.as_str()).collect(),
        };
        let mut seen = std::collections::HashSet::new();
        names.into_iter().find(|name| !seen.insert(*name))
    }
}

impl From<Class> for DataType {
    fn from(class: Class) -> Self {
        DataType::Class(class)
    }
}

impl From<Enum> for DataType {
    fn from(e: Enum) -> Self {
        DataType::Enum(e)
    }
}
