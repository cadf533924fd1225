//! Property type expressions (`String`, `[User]`, `Int?`, `[User]?`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A parsed property type expression
///
/// Grammar: `TypeExpr := ("[" Name "]" | Name) "?"?`. Parsing is purely
/// syntactic; whether `raw_data_type` names a known type is checked later
/// by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeExpr {
    raw_data_type: String,
    is_collection: bool,
    is_optional: bool,
}

impl TypeExpr {
    /// Build an expression from its parts
    pub fn new(raw_data_type: impl Into<String>, is_collection: bool, is_optional: bool) -> Self {
        Self {
            raw_data_type: raw_data_type.into(),
            is_collection,
            is_optional,
        }
    }

    pub fn parse(s: &str) -> Result<Self, TypeExprError> {
        s.parse()
    }

    /// The type name with collection brackets and optional marker stripped
    pub fn raw_data_type(&self) -> &str {
        &self.raw_data_type
    }

    pub fn is_collection(&self) -> bool {
        self.is_collection
    }

    pub fn is_optional(&self) -> bool {
        self.is_optional
    }

    /// True for a bare name with no modifiers
    pub fn is_plain(&self) -> bool {
        !self.is_collection && !self.is_optional
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_collection {
            write!(f, "[{}]", self.raw_data_type)?;
        } else {
            f.write_str(&self.raw_data_type)?;
        }
        if self.is_optional {
            f.write_str("?")?;
        }
        Ok(())
    }
}

impl FromStr for TypeExpr {
    type Err = TypeExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(TypeExprError::Empty);
        }

        let (body, is_optional) = match s.strip_suffix('?') {
            Some(body) => (body, true),
            None => (s, false),
        };
        if body.contains('?') {
            return Err(TypeExprError::NestedModifier(s.to_string()));
        }

        let (name, is_collection) = match (body.strip_prefix('['), body.strip_suffix(']')) {
            (Some(_), Some(_)) if body.len() >= 2 => (&body[1..body.len() - 1], true),
            (None, None) => (body, false),
            _ => return Err(TypeExprError::UnbalancedBrackets(s.to_string())),
        };

        if name.contains(['[', ']']) {
            return Err(if is_collection {
                TypeExprError::NestedModifier(s.to_string())
            } else {
                TypeExprError::UnbalancedBrackets(s.to_string())
            });
        }
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(TypeExprError::InvalidName(s.to_string()));
        }

        Ok(Self::new(name, is_collection, is_optional))
    }
}

impl Serialize for TypeExpr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeExpr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing a type expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeExprError {
    #[error("empty type expression")]
    Empty,

    #[error("unbalanced brackets in type expression '{0}'")]
    UnbalancedBrackets(String),

    #[error("nested or repeated modifier in type expression '{0}' (expected Name, [Name], Name? or [Name]?)")]
    NestedModifier(String),

    #[error("invalid type name in type expression '{0}'")]
    InvalidName(String),
}
