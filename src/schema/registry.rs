//! Type registry - name index over data types plus predefined type names

use std::collections::{BTreeSet, HashMap};

use crate::model::DataType;
use crate::schema::validator::ValidationError;

/// Type names accepted without a matching data type definition
///
/// Empty by default; extensions replace it wholesale through
/// `registerPredefinedTypes`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredefinedTypes {
    names: BTreeSet<String>,
}

impl PredefinedTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole set
    pub fn replace<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PredefinedTypes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut types = Self::new();
        types.replace(iter);
        types
    }
}

/// Name-keyed index over a list of data types
#[derive(Debug)]
pub struct TypeRegistry<'a> {
    types: HashMap<&'a str, &'a DataType>,
}

impl<'a> TypeRegistry<'a> {
    /// Index data types in input order, failing on the first repeated name
    pub fn build(data_types: &'a [DataType]) -> Result<Self, ValidationError> {
        let mut types = HashMap::with_capacity(data_types.len());
        for data_type in data_types {
            if types.insert(data_type.name(), data_type).is_some() {
                return Err(ValidationError::DuplicateTypeDefined {
                    name: data_type.name().to_string(),
                });
            }
        }
        Ok(Self { types })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// True if `name` is a defined data type or a predefined type
    pub fn resolves(&self, name: &str, predefined: &PredefinedTypes) -> bool {
        self.contains(name) || predefined.contains(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
