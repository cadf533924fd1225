//! Schema container - the merged list of data types for one run

use tracing::warn;

use crate::model::data_type::DataType;

/// Ordering policy applied while building data types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingOptions {
    /// Sort class properties and enum values by name
    pub alphabetize: bool,
}

impl MappingOptions {
    pub fn alphabetized() -> Self {
        Self { alphabetize: true }
    }
}

/// Ordered data types parsed from one or more schema documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub version: String,
    pub data_types: Vec<DataType>,
}

impl Schema {
    pub fn new(version: impl Into<String>, data_types: Vec<DataType>) -> Self {
        Self {
            version: version.into(),
            data_types,
        }
    }

    /// Concatenate schemas in order
    ///
    /// The first non-empty version wins. No deduplication happens here;
    /// duplicate names are the validator's concern.
    pub fn merge(schemas: impl IntoIterator<Item = Schema>) -> Schema {
        let mut merged = Schema::default();
        for schema in schemas {
            if merged.version.is_empty() {
                merged.version = schema.version;
            } else if !schema.version.is_empty() && schema.version != merged.version {
                warn!(
                    expected = %merged.version,
                    found = %schema.version,
                    "schema documents declare different versions"
                );
            }
            merged.data_types.extend(schema.data_types);
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.data_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataType> {
        self.data_types.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::data_type::{Class, Enum};

    #[test]
    fn test_merge_preserves_order_and_duplicates() {
        let a = Schema::new("1.0", vec![Class::new("User", vec![]).into()]);
        let b = Schema::new(
            "",
            vec![
                Enum::new("Role", "String", vec![]).into(),
                Class::new("User", vec![]).into(),
            ],
        );

        let merged = Schema::merge([a, b]);
        assert_eq!(merged.version, "1.0");
        let names: Vec<_> = merged.iter().map(|dt| dt.name()).collect();
        assert_eq!(names, ["User", "Role", "User"]);
    }

    #[test]
    fn test_merge_takes_first_non_empty_version() {
        let merged = Schema::merge([Schema::new("", vec![]), Schema::new("2", vec![])]);
        assert_eq!(merged.version, "2");
        assert!(merged.is_empty());
    }
}
