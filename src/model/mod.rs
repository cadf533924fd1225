//! Type model - data types, members and type expressions

pub mod data_type;
pub mod schema;
pub mod type_expr;

pub use data_type::{Class, DataType, DataTypeKind, Enum, Extra, Property, Value};
pub use schema::{MappingOptions, Schema};
pub use type_expr::{TypeExpr, TypeExprError};
