//! dtgen: data type code generator
//!
//! Parses declarative data type schemas, validates the type graph and
//! renders each type through a Tera template, with Lua extensions for
//! predefined types, template filters and template tags.

pub mod cli;
pub mod core;
pub mod diagnostics;
pub mod extension;
pub mod model;
pub mod schema;
