//! Script-backed template filters and tags
//!
//! A tag is a Tera function whose script receives the data type context as
//! one table. Tera functions cannot see loop variables or `{% set %}`
//! bindings, so templates pass those as named arguments, which are merged
//! into the table and shadow context keys of the same name:
//!
//! ```text
//! {% for p in properties %}{{ field(p=p) }}{% endfor %}
//! ```

use mlua::{Function, Lua, Value as LuaValue};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::extension::host::FilterBinding;
use crate::extension::marshal::{to_lua, MarshalError};

/// Failure inside a filter or tag callback
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("script function '{0}' is not defined")]
    MissingFunction(String),

    #[error("script function '{function}' raised an error: {message}")]
    Script { function: String, message: String },

    #[error("script function '{function}': {source}")]
    Marshal {
        function: String,
        #[source]
        source: MarshalError,
    },
}

/// Look a global function up by name at call time
fn lookup(lua: &Lua, name: &str) -> Result<Function, CallbackError> {
    match lua.globals().get::<LuaValue>(name) {
        Ok(LuaValue::Function(function)) => Ok(function),
        _ => Err(CallbackError::MissingFunction(name.to_string())),
    }
}

fn call(lua: &Lua, name: &str, argument: Option<&JsonValue>) -> Result<LuaValue, CallbackError> {
    let function = lookup(lua, name)?;
    let marshal = |source| CallbackError::Marshal {
        function: name.to_string(),
        source,
    };
    let result = match argument {
        Some(value) => function.call::<LuaValue>(to_lua(lua, value).map_err(marshal)?),
        None => function.call::<LuaValue>(()),
    };
    result.map_err(|e| CallbackError::Script {
        function: name.to_string(),
        message: e.to_string(),
    })
}

/// A Tera filter that forwards to a script function
pub struct ScriptFilter {
    lua: Arc<Lua>,
    name: String,
    binding: FilterBinding,
}

impl ScriptFilter {
    pub fn new(lua: Arc<Lua>, name: impl Into<String>, binding: FilterBinding) -> Self {
        Self {
            lua,
            name: name.into(),
            binding,
        }
    }

    fn apply(&self, value: &JsonValue) -> Result<JsonValue, CallbackError> {
        let function = &self.binding.function;
        let argument = (!value.is_null()).then_some(value);
        let result = call(&self.lua, function, argument)?;
        self.binding
            .result_kind
            .convert(&self.lua, result)
            .map_err(|source| CallbackError::Marshal {
                function: function.clone(),
                source,
            })
    }
}

impl tera::Filter for ScriptFilter {
    fn filter(&self, value: &JsonValue, _args: &HashMap<String, JsonValue>) -> tera::Result<JsonValue> {
        self.apply(value)
            .map_err(|e| tera::Error::chain(format!("filter '{}' failed", self.name), e))
    }
}

/// A Tera function that calls a script with the whole rendering context
///
/// Installed per data type because the context is bound at construction.
pub struct ScriptTag {
    lua: Arc<Lua>,
    name: String,
    function: String,
    context: JsonValue,
}

impl ScriptTag {
    pub fn new(
        lua: Arc<Lua>,
        name: impl Into<String>,
        function: impl Into<String>,
        context: JsonValue,
    ) -> Self {
        Self {
            lua,
            name: name.into(),
            function: function.into(),
            context,
        }
    }

    fn apply(&self, args: &HashMap<String, JsonValue>) -> Result<JsonValue, CallbackError> {
        let context = match (&self.context, args.is_empty()) {
            (JsonValue::Object(fields), false) => {
                let mut fields = fields.clone();
                fields.extend(args.iter().map(|(k, v)| (k.clone(), v.clone())));
                JsonValue::Object(fields)
            }
            _ => self.context.clone(),
        };

        match call(&self.lua, &self.function, Some(&context))? {
            LuaValue::String(s) => s
                .to_str()
                .map(|s| JsonValue::String(s.to_string()))
                .map_err(|e| CallbackError::Script {
                    function: self.function.clone(),
                    message: e.to_string(),
                }),
            other => Err(CallbackError::Marshal {
                function: self.function.clone(),
                source: MarshalError::Mismatch {
                    expected: crate::extension::marshal::ResultKind::String,
                    found: other.type_name().to_string(),
                },
            }),
        }
    }
}

impl tera::Function for ScriptTag {
    fn call(&self, args: &HashMap<String, JsonValue>) -> tera::Result<JsonValue> {
        self.apply(args)
            .map_err(|e| tera::Error::chain(format!("tag '{}' failed", self.name), e))
    }

    fn is_safe(&self) -> bool {
        true
    }
}
