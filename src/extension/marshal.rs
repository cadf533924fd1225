//! Value marshaling between template context values and Lua values

use chrono::{DateTime, SecondsFormat, Utc};
use mlua::{Lua, LuaSerdeExt, SerializeOptions, Value as LuaValue};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How a script filter's return value is turned back into a context value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    Array,
    Boolean,
    Date,
    Number,
    Object,
    String,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Array => "array",
            ResultKind::Boolean => "boolean",
            ResultKind::Date => "date",
            ResultKind::Number => "number",
            ResultKind::Object => "object",
            ResultKind::String => "string",
        }
    }

    pub fn all() -> &'static [ResultKind] {
        &[
            ResultKind::Array,
            ResultKind::Boolean,
            ResultKind::Date,
            ResultKind::Number,
            ResultKind::Object,
            ResultKind::String,
        ]
    }

    /// Convert a script result into a context value of this kind
    ///
    /// Accepted inputs per kind:
    /// - `string`: string, integer, number, boolean
    /// - `boolean`: boolean
    /// - `number`: integer, number
    /// - `date`: unix seconds or RFC 3339 text, emitted as RFC 3339 UTC
    /// - `array` / `object`: tables of the matching shape (an empty table fits both)
    pub fn convert(&self, lua: &Lua, value: LuaValue) -> Result<JsonValue, MarshalError> {
        match (self, value) {
            (ResultKind::String, LuaValue::String(s)) => Ok(JsonValue::String(lua_str(&s)?)),
            (ResultKind::String, LuaValue::Integer(i)) => Ok(JsonValue::String(i.to_string())),
            (ResultKind::String, LuaValue::Number(n)) => Ok(JsonValue::String(n.to_string())),
            (ResultKind::String, LuaValue::Boolean(b)) => Ok(JsonValue::String(b.to_string())),

            (ResultKind::Boolean, LuaValue::Boolean(b)) => Ok(JsonValue::Bool(b)),

            (ResultKind::Number, LuaValue::Integer(i)) => Ok(JsonValue::from(i)),
            (ResultKind::Number, LuaValue::Number(n)) => serde_json::Number::from_f64(n)
                .map(JsonValue::Number)
                .ok_or(MarshalError::NonFinite(n)),

            (ResultKind::Date, LuaValue::Integer(secs)) => date_from_timestamp(secs as f64),
            (ResultKind::Date, LuaValue::Number(secs)) => date_from_timestamp(secs),
            (ResultKind::Date, LuaValue::String(s)) => {
                let text = lua_str(&s)?;
                DateTime::parse_from_rfc3339(&text)
                    .map(|dt| rfc3339(dt.with_timezone(&Utc)))
                    .map_err(|_| MarshalError::InvalidDate(text))
            }

            (ResultKind::Array, LuaValue::Table(t)) => match table_to_json(lua, t)? {
                JsonValue::Array(items) => Ok(JsonValue::Array(items)),
                JsonValue::Object(map) if map.is_empty() => Ok(JsonValue::Array(Vec::new())),
                _ => Err(self.mismatch("keyed table")),
            },
            (ResultKind::Object, LuaValue::Table(t)) => match table_to_json(lua, t)? {
                JsonValue::Object(map) => Ok(JsonValue::Object(map)),
                JsonValue::Array(items) if items.is_empty() => {
                    Ok(JsonValue::Object(serde_json::Map::new()))
                }
                _ => Err(self.mismatch("sequence table")),
            },

            (_, other) => Err(self.mismatch(other.type_name())),
        }
    }

    fn mismatch(&self, found: &str) -> MarshalError {
        MarshalError::Mismatch {
            expected: *self,
            found: found.to_string(),
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultKind {
    type Err = MarshalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResultKind::all()
            .iter()
            .find(|kind| kind.as_str() == s.to_lowercase())
            .copied()
            .ok_or_else(|| MarshalError::UnknownKind(s.to_string()))
    }
}

/// Errors converting values across the script boundary
#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("unknown result kind '{0}' (valid: array, boolean, date, number, object, string)")]
    UnknownKind(String),

    #[error("expected a {expected} result, script returned {found}")]
    Mismatch { expected: ResultKind, found: String },

    #[error("number result is not finite: {0}")]
    NonFinite(f64),

    #[error("invalid date '{0}': expected RFC 3339 text or unix seconds")]
    InvalidDate(String),

    #[error("cannot convert value: {0}")]
    Conversion(String),
}

/// Convert a context value to Lua; JSON null becomes nil
pub fn to_lua(lua: &Lua, value: &JsonValue) -> Result<LuaValue, MarshalError> {
    let options = SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false);
    lua.to_value_with(value, options)
        .map_err(|e| MarshalError::Conversion(e.to_string()))
}

fn table_to_json(lua: &Lua, table: mlua::Table) -> Result<JsonValue, MarshalError> {
    lua.from_value(LuaValue::Table(table))
        .map_err(|e| MarshalError::Conversion(e.to_string()))
}

fn lua_str(s: &mlua::String) -> Result<String, MarshalError> {
    s.to_str()
        .map(|s| s.to_string())
        .map_err(|e| MarshalError::Conversion(e.to_string()))
}

fn date_from_timestamp(secs: f64) -> Result<JsonValue, MarshalError> {
    if !secs.is_finite() {
        return Err(MarshalError::NonFinite(secs));
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
        .map(rfc3339)
        .ok_or_else(|| MarshalError::InvalidDate(secs.to_string()))
}

fn rfc3339(dt: DateTime<Utc>) -> JsonValue {
    JsonValue::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(lua: &Lua, code: &str) -> LuaValue {
        lua.load(code).eval().unwrap()
    }

    #[test]
    fn test_result_kind_parse() {
        for kind in ResultKind::all() {
            assert_eq!(kind.as_str().parse::<ResultKind>().unwrap(), *kind);
        }
        assert_eq!("String".parse::<ResultKind>().unwrap(), ResultKind::String);
        assert!(matches!(
            "text".parse::<ResultKind>(),
            Err(MarshalError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_string_kind() {
        let lua = Lua::new();
        let kind = ResultKind::String;
        assert_eq!(kind.convert(&lua, eval(&lua, "'abc'")).unwrap(), json!("abc"));
        assert_eq!(kind.convert(&lua, eval(&lua, "42")).unwrap(), json!("42"));
        assert_eq!(kind.convert(&lua, eval(&lua, "true")).unwrap(), json!("true"));
        assert!(matches!(
            kind.convert(&lua, LuaValue::Nil),
            Err(MarshalError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_boolean_and_number_kinds() {
        let lua = Lua::new();
        assert_eq!(
            ResultKind::Boolean.convert(&lua, eval(&lua, "1 == 1")).unwrap(),
            json!(true)
        );
        assert!(ResultKind::Boolean.convert(&lua, eval(&lua, "1")).is_err());
        assert_eq!(ResultKind::Number.convert(&lua, eval(&lua, "7")).unwrap(), json!(7));
        assert_eq!(ResultKind::Number.convert(&lua, eval(&lua, "2.5")).unwrap(), json!(2.5));
        assert!(ResultKind::Number.convert(&lua, eval(&lua, "'7'")).is_err());
        assert!(matches!(
            ResultKind::Number.convert(&lua, eval(&lua, "0/0")),
            Err(MarshalError::NonFinite(_))
        ));
    }

    #[test]
    fn test_date_kind() {
        let lua = Lua::new();
        let kind = ResultKind::Date;
        assert_eq!(
            kind.convert(&lua, eval(&lua, "0")).unwrap(),
            json!("1970-01-01T00:00:00Z")
        );
        assert_eq!(
            kind.convert(&lua, eval(&lua, "'2024-03-01T10:00:00+02:00'")).unwrap(),
            json!("2024-03-01T08:00:00Z")
        );
        assert!(matches!(
            kind.convert(&lua, eval(&lua, "'yesterday'")),
            Err(MarshalError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_table_kinds() {
        let lua = Lua::new();
        assert_eq!(
            ResultKind::Array.convert(&lua, eval(&lua, "{1, 2, 3}")).unwrap(),
            json!([1, 2, 3])
        );
        assert_eq!(
            ResultKind::Array.convert(&lua, eval(&lua, "{}")).unwrap(),
            json!([])
        );
        assert_eq!(
            ResultKind::Object.convert(&lua, eval(&lua, "{a = 'x'}")).unwrap(),
            json!({"a": "x"})
        );
        assert_eq!(
            ResultKind::Object.convert(&lua, eval(&lua, "{}")).unwrap(),
            json!({})
        );
        assert!(ResultKind::Array.convert(&lua, eval(&lua, "{a = 1}")).is_err());
        assert!(ResultKind::Object.convert(&lua, eval(&lua, "{1, 2}")).is_err());
        assert!(ResultKind::Array.convert(&lua, eval(&lua, "'x'")).is_err());
    }

    #[test]
    fn test_to_lua_maps_null_to_nil() {
        let lua = Lua::new();
        let value = to_lua(&lua, &json!({"name": "User", "missing": null})).unwrap();
        let LuaValue::Table(table) = value else {
            panic!("expected table");
        };
        assert_eq!(table.get::<String>("name").unwrap(), "User");
        assert!(table.get::<LuaValue>("missing").unwrap().is_nil());
    }
}
