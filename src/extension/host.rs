//! Host functions exposed to extension scripts
//!
//! Scripts see exactly four globals:
//!
//! ```lua
//! log(message)
//! registerPredefinedTypes({ "String", "Int" })
//! registerFilter("upper", "to_upper", "string")
//! registerTag("header", "render_header")
//! ```

use mlua::{Lua, Result as LuaResult};
use std::collections::BTreeMap;
use tracing::info;

use crate::extension::marshal::ResultKind;
use crate::schema::registry::PredefinedTypes;

/// A template filter backed by a script function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterBinding {
    pub function: String,
    pub result_kind: ResultKind,
}

/// Everything scripts registered while loading
///
/// Lives in the Lua app data until loading finishes, then moves out so
/// callbacks running during rendering cannot change it.
#[derive(Debug, Default)]
pub(crate) struct Registrations {
    pub predefined: PredefinedTypes,
    pub filters: BTreeMap<String, FilterBinding>,
    pub tags: BTreeMap<String, String>,
}

pub(crate) fn register(lua: &Lua) -> LuaResult<()> {
    let globals = lua.globals();

    // log(message)
    globals.set(
        "log",
        lua.create_function(|_, message: String| {
            info!(target: "dtgen::extension", "{}", message);
            Ok(())
        })?,
    )?;

    // registerPredefinedTypes(names)
    globals.set(
        "registerPredefinedTypes",
        lua.create_function(|lua, names: Vec<String>| {
            with_registrations(lua, |r| r.predefined.replace(names))
        })?,
    )?;

    // registerFilter(filterName, scriptFunctionName, resultKind)
    globals.set(
        "registerFilter",
        lua.create_function(
            |lua, (filter, function, kind): (String, String, String)| {
                let result_kind: ResultKind = kind.parse().map_err(mlua::Error::external)?;
                with_registrations(lua, |r| {
                    r.filters.insert(
                        filter,
                        FilterBinding {
                            function,
                            result_kind,
                        },
                    );
                })
            },
        )?,
    )?;

    // registerTag(tagName, scriptFunctionName)
    globals.set(
        "registerTag",
        lua.create_function(|lua, (tag, function): (String, String)| {
            with_registrations(lua, |r| {
                r.tags.insert(tag, function);
            })
        })?,
    )?;

    Ok(())
}

fn with_registrations<R>(lua: &Lua, f: impl FnOnce(&mut Registrations) -> R) -> LuaResult<R> {
    let mut registrations = lua
        .app_data_mut::<Registrations>()
        .ok_or_else(|| mlua::Error::runtime("registrations are closed once extensions finish loading"))?;
    Ok(f(&mut registrations))
}
