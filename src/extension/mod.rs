//! Extension bridge - Lua scripts that register predefined types,
//! template filters and template tags
//!
//! One Lua runtime is created per run. Scripts are evaluated once each in
//! the order given; their registrations accumulate (later names overwrite
//! earlier ones) and are frozen into [`Extensions`] before rendering starts.

mod callbacks;
mod host;
pub mod marshal;

use miette::Diagnostic;
use mlua::Lua;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tera::Tera;
use thiserror::Error;
use tracing::debug;

use crate::core::loader::SourceFile;
use crate::schema::registry::PredefinedTypes;

pub use callbacks::{CallbackError, ScriptFilter, ScriptTag};
pub use host::FilterBinding;
pub use marshal::{MarshalError, ResultKind};

use host::Registrations;

#[derive(Debug, Error, Diagnostic)]
pub enum ExtensionError {
    #[error("cannot initialize the extension runtime: {0}")]
    #[diagnostic(code(dtgen::extension::runtime))]
    Runtime(String),

    #[error("extension script '{script}' failed to load: {message}")]
    #[diagnostic(
        code(dtgen::extension::evaluation),
        help("errors raised while an extension script is loading are fatal")
    )]
    Evaluation { script: String, message: String },
}

/// Loads extension scripts into a fresh Lua runtime
pub struct ExtensionBridge {
    lua: Arc<Lua>,
    scripts: Vec<String>,
}

impl ExtensionBridge {
    pub fn new() -> Result<Self, ExtensionError> {
        let lua = Lua::new();
        lua.set_app_data(Registrations::default());
        host::register(&lua).map_err(|e| ExtensionError::Runtime(e.to_string()))?;

        Ok(Self {
            lua: Arc::new(lua),
            scripts: Vec::new(),
        })
    }

    /// Evaluate one script
    pub fn load(&mut self, script: &str, source: &str) -> Result<(), ExtensionError> {
        debug!(script, "loading extension");
        self.lua
            .load(source)
            .set_name(format!("@{}", script))
            .exec()
            .map_err(|e| ExtensionError::Evaluation {
                script: script.to_string(),
                message: e.to_string(),
            })?;
        self.scripts.push(script.to_string());
        Ok(())
    }

    /// Evaluate scripts in order, stopping at the first failure
    pub fn load_all(&mut self, sources: &[SourceFile]) -> Result<(), ExtensionError> {
        for source in sources {
            self.load(&source.name, &source.contents)?;
        }
        Ok(())
    }

    /// Freeze the registrations
    pub fn finish(self) -> Extensions {
        let registrations = self.lua.remove_app_data::<Registrations>().unwrap_or_default();
        debug!(
            scripts = self.scripts.len(),
            filters = registrations.filters.len(),
            tags = registrations.tags.len(),
            predefined = registrations.predefined.len(),
            "extensions loaded"
        );
        Extensions {
            lua: self.lua,
            registrations,
            scripts: self.scripts,
        }
    }
}

/// Frozen extension registrations for one run
pub struct Extensions {
    lua: Arc<Lua>,
    registrations: Registrations,
    scripts: Vec<String>,
}

impl Extensions {
    /// Extensions with nothing loaded
    pub fn none() -> Result<Self, ExtensionError> {
        Ok(ExtensionBridge::new()?.finish())
    }

    /// Load every script and freeze the result
    pub fn load(sources: &[SourceFile]) -> Result<Self, ExtensionError> {
        let mut bridge = ExtensionBridge::new()?;
        bridge.load_all(sources)?;
        Ok(bridge.finish())
    }

    pub fn predefined_types(&self) -> &PredefinedTypes {
        &self.registrations.predefined
    }

    pub fn filter(&self, name: &str) -> Option<&FilterBinding> {
        self.registrations.filters.get(name)
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.registrations.filters.keys().map(String::as_str)
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.registrations.tags.keys().map(String::as_str)
    }

    pub fn has_tags(&self) -> bool {
        !self.registrations.tags.is_empty()
    }

    /// Names of the scripts that were loaded, in load order
    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    /// Register every script filter with the template engine
    pub fn install_filters(&self, tera: &mut Tera) {
        for (name, binding) in &self.registrations.filters {
            tera.register_filter(
                name,
                ScriptFilter::new(Arc::clone(&self.lua), name.clone(), binding.clone()),
            );
        }
    }

    /// Register every script tag, bound to one rendering context
    pub fn install_tags(&self, tera: &mut Tera, context: &JsonValue) {
        for (name, function) in &self.registrations.tags {
            tera.register_function(
                name,
                ScriptTag::new(Arc::clone(&self.lua), name.clone(), function.clone(), context.clone()),
            );
        }
    }

    /// Evaluate Lua source in the extension runtime
    ///
    /// Does not reopen registrations; scripts run this way can only
    /// redefine or remove the functions filters and tags call into.
    #[cfg(test)]
    pub(crate) fn eval(&self, source: &str) -> Result<(), ExtensionError> {
        self.lua
            .load(source)
            .exec()
            .map_err(|e| ExtensionError::Evaluation {
                script: "<eval>".to_string(),
                message: e.to_string(),
            })
    }
}
