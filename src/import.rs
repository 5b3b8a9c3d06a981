//! Provider resolution by dotted path
//!
//! Configuration names providers as `module.path.attribute` strings. Rust
//! has no runtime module loader, so modules and their exported symbols are
//! registered up front in a [`ModuleRegistry`] and dotted paths are looked
//! up against it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::error::AuditError;
use crate::request::RequestSnapshot;

/// Callable that contributes context data to an audit event
pub type ContextProvider = Arc<dyn Fn(&RequestSnapshot) -> Value + Send + Sync>;

/// Symbols addressable by dotted path, grouped by module
#[derive(Clone)]
pub struct ModuleRegistry<T> {
    modules: HashMap<String, HashMap<String, T>>,
}

impl<T> Default for ModuleRegistry<T> {
    fn default() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }
}

impl<T: Clone> ModuleRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export `value` under `path` (`module.path.attribute`)
    ///
    /// Re-registering a path replaces the previous symbol.
    pub fn register(&mut self, path: &str, value: T) -> Result<&mut Self, AuditError> {
        let (module, attribute) = split_path(path)?;
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(attribute.to_string(), value);
        Ok(self)
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, path: &str, value: T) -> Result<Self, AuditError> {
        self.register(path, value)?;
        Ok(self)
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    /// Resolve a dotted path to a clone of the registered symbol
    pub fn resolve(&self, path: &str) -> Result<T, AuditError> {
        let (module, attribute) = split_path(path)?;

        let symbols = self
            .modules
            .get(module)
            .ok_or_else(|| AuditError::ModuleNotFound(module.to_string()))?;

        symbols
            .get(attribute)
            .cloned()
            .ok_or_else(|| AuditError::AttributeNotFound {
                module: module.to_string(),
                attribute: attribute.to_string(),
            })
    }
}

/// Split `module.path.attribute` into its module and attribute segments
fn split_path(path: &str) -> Result<(&str, &str), AuditError> {
    let invalid = || AuditError::InvalidPath(path.to_string());

    let (module, attribute) = path.rsplit_once('.').ok_or_else(invalid)?;
    if attribute.is_empty() || module.split('.').any(str::is_empty) {
        return Err(invalid());
    }

    Ok((module, attribute))
}

/// Resolve one dotted path against `registry`
pub fn dynamic_import<T: Clone>(registry: &ModuleRegistry<T>, path: &str) -> Result<T, AuditError> {
    registry.resolve(path)
}

/// Resolve every configured provider
///
/// Entries are resolved in name order and the first failure is returned;
/// no partially populated map is ever produced.
pub fn import_providers<T: Clone>(
    registry: &ModuleRegistry<T>,
    providers: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, T>, AuditError> {
    providers
        .iter()
        .map(|(name, path)| Ok((name.clone(), dynamic_import(registry, path)?)))
        .collect()
}
