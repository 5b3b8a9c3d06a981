//! Configuration management for audit-tools
//!
//! Handles loading environment variables with fail-soft behavior.
//! Malformed values fall back to defaults and produce a warning instead of
//! stopping the host application.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

/// Launcher scripts skipped when naming the current process
pub const DEFAULT_LAUNCHER_SCRIPTS: &[&str] = &["manage.py"];

/// Configuration for audit-tools
///
/// Loaded from environment variables:
/// - `AUDIT_TRANSLATE_URLS`: Flag ("true"/"1"/"yes") enabling translatable URLs
/// - `AUDIT_CUSTOM_PROVIDERS`: JSON object mapping provider names to dotted paths
/// - `AUDIT_LAUNCHER_SCRIPTS`: Comma separated launcher script names
/// - `AUDIT_DEBUG`: Optional flag to log every captured event at debug level
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether `i18n_url` returns translatable markers
    pub translate_urls: bool,

    /// Provider name to dotted path
    pub providers: BTreeMap<String, String>,

    /// Script names treated as a launcher in front of the real program
    pub launcher_scripts: Vec<String>,

    /// Whether debug logging is enabled (from env AUDIT_DEBUG)
    pub debug: bool,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Never panics. An unparseable provider mapping is ignored with a
    /// warning so the rest of the configuration still applies.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value the way `std::env::var` does
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let translate_urls = flag(lookup("AUDIT_TRANSLATE_URLS"));
        let debug = flag(lookup("AUDIT_DEBUG"));

        let providers = match lookup("AUDIT_CUSTOM_PROVIDERS") {
            Some(raw) => parse_providers(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "ignoring AUDIT_CUSTOM_PROVIDERS");
                BTreeMap::new()
            }),
            None => BTreeMap::new(),
        };

        let launcher_scripts = match lookup("AUDIT_LAUNCHER_SCRIPTS") {
            Some(raw) => parse_launchers(&raw),
            None => default_launchers(),
        };

        debug!(
            translate_urls,
            providers = providers.len(),
            launchers = ?launcher_scripts,
            "audit configuration loaded"
        );

        Self {
            translate_urls,
            providers,
            launcher_scripts,
            debug,
        }
    }

    /// Create configuration with explicit values (useful for testing)
    pub fn new() -> Self {
        Self {
            translate_urls: false,
            providers: BTreeMap::new(),
            launcher_scripts: default_launchers(),
            debug: false,
        }
    }

    pub fn with_translate_urls(mut self, enabled: bool) -> Self {
        self.translate_urls = enabled;
        self
    }

    pub fn with_provider(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.providers.insert(name.into(), path.into());
        self
    }

    pub fn with_launcher_scripts<I, S>(mut self, scripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.launcher_scripts = scripts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Wrap config in Arc for thread-safe sharing
    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn flag(value: Option<String>) -> bool {
    value.is_some_and(|val| matches!(val.to_lowercase().as_str(), "true" | "1" | "yes"))
}

fn default_launchers() -> Vec<String> {
    DEFAULT_LAUNCHER_SCRIPTS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Parse a JSON object of provider name to dotted path
pub fn parse_providers(raw: &str) -> Result<BTreeMap<String, String>, crate::error::AuditError> {
    Ok(serde_json::from_str(raw)?)
}

fn parse_launchers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_new_defaults() {
        let config = Config::new();

        assert!(!config.translate_urls);
        assert!(!config.debug);
        assert!(config.providers.is_empty());
        assert_eq!(config.launcher_scripts, vec!["manage.py".to_string()]);
    }

    #[test]
    fn test_config_builders() {
        let config = Config::new()
            .with_translate_urls(true)
            .with_provider("user", "audit.providers.user")
            .with_launcher_scripts(["run.sh", "manage.py"])
            .with_debug(true);

        assert!(config.translate_urls);
        assert!(config.debug);
        assert_eq!(
            config.providers.get("user").map(String::as_str),
            Some("audit.providers.user")
        );
        assert_eq!(config.launcher_scripts.len(), 2);
    }

    #[test]
    fn test_parse_providers() {
        let providers =
            parse_providers(r#"{"user": "audit.providers.user", "ip": "audit.providers.ip"}"#)
                .unwrap();
        assert_eq!(providers.len(), 2);
        assert_eq!(providers["ip"], "audit.providers.ip");
    }

    #[test]
    fn test_parse_providers_rejects_non_object() {
        assert!(parse_providers("[1, 2]").is_err());
        assert!(parse_providers("not json").is_err());
    }

    #[test]
    fn test_parse_launchers_skips_blanks() {
        assert_eq!(
            parse_launchers("manage.py, ,run-worker"),
            vec!["manage.py".to_string(), "run-worker".to_string()]
        );
    }

    #[test]
    fn test_config_into_arc() {
        let arc_config = Config::new().with_translate_urls(true).into_arc();
        assert!(arc_config.translate_urls);
    }

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_config_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("AUDIT_TRANSLATE_URLS", "yes"),
            ("AUDIT_DEBUG", "TRUE"),
            ("AUDIT_CUSTOM_PROVIDERS", r#"{"user": "audit.providers.user"}"#),
            ("AUDIT_LAUNCHER_SCRIPTS", "run.sh"),
        ]));

        assert!(config.translate_urls);
        assert!(config.debug);
        assert_eq!(config.providers["user"], "audit.providers.user");
        assert_eq!(config.launcher_scripts, vec!["run.sh".to_string()]);
    }

    #[test]
    fn test_config_from_lookup_falls_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("AUDIT_TRANSLATE_URLS", "maybe"),
            ("AUDIT_CUSTOM_PROVIDERS", "not json"),
        ]));

        assert!(!config.translate_urls);
        assert!(!config.debug);
        assert!(config.providers.is_empty());
        assert_eq!(config.launcher_scripts, vec!["manage.py".to_string()]);
    }
}
