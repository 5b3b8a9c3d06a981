//! Key sanitization and environment filtering for captured metadata
//!
//! Document stores reject field names containing `.` or `$`, and request
//! metadata tends to carry the whole process environment along with it.
//! Both are cleaned here before a mapping is handed to the audit sink.

use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;

/// Characters that may not appear in a stored key
const RESERVED_KEY_CHARS: &[char] = &['.', '$'];

/// Replace every reserved character in `key` with `_`
pub fn fix_key(key: &str) -> String {
    key.replace(RESERVED_KEY_CHARS, "_")
}

/// Rebuild a mapping with sanitized keys
///
/// Values are moved through untouched. Keys that only differ in reserved
/// characters (`a.b` and `a$b`) collapse into one entry, last one wins.
pub fn fix_dict<K, V, I>(mapping: I) -> BTreeMap<String, V>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
{
    mapping
        .into_iter()
        .map(|(key, value)| (fix_key(key.as_ref()), value))
        .collect()
}

/// Snapshot of the environment variable names of the current process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    keys: HashSet<String>,
}

impl EnvSnapshot {
    /// Capture the variable names of the running process
    ///
    /// Names that are not valid UTF-8 can never match a metadata key and
    /// are skipped.
    pub fn capture() -> Self {
        Self::from_vars(std::env::vars_os())
    }

    /// Build a snapshot from `(name, value)` pairs shaped like `vars_os`
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let keys = vars
            .into_iter()
            .filter_map(|(key, _)| key.into_string().ok())
            .collect();
        Self { keys }
    }

    /// Build a snapshot from explicit names
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Drop every metadata entry whose key is an environment variable name
pub fn filter_request_meta<V, I>(metadata: I, env: &EnvSnapshot) -> BTreeMap<String, V>
where
    I: IntoIterator<Item = (String, V)>,
{
    metadata
        .into_iter()
        .filter(|(key, _)| !env.contains(key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_key() {
        assert_eq!(fix_key("foo.bar"), "foo_bar");
        assert_eq!(fix_key("bar$foo"), "bar_foo");
        assert_eq!(fix_key("$a.b.c$"), "_a_b_c_");
        assert_eq!(fix_key("plain"), "plain");
    }

    #[test]
    fn test_fix_dict() {
        let initial = vec![("foo.bar", "foo"), ("bar$foo", "bar")];
        let fixed = fix_dict(initial);

        let mut expected = BTreeMap::new();
        expected.insert("foo_bar".to_string(), "foo");
        expected.insert("bar_foo".to_string(), "bar");
        assert_eq!(fixed, expected);
    }

    #[test]
    fn test_fix_dict_preserves_values_and_count() {
        let initial: BTreeMap<String, serde_json::Value> = [
            ("a.b".to_string(), serde_json::json!({"nested.key": 1})),
            ("c$d".to_string(), serde_json::json!([1, 2])),
            ("e".to_string(), serde_json::Value::Null),
        ]
        .into_iter()
        .collect();

        let fixed = fix_dict(initial.clone());

        assert_eq!(fixed.len(), initial.len());
        assert!(fixed.keys().all(|k| !k.contains('.') && !k.contains('$')));
        // Only keys are rewritten, nested values keep their keys
        assert_eq!(fixed["a_b"], serde_json::json!({"nested.key": 1}));
        assert_eq!(fixed["c_d"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_filter_request_meta() {
        let env = EnvSnapshot::from_keys(["test", "test2"]);
        let initial = vec![
            ("test".to_string(), 1),
            ("test2".to_string(), 2),
            ("test3".to_string(), 3),
        ];

        let filtered = filter_request_meta(initial, &env);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.get("test3"), Some(&3));
    }

    #[test]
    fn test_filter_request_meta_empty_env() {
        let env = EnvSnapshot::default();
        let filtered = filter_request_meta(vec![("PATH".to_string(), "x")], &env);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_env_snapshot_from_vars() {
        let env = EnvSnapshot::from_vars([
            (OsString::from("HOME"), OsString::from("/root")),
            (OsString::from("LANG"), OsString::from("C.UTF-8")),
        ]);

        assert_eq!(env.len(), 2);
        assert!(env.contains("HOME"));
        assert!(!env.contains("PATH_INFO"));
    }

    #[test]
    fn test_env_snapshot_capture() {
        let env = EnvSnapshot::capture();
        let names: Vec<String> = std::env::vars_os()
            .filter_map(|(key, _)| key.into_string().ok())
            .collect();

        assert!(names.iter().all(|name| env.contains(name)));
    }
}
