//! Storage key namespacing

use super::pattern;

/// Prefix used when none is configured
pub const DEFAULT_KEY_PREFIX: &str = "idscache";

/// Separator between the prefix and the logical key
pub const KEY_SEPARATOR: char = '_';

/// Derives the storage key for `key` under `prefix`.
///
/// A missing or empty prefix falls back to [`DEFAULT_KEY_PREFIX`].
pub fn namespace(prefix: Option<&str>, key: &str) -> String {
    let prefix = match prefix {
        Some(p) if !p.is_empty() => p,
        _ => DEFAULT_KEY_PREFIX,
    };

    format!("{}{}{}", prefix, KEY_SEPARATOR, key)
}

/// Maps logical cache keys onto one shared keyspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespacer {
    prefix: String,
}

impl Default for KeyNamespacer {
    fn default() -> Self {
        Self::new(None::<String>)
    }
}

impl KeyNamespacer {
    /// Creates a namespacer, substituting the default prefix when unset
    pub fn new(prefix: Option<impl Into<String>>) -> Self {
        let prefix = prefix
            .map(Into::into)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());

        Self { prefix }
    }

    /// Returns the effective prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the storage key for a logical key
    pub fn storage_key(&self, key: &str) -> String {
        namespace(Some(&self.prefix), key)
    }

    /// Namespaces every key of an iterator
    pub fn storage_keys<'a, I>(&self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter().map(|k| self.storage_key(k)).collect()
    }

    /// Recovers the logical key, or `None` if the key is outside this namespace.
    ///
    /// The separator may also appear inside prefixes, so namespace `ids` owns
    /// `ids_x_k` as logical key `x_k` even when it was written under `ids_x`.
    pub fn logical_key<'a>(&self, storage_key: &'a str) -> Option<&'a str> {
        storage_key
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix(KEY_SEPARATOR))
    }

    /// Namespaces a glob pattern; the prefix itself is matched literally
    pub fn pattern(&self, pattern: &str) -> String {
        format!("{}{}{}", pattern::escape(&self.prefix), KEY_SEPARATOR, pattern)
    }
}
