//! Ordered `KEY=VALUE` environment sets

use std::fmt;

/// An environment as an insertion-ordered list of `KEY=VALUE` entries
///
/// Writes go to the end and replace earlier entries with the same key, so
/// lookups always see the most recent value. An entry without `=` is a key
/// with an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSet {
    entries: Vec<String>,
}

fn split_entry(entry: &str) -> (&str, &str) {
    entry.split_once('=').unwrap_or((entry, ""))
}

impl EnvSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw entries, keeping duplicates until [`EnvSet::compact`]
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// The environment of the current process, compacted
    #[must_use]
    pub fn from_host() -> Self {
        let mut set = Self::from_entries(std::env::vars_os().map(|(key, value)| {
            format!("{}={}", key.to_string_lossy(), value.to_string_lossy())
        }));
        set.compact();
        set
    }

    /// Set `key` to `value`, dropping every earlier entry for `key`
    pub fn set(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> &mut Self {
        let key = key.as_ref();
        self.entries.retain(|entry| split_entry(entry).0 != key);
        self.entries.push(format!("{key}={}", value.as_ref()));
        self
    }

    /// [`EnvSet::set`] for each pair in order
    pub fn sets<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in pairs {
            self.set(key, value);
        }
        self
    }

    /// Remove every entry whose key is in `keys`
    pub fn del<S: AsRef<str>>(&mut self, keys: &[S]) -> &mut Self {
        self.entries.retain(|entry| {
            let key = split_entry(entry).0;
            !keys.iter().any(|k| k.as_ref() == key)
        });
        self
    }

    /// Position and value of the most recent entry for `key`
    #[must_use]
    pub fn find(&self, key: &str) -> Option<(usize, &str)> {
        self.entries
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, entry)| {
                let (k, v) = split_entry(entry);
                (k == key).then_some((index, v))
            })
    }

    /// Most recent value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.find(key).map(|(_, value)| value)
    }

    /// Drop every entry that is shadowed by a later entry with the same key
    ///
    /// Survivors keep the position of their last occurrence:
    /// `A=1 B=2 A=3` becomes `B=2 A=3`.
    pub fn compact(&mut self) -> &mut Self {
        let mut seen = std::collections::HashSet::new();
        let mut kept: Vec<String> = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..).rev() {
            if seen.insert(split_entry(&entry).0.to_string()) {
                kept.push(entry);
            }
        }
        kept.reverse();
        self.entries = kept;
        self
    }

    /// Raw `KEY=VALUE` entries in order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Entries split into key and value, in order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|entry| split_entry(entry))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for EnvSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entries.join(" "))
    }
}
