//! Tag Index Module
//!
//! Reverse index from tag to the keys carrying it, so group invalidation
//! does not need to scan every entry.

use std::collections::{BTreeMap, HashMap, HashSet};

// == Tag Index ==
/// Tracks which keys carry which tags.
///
/// Must be kept in lockstep with the entry map: every insert, overwrite and
/// removal of an entry goes through `attach`/`detach`.
#[derive(Debug, Default)]
pub struct TagIndex {
    keys_by_tag: HashMap<String, HashSet<String>>,
}

impl TagIndex {
    // == Constructor ==
    /// Creates a new empty tag index.
    pub fn new() -> Self {
        Self::default()
    }

    // == Attach ==
    /// Records that `key` carries each of `tags`.
    pub fn attach<'a>(&mut self, key: &str, tags: impl IntoIterator<Item = &'a String>) {
        for tag in tags {
            self.keys_by_tag
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
    }

    // == Detach ==
    /// Forgets that `key` carries each of `tags`, dropping tags left with no keys.
    pub fn detach<'a>(&mut self, key: &str, tags: impl IntoIterator<Item = &'a String>) {
        for tag in tags {
            if let Some(keys) = self.keys_by_tag.get_mut(tag.as_str()) {
                keys.remove(key);
                if keys.is_empty() {
                    self.keys_by_tag.remove(tag.as_str());
                }
            }
        }
    }

    // == Keys For Tag ==
    /// Returns the keys currently carrying `tag`.
    pub fn keys(&self, tag: &str) -> Vec<String> {
        self.keys_by_tag
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    // == Counts ==
    /// Returns the number of keys per tag.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.keys_by_tag
            .iter()
            .map(|(tag, keys)| (tag.clone(), keys.len()))
            .collect()
    }

    /// Returns the number of keys carrying `tag`.
    pub fn count(&self, tag: &str) -> usize {
        self.keys_by_tag.get(tag).map_or(0, HashSet::len)
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.keys_by_tag.clear();
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.keys_by_tag.is_empty()
    }
}
