use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Navigation key holding the 1-based page number.
pub const PAGE_KEY: &str = "page";

/// Page and query parameters for one list screen.
///
/// Absent parameters are represented by key absence, never by empty or
/// placeholder strings, so the serialized form is exactly what ends up in a
/// shareable URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    page: u32,
    params: BTreeMap<String, String>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            page: 1,
            params: BTreeMap::new(),
        }
    }
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        if key == PAGE_KEY {
            return None;
        }
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Builder-style setter, mainly for tests and fixtures.
    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.apply(&FilterPatch::new().set(key, value), false)
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Merge a patch into a copy of this state.
    ///
    /// Values that are missing or blank delete their key. When
    /// `reset_page` is set and the patch changes any non-page key without
    /// naming a page itself, the result starts over at page 1.
    pub fn apply(&self, patch: &FilterPatch, reset_page: bool) -> FilterState {
        let mut next = self.clone();

        for (key, value) in &patch.params {
            match value.as_deref().filter(|v| !v.trim().is_empty()) {
                Some(v) => {
                    next.params.insert(key.clone(), v.to_string());
                }
                None => {
                    next.params.remove(key);
                }
            }
        }

        match patch.page {
            Some(page) => next.page = page.max(1),
            None if reset_page && next.params != self.params => next.page = 1,
            None => {}
        }

        next
    }

    /// String pairs as written to navigation state. `page` is always present.
    pub fn to_pairs(&self) -> BTreeMap<String, String> {
        let mut pairs = self.params.clone();
        pairs.insert(PAGE_KEY.to_string(), self.page.to_string());
        pairs
    }

    /// Rebuild from navigation pairs. Blank values are dropped and a missing,
    /// zero or unparsable page falls back to 1.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut state = Self::default();
        for (key, value) in pairs {
            if key == PAGE_KEY {
                state.page = value.trim().parse::<u32>().ok().filter(|p| *p > 0).unwrap_or(1);
            } else if !value.trim().is_empty() {
                state.params.insert(key.clone(), value.clone());
            }
        }
        state
    }

    /// Keys whose value differs between `self` and `other`, including
    /// `page`. Keys absent on one side count as changed.
    pub fn changed_keys(&self, other: &FilterState) -> BTreeSet<String> {
        let mut changed: BTreeSet<String> = self
            .params
            .keys()
            .chain(other.params.keys())
            .filter(|key| self.params.get(*key) != other.params.get(*key))
            .cloned()
            .collect();
        if self.page != other.page {
            changed.insert(PAGE_KEY.to_string());
        }
        changed
    }
}

/// Partial update for a [`FilterState`]. `None` (or a blank value) removes
/// the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    page: Option<u32>,
    params: BTreeMap<String, Option<String>>,
}

impl FilterPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set a key. A `"page"` key is parsed into the page number.
    pub fn set(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_opt(key, Some(value))
    }

    pub fn clear(self, key: impl Into<String>) -> Self {
        self.set_opt(key, None::<String>)
    }

    pub fn set_opt(mut self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        let key = key.into();
        let value = value.map(Into::into);
        if key == PAGE_KEY {
            self.page = value.and_then(|v| v.trim().parse().ok());
        } else {
            self.params.insert(key, value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.page.is_none() && self.params.is_empty()
    }

    pub fn touches(&self, key: &str) -> bool {
        if key == PAGE_KEY {
            self.page.is_some()
        } else {
            self.params.contains_key(key)
        }
    }
}
