//! Persisted navigation state (the address bar of the admin console).

use log::{debug, warn};
use std::collections::BTreeMap;

/// Query-string backed navigation state.
///
/// Implementations store string pairs only; the reconciler guarantees that
/// absent filter values never reach this layer.
pub trait NavigationStore {
    /// Current pairs.
    fn read(&self) -> BTreeMap<String, String>;

    /// Record a new history entry.
    fn push(&mut self, pairs: BTreeMap<String, String>);

    /// Overwrite the current entry without adding history.
    fn replace(&mut self, pairs: BTreeMap<String, String>);
}

/// Serialize pairs as `k=v&k=v`, keys in sorted order, percent-encoded.
pub fn to_query_string(pairs: &BTreeMap<String, String>) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Parse a query string, tolerating a leading `?`, `+` for spaces and
/// bare keys. Pairs that are not valid UTF-8 after decoding are skipped.
pub fn parse_query_string(query: &str) -> BTreeMap<String, String> {
    let mut pairs = BTreeMap::new();
    for part in query.trim_start_matches('?').split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = part.split_once('=').unwrap_or((part, ""));
        let key = urlencoding::decode(&raw_key.replace('+', " ")).map(|k| k.into_owned());
        let value = urlencoding::decode(&raw_value.replace('+', " ")).map(|v| v.into_owned());
        match (key, value) {
            (Ok(key), Ok(value)) => {
                pairs.insert(key, value);
            }
            _ => warn!("Skipping undecodable query pair: {}", part),
        }
    }
    pairs
}

/// In-memory browser-style history with back/forward.
#[derive(Debug, Clone)]
pub struct MemoryNavigation {
    entries: Vec<BTreeMap<String, String>>,
    cursor: usize,
    writes: usize,
}

impl Default for MemoryNavigation {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNavigation {
    pub fn new() -> Self {
        Self {
            entries: vec![BTreeMap::new()],
            cursor: 0,
            writes: 0,
        }
    }

    /// Start from a deep link such as `?status=approved&page=2`.
    pub fn from_query(query: &str) -> Self {
        Self {
            entries: vec![parse_query_string(query)],
            cursor: 0,
            writes: 0,
        }
    }

    /// Step back in history. Returns false at the oldest entry.
    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        debug!("navigation: back to entry {}", self.cursor);
        true
    }

    /// Step forward in history. Returns false at the newest entry.
    pub fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        debug!("navigation: forward to entry {}", self.cursor);
        true
    }

    pub fn query_string(&self) -> String {
        to_query_string(&self.entries[self.cursor])
    }

    /// Number of push/replace calls, for asserting single writes.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn history_len(&self) -> usize {
        self.entries.len()
    }
}

impl NavigationStore for MemoryNavigation {
    fn read(&self) -> BTreeMap<String, String> {
        self.entries[self.cursor].clone()
    }

    fn push(&mut self, pairs: BTreeMap<String, String>) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(pairs);
        self.cursor = self.entries.len() - 1;
        self.writes += 1;
        debug!("navigation: pushed ?{}", self.query_string());
    }

    fn replace(&mut self, pairs: BTreeMap<String, String>) {
        self.entries[self.cursor] = pairs;
        self.writes += 1;
        debug!("navigation: replaced with ?{}", self.query_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> BTreeMap<String, String> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_query_string_encoding() {
        let query = to_query_string(&pairs(&[("search", "amoxicillin 500mg"), ("page", "2")]));
        assert_eq!(query, "page=2&search=amoxicillin%20500mg");
        assert_eq!(parse_query_string(&query), pairs(&[("page", "2"), ("search", "amoxicillin 500mg")]));
    }

    #[test]
    fn test_parse_tolerates_browser_forms() {
        let parsed = parse_query_string("?status=in+transit&flag&&page=3");
        assert_eq!(parsed, pairs(&[("flag", ""), ("page", "3"), ("status", "in transit")]));
    }

    #[test]
    fn test_history_back_and_forward() {
        let mut nav = MemoryNavigation::from_query("page=1");
        nav.push(pairs(&[("page", "2")]));
        nav.push(pairs(&[("page", "3")]));

        assert!(nav.back());
        assert_eq!(nav.read(), pairs(&[("page", "2")]));
        assert!(nav.forward());
        assert!(!nav.forward());

        nav.back();
        nav.back();
        assert!(!nav.back());
        nav.push(pairs(&[("page", "9")]));
        assert_eq!(nav.history_len(), 2);
        assert_eq!(nav.write_count(), 3);
    }
}
