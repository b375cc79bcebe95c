//! Entry map and tag index.

use super::flight::Flight;
use crate::ErasedValue;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::Instant;

/// A stored result. Never mutated after insertion.
pub(crate) struct CacheEntry {
    pub value: ErasedValue,
    pub created_at: Instant,
    pub expires_at: Instant,
    pub tags: HashSet<String>,
}

impl CacheEntry {
    /// Entries are visible from creation until `expires_at`, exclusive.
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Cache bookkeeping guarded by a single mutex.
///
/// The tag index only ever names keys present in `entries`.
#[derive(Default)]
pub(crate) struct CacheState {
    pub entries: HashMap<String, CacheEntry>,
    pub tag_index: HashMap<String, HashSet<String>>,
    pub in_flight: HashMap<String, Flight>,
    pub next_generation: u64,
}

/// Outcome of a lookup.
pub(crate) enum Lookup {
    Hit { value: ErasedValue, age: Duration },
    Expired,
    Miss,
}

impl CacheState {
    /// Find a live entry; expired entries are removed on the way.
    pub fn lookup(&mut self, key: &str, now: Instant) -> Lookup {
        let Some(entry) = self.entries.get(key) else {
            return Lookup::Miss;
        };
        if entry.is_live(now) {
            return Lookup::Hit {
                value: entry.value.clone(),
                age: now.duration_since(entry.created_at),
            };
        }
        self.remove(key);
        Lookup::Expired
    }

    /// Insert an entry, replacing (delete + insert) any previous one.
    pub fn insert(&mut self, key: String, entry: CacheEntry) {
        self.remove(&key);
        for tag in &entry.tags {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        self.entries.insert(key, entry);
    }

    /// Remove an entry and unindex its tags.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        for tag in &entry.tags {
            if let Some(keys) = self.tag_index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        Some(entry)
    }

    /// Remove every entry carrying any of `tags`. Returns the number removed.
    pub fn remove_tagged(&mut self, tags: &[String]) -> usize {
        let keys: HashSet<String> = tags
            .iter()
            .filter_map(|tag| self.tag_index.get(tag))
            .flat_map(|keys| keys.iter().cloned())
            .collect();

        keys.iter().filter(|key| self.remove(key).is_some()).count()
    }

    /// Mark the running computation for `key`, if any, as stale.
    pub fn mark_flight_stale(&mut self, key: &str) -> bool {
        match self.in_flight.get_mut(key) {
            Some(flight) => {
                flight.stale = true;
                true
            }
            None => false,
        }
    }

    /// Mark running computations carrying any of `tags` as stale.
    pub fn mark_tagged_flights_stale(&mut self, tags: &[String]) -> usize {
        let mut marked = 0;
        for flight in self.in_flight.values_mut() {
            if tags.iter().any(|tag| flight.tags.contains(tag)) {
                flight.stale = true;
                marked += 1;
            }
        }
        marked
    }

    /// Remove all expired entries. Returns the number removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    pub fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn entry(value: u32, ttl: Duration, tags: &[&str]) -> CacheEntry {
        let now = Instant::now();
        CacheEntry {
            value: Arc::new(value),
            created_at: now,
            expires_at: now + ttl,
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    #[test]
    fn test_insert_indexes_tags() {
        let mut state = CacheState::default();
        state.insert("a".into(), entry(1, Duration::from_secs(60), &["player:1", "spin"]));
        state.insert("b".into(), entry(2, Duration::from_secs(60), &["spin"]));

        assert_eq!(state.tag_index["spin"].len(), 2);
        assert_eq!(state.tag_index["player:1"].len(), 1);
    }

    #[test]
    fn test_replace_reindexes_tags() {
        let mut state = CacheState::default();
        state.insert("a".into(), entry(1, Duration::from_secs(60), &["old"]));
        state.insert("a".into(), entry(2, Duration::from_secs(60), &["new"]));

        assert!(!state.tag_index.contains_key("old"));
        assert!(state.tag_index["new"].contains("a"));
        assert_eq!(state.entries.len(), 1);
    }

    #[test]
    fn test_remove_prunes_empty_tags() {
        let mut state = CacheState::default();
        state.insert("a".into(), entry(1, Duration::from_secs(60), &["spin"]));
        assert!(state.remove("a").is_some());
        assert!(state.tag_index.is_empty());
        assert!(state.remove("a").is_none());
    }

    #[test]
    fn test_remove_tagged() {
        let mut state = CacheState::default();
        state.insert("a".into(), entry(1, Duration::from_secs(60), &["spin", "player:1"]));
        state.insert("b".into(), entry(2, Duration::from_secs(60), &["collect"]));
        state.insert("c".into(), entry(3, Duration::from_secs(60), &["player:1"]));

        let removed = state.remove_tagged(&["player:1".to_string(), "missing".to_string()]);
        assert_eq!(removed, 2);
        assert!(state.entries.contains_key("b"));
        assert!(!state.tag_index.contains_key("spin"));
        assert!(!state.tag_index.contains_key("player:1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_removes_expired() {
        let mut state = CacheState::default();
        state.insert("a".into(), entry(1, Duration::from_secs(1), &["spin"]));

        assert!(matches!(state.lookup("a", Instant::now()), Lookup::Hit { .. }));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(matches!(state.lookup("a", Instant::now()), Lookup::Expired));
        assert!(state.entries.is_empty());
        assert!(state.tag_index.is_empty());
        assert!(matches!(state.lookup("a", Instant::now()), Lookup::Miss));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let mut state = CacheState::default();
        state.insert("short".into(), entry(1, Duration::from_secs(1), &[]));
        state.insert("long".into(), entry(2, Duration::from_secs(60), &[]));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(state.purge_expired(Instant::now()), 1);
        assert!(state.entries.contains_key("long"));
    }
}
