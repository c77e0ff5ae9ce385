//! In-process store
//!
//! Each operation takes the lock once, so multi-field counter updates are
//! atomic with respect to concurrent readers.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{CounterStore, ScoredSetStore};
use crate::error::Result;

/// One sorted set: ordered by (score, member), plus a member -> score index
#[derive(Debug, Default)]
struct ScoredSet {
    ordered: BTreeSet<(i64, String)>,
    scores: HashMap<String, i64>,
}

impl ScoredSet {
    fn add(&mut self, score: i64, member: &str) {
        if let Some(old) = self.scores.insert(member.to_string(), score) {
            self.ordered.remove(&(old, member.to_string()));
        }
        self.ordered.insert((score, member.to_string()));
    }

    fn count_between(&self, min: i64, max: i64) -> u64 {
        if min > max {
            return 0;
        }
        let lower = Bound::Included((min, String::new()));
        self.ordered
            .range((lower, Bound::Unbounded))
            .take_while(|(score, _)| *score <= max)
            .count() as u64
    }

    fn remove_below(&mut self, floor: i64) -> u64 {
        let keep = self.ordered.split_off(&(floor, String::new()));
        let removed = std::mem::replace(&mut self.ordered, keep);
        for (_, member) in &removed {
            self.scores.remove(member);
        }
        removed.len() as u64
    }
}

/// Memory-backed store
#[derive(Clone, Default)]
pub struct MemoryStore {
    sets: Arc<RwLock<HashMap<String, ScoredSet>>>,
    counters: Arc<RwLock<HashMap<String, HashMap<String, i64>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScoredSetStore for MemoryStore {
    async fn add(&self, key: &str, score: i64, member: &str) -> Result<()> {
        let mut sets = self.sets.write().await;
        sets.entry(key.to_string()).or_default().add(score, member);
        Ok(())
    }

    async fn count_between(&self, key: &str, min: i64, max: i64) -> Result<u64> {
        let sets = self.sets.read().await;
        Ok(sets
            .get(key)
            .map(|set| set.count_between(min, max))
            .unwrap_or(0))
    }

    async fn remove_below(&self, key: &str, floor: i64) -> Result<u64> {
        let mut sets = self.sets.write().await;
        Ok(sets
            .get_mut(key)
            .map(|set| set.remove_below(floor))
            .unwrap_or(0))
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn increment(&self, key: &str, fields: &[&str]) -> Result<()> {
        let mut counters = self.counters.write().await;
        let hash = counters.entry(key.to_string()).or_default();
        for field in fields {
            *hash.entry((*field).to_string()).or_insert(0) += 1;
        }
        Ok(())
    }

    async fn get_all(&self, key: &str) -> Result<HashMap<String, i64>> {
        let counters = self.counters.read().await;
        Ok(counters.get(key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_count_between_is_inclusive() {
        let store = MemoryStore::new();
        store.add("sends", 100, "a").await.unwrap();
        store.add("sends", 150, "b").await.unwrap();
        store.add("sends", 200, "c").await.unwrap();

        assert_eq!(store.count_between("sends", 100, 200).await.unwrap(), 3);
        assert_eq!(store.count_between("sends", 101, 199).await.unwrap(), 1);
        assert_eq!(store.count_between("sends", 200, 200).await.unwrap(), 1);
        assert_eq!(store.count_between("sends", 201, 100).await.unwrap(), 0);
        assert_eq!(store.count_between("missing", 0, 1000).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_replaces_score() {
        let store = MemoryStore::new();
        store.add("sends", 100, "a").await.unwrap();
        store.add("sends", 300, "a").await.unwrap();

        assert_eq!(store.count_between("sends", 0, 1000).await.unwrap(), 1);
        assert_eq!(store.count_between("sends", 0, 200).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_below_is_strict() {
        let store = MemoryStore::new();
        store.add("sends", 99, "old").await.unwrap();
        store.add("sends", 100, "edge").await.unwrap();
        store.add("sends", 101, "new").await.unwrap();

        assert_eq!(store.remove_below("sends", 100).await.unwrap(), 1);
        assert_eq!(store.count_between("sends", i64::MIN, i64::MAX).await.unwrap(), 2);
        assert_eq!(store.remove_below("sends", 100).await.unwrap(), 0);

        // re-adding a removed member works
        store.add("sends", 150, "old").await.unwrap();
        assert_eq!(store.count_between("sends", 0, 1000).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_counters() {
        let store = MemoryStore::new();
        assert!(store.get_all("stats").await.unwrap().is_empty());

        store.increment("stats", &["total", "ok"]).await.unwrap();
        store.increment("stats", &["total", "errors:X"]).await.unwrap();

        let all = store.get_all("stats").await.unwrap();
        assert_eq!(all.get("total"), Some(&2));
        assert_eq!(all.get("ok"), Some(&1));
        assert_eq!(all.get("errors:X"), Some(&1));
        assert_eq!(all.len(), 3);
    }
}
