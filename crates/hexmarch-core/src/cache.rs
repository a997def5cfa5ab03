use std::collections::{HashMap, HashSet};

use hexmarch_protocol::Hex;
use tracing::debug;

use crate::cost::MoveCost;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub fingerprint: u64,
    pub from: Hex,
    pub to: Hex,
}

impl CacheKey {
    pub fn new(fingerprint: u64, from: Hex, to: Hex) -> Self {
        Self {
            fingerprint,
            from,
            to,
        }
    }

    fn touches(&self, tiles: &HashSet<Hex>) -> bool {
        tiles.contains(&self.from) || tiles.contains(&self.to)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Memoized context-independent edge costs, shared by every unit of one world.
///
/// A cached `MoveCost::Blocked` is a real answer; a missing entry means "not computed yet".
#[derive(Clone, Debug, Default)]
pub struct MoveCostCache {
    entries: HashMap<CacheKey, MoveCost>,
    hits: u64,
    misses: u64,
}

impl MoveCostCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<MoveCost> {
        self.entries.get(key).copied()
    }

    pub fn set(&mut self, key: CacheKey, cost: MoveCost) {
        self.entries.insert(key, cost);
    }

    pub fn get_or_insert_with(&mut self, key: CacheKey, compute: impl FnOnce() -> MoveCost) -> MoveCost {
        if let Some(cost) = self.entries.get(&key) {
            self.hits += 1;
            return *cost;
        }
        self.misses += 1;
        let cost = compute();
        self.entries.insert(key, cost);
        cost
    }

    /// Purge entries whose `from` or `to` is one of `tiles` (across all fingerprints),
    /// or everything when `tiles` is `None`. Returns the number of purged entries.
    pub fn reset(&mut self, tiles: Option<&[Hex]>) -> usize {
        let before = self.entries.len();
        match tiles {
            None => {
                self.entries.clear();
                debug!(purged = before, "move cost cache cleared");
            }
            Some(tiles) => {
                let tiles: HashSet<Hex> = tiles.iter().copied().collect();
                self.entries.retain(|key, _| !key.touches(&tiles));
                debug!(
                    tiles = tiles.len(),
                    purged = before - self.entries.len(),
                    "move cost cache invalidated"
                );
            }
        }
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(fp: u64, from: (i32, i32), to: (i32, i32)) -> CacheKey {
        CacheKey::new(fp, Hex::new(from.0, from.1), Hex::new(to.0, to.1))
    }

    #[test]
    fn cached_blocked_is_distinct_from_missing() {
        let mut cache = MoveCostCache::new();
        let k = key(1, (0, 0), (1, 0));
        assert_eq!(cache.get(&k), None);
        cache.set(k, MoveCost::Blocked);
        assert_eq!(cache.get(&k), Some(MoveCost::Blocked));
    }

    #[test]
    fn reset_purges_only_touching_entries_across_fingerprints() {
        let mut cache = MoveCostCache::new();
        cache.set(key(1, (0, 0), (1, 0)), MoveCost::Cost(1.0));
        cache.set(key(2, (1, 0), (2, 0)), MoveCost::TurnEnding);
        cache.set(key(1, (2, 0), (3, 0)), MoveCost::Cost(2.0));
        cache.set(key(3, (5, 5), (5, 4)), MoveCost::Blocked);

        let purged = cache.reset(Some(&[Hex::new(1, 0)]));
        assert_eq!(purged, 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key(1, (2, 0), (3, 0))), Some(MoveCost::Cost(2.0)));
        assert_eq!(cache.get(&key(3, (5, 5), (5, 4))), Some(MoveCost::Blocked));

        assert_eq!(cache.reset(None), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn get_or_insert_with_counts_hits_and_misses() {
        let mut cache = MoveCostCache::new();
        let k = key(9, (3, 3), (4, 3));
        let mut calls = 0;
        for _ in 0..3 {
            let cost = cache.get_or_insert_with(k, || {
                calls += 1;
                MoveCost::Cost(2.0)
            });
            assert_eq!(cost, MoveCost::Cost(2.0));
        }
        assert_eq!(calls, 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 2,
                misses: 1,
                entries: 1
            }
        );
    }
}
