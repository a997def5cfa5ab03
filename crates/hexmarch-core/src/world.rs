use hexmarch_protocol::Hex;
use tracing::debug;

use crate::cache::MoveCostCache;
use crate::executor::MovementEngine;
use crate::map::{GameMap, MapError, Tile};
use crate::rules::MovementRules;

/// Mutable movement state of one game: the map, its rules, and the edge cost cache.
///
/// All tile mutation goes through here so that cached costs never outlive the tiles
/// they were computed from.
#[derive(Clone, Debug)]
pub struct World {
    map: GameMap,
    rules: MovementRules,
    cache: MoveCostCache,
}

impl World {
    pub fn new(map: GameMap, rules: MovementRules) -> Self {
        Self {
            map,
            rules,
            cache: MoveCostCache::new(),
        }
    }

    pub fn map(&self) -> &GameMap {
        &self.map
    }

    pub fn rules(&self) -> &MovementRules {
        &self.rules
    }

    pub fn cache(&self) -> &MoveCostCache {
        &self.cache
    }

    pub fn engine(&mut self) -> MovementEngine<'_> {
        MovementEngine::new(&self.map, &self.rules, &mut self.cache)
    }

    /// Mutate one tile and drop every cached edge that touches it.
    pub fn update_tile<F>(&mut self, hex: Hex, update: F) -> Result<(), MapError>
    where
        F: FnOnce(&mut Tile),
    {
        let hex = self.map.normalize(hex).ok_or(MapError::OutOfBounds { hex })?;
        let tile = self.map.get_mut(hex).ok_or(MapError::OutOfBounds { hex })?;
        update(tile);
        self.cache.reset(Some(&[hex]));
        Ok(())
    }

    /// Drop cached edges touching `tiles` after an out-of-band change (e.g. a city founded).
    pub fn invalidate(&mut self, tiles: &[Hex]) -> usize {
        let tiles: Vec<Hex> = tiles.iter().filter_map(|&h| self.map.normalize(h)).collect();
        self.cache.reset(Some(&tiles))
    }

    pub fn start_turn(&mut self) {
        let purged = self.cache.reset(None);
        debug!(purged, "new turn");
    }

    pub fn regenerate(&mut self, map: GameMap) {
        self.map = map;
        let purged = self.cache.reset(None);
        debug!(
            width = self.map.width(),
            height = self.map.height(),
            purged,
            "map replaced"
        );
    }

    pub fn set_rules(&mut self, rules: MovementRules) {
        self.rules = rules;
        self.cache.reset(None);
    }
}
