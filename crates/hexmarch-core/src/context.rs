use std::collections::HashSet;

use hexmarch_protocol::Hex;

use crate::map::GameMap;

/// Per-query view of the world from the mover's side. Built fresh for each query.
///
/// Tiles are expected in normalized form (`GameMap::normalize`).
#[derive(Clone, Debug, Default)]
pub struct MovementContext {
    pub known: HashSet<Hex>,
    pub visible: HashSet<Hex>,
    pub can_enter_unknown_this_turn: bool,
    pub friendly_units: HashSet<Hex>,
    pub enemy_units: HashSet<Hex>,
    pub is_embarked: bool,
    pub ignore_zoc: bool,
}

impl MovementContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tile of `map` is known and visible.
    pub fn omniscient(map: &GameMap) -> Self {
        let all: HashSet<Hex> = (0..map.len()).filter_map(|i| map.hex_at_index(i)).collect();
        Self {
            known: all.clone(),
            visible: all,
            ..Self::default()
        }
    }

    pub fn with_known<I: IntoIterator<Item = Hex>>(mut self, tiles: I) -> Self {
        self.known.extend(tiles);
        self
    }

    pub fn with_visible<I: IntoIterator<Item = Hex>>(mut self, tiles: I) -> Self {
        self.visible.extend(tiles);
        self
    }

    pub fn with_friendly<I: IntoIterator<Item = Hex>>(mut self, tiles: I) -> Self {
        self.friendly_units.extend(tiles);
        self
    }

    pub fn with_enemies<I: IntoIterator<Item = Hex>>(mut self, tiles: I) -> Self {
        self.enemy_units.extend(tiles);
        self
    }

    pub fn explore_unknown(mut self, allowed: bool) -> Self {
        self.can_enter_unknown_this_turn = allowed;
        self
    }

    pub fn embarked(mut self, embarked: bool) -> Self {
        self.is_embarked = embarked;
        self
    }

    pub fn ignoring_zoc(mut self, ignore: bool) -> Self {
        self.ignore_zoc = ignore;
        self
    }

    pub fn is_known(&self, hex: Hex) -> bool {
        self.known.contains(&hex)
    }

    pub fn has_enemy(&self, hex: Hex) -> bool {
        self.enemy_units.contains(&hex)
    }

    pub fn has_friendly(&self, hex: Hex) -> bool {
        self.friendly_units.contains(&hex)
    }

    /// Enemies that exert zone of control: only those the mover can see.
    pub fn has_visible_enemy(&self, hex: Hex) -> bool {
        self.enemy_units.contains(&hex) && self.visible.contains(&hex)
    }
}
