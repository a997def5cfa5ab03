use std::cmp::Ordering;

use hexmarch_protocol::Hex;

use crate::context::MovementContext;
use crate::map::{Domain, GameMap, Tile};
use crate::rules::MovementRules;
use crate::unit::{Platform, Special, UnitProfile};

/// Outcome of costing one edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MoveCost {
    /// Illegal under current knowledge or capabilities; excluded from search.
    Blocked,
    /// Legal, but always consumes the rest of the acting turn.
    TurnEnding,
    /// Legal with a non-negative, finite cost in move points.
    Cost(f32),
}

impl MoveCost {
    pub fn is_blocked(self) -> bool {
        matches!(self, MoveCost::Blocked)
    }

    pub fn is_turn_ending(self) -> bool {
        matches!(self, MoveCost::TurnEnding)
    }

    pub fn value(self) -> Option<f32> {
        match self {
            MoveCost::Cost(v) => Some(v),
            _ => None,
        }
    }

    /// Ranking used when the same tile is reached over several edges:
    /// any numeric cost (lower first), then turn-ending, then blocked.
    pub fn preference(self, other: MoveCost) -> Ordering {
        match (self, other) {
            (MoveCost::Cost(a), MoveCost::Cost(b)) => a.total_cmp(&b),
            (MoveCost::Cost(_), _) => Ordering::Less,
            (_, MoveCost::Cost(_)) => Ordering::Greater,
            (MoveCost::TurnEnding, MoveCost::TurnEnding) => Ordering::Equal,
            (MoveCost::TurnEnding, MoveCost::Blocked) => Ordering::Less,
            (MoveCost::Blocked, MoveCost::TurnEnding) => Ordering::Greater,
            (MoveCost::Blocked, MoveCost::Blocked) => Ordering::Equal,
        }
    }
}

/// Checks that depend on the querying side's view of the world. They are applied
/// before any cached edge cost is consulted.
pub fn context_allows(to: Hex, ctx: &MovementContext) -> bool {
    if !ctx.is_known(to) && !ctx.can_enter_unknown_this_turn {
        return false;
    }
    !ctx.has_enemy(to)
}

/// Pure edge costing over map data and the rules table.
#[derive(Clone, Copy, Debug)]
pub struct CostModel<'a> {
    map: &'a GameMap,
    rules: &'a MovementRules,
}

impl<'a> CostModel<'a> {
    pub fn new(map: &'a GameMap, rules: &'a MovementRules) -> Self {
        Self { map, rules }
    }

    /// Full cost of moving `unit` from `from` into `to` as seen through `ctx`.
    pub fn cost(
        &self,
        unit: &UnitProfile,
        to: Hex,
        from: Hex,
        ctx: &MovementContext,
    ) -> MoveCost {
        let (Some(to), Some(from)) = (self.map.normalize(to), self.map.normalize(from)) else {
            return MoveCost::Blocked;
        };
        if !context_allows(to, ctx) {
            return MoveCost::Blocked;
        }
        self.edge_cost(unit, to, from)
    }

    /// Context-independent part of the cost: mobility, domain, permissions and terrain.
    /// A function of `(unit capabilities, from, to)` only, so it is safe to cache.
    pub fn edge_cost(&self, unit: &UnitProfile, to: Hex, from: Hex) -> MoveCost {
        if !unit.platform.is_mobile() {
            return MoveCost::Blocked;
        }
        let (Some(to_tile), Some(from_tile)) = (self.map.get(to), self.map.get(from)) else {
            return MoveCost::Blocked;
        };

        let classified = match unit.platform {
            Platform::Water => self.naval_cost(to_tile, from_tile),
            _ => self.land_cost(unit, to_tile, from_tile),
        };
        if classified.is_blocked() || !self.permitted(unit, to_tile) {
            return MoveCost::Blocked;
        }
        classified
    }

    fn permitted(&self, unit: &UnitProfile, to: &Tile) -> bool {
        let terrain = self.rules.terrain(to.terrain).requires;
        let elevation = self.rules.elevation(to.elevation).requires;
        [terrain, elevation]
            .into_iter()
            .flatten()
            .all(|special| unit.has(special))
    }

    fn naval_cost(&self, to: &Tile, from: &Tile) -> MoveCost {
        match (from.domain(), to.domain()) {
            (Domain::Water, Domain::Water) => MoveCost::Cost(self.rules.naval_cost),
            (Domain::Land, Domain::Water) => MoveCost::TurnEnding,
            (_, Domain::Land) if !to.is_port() => MoveCost::Blocked,
            (Domain::Water, Domain::Land) => MoveCost::TurnEnding,
            (Domain::Land, Domain::Land) => MoveCost::Cost(self.rules.naval_cost),
        }
    }

    fn land_cost(&self, unit: &UnitProfile, to: &Tile, from: &Tile) -> MoveCost {
        match (from.domain(), to.domain()) {
            (_, Domain::Water) if !unit.has(Special::Embark) => MoveCost::Blocked,
            (Domain::Land, Domain::Water) => MoveCost::TurnEnding,
            (Domain::Water, Domain::Water) => MoveCost::Cost(self.rules.naval_cost),
            (Domain::Water, Domain::Land) => MoveCost::TurnEnding,
            (Domain::Land, Domain::Land) => self.overland_cost(to, from),
        }
    }

    fn overland_cost(&self, to: &Tile, from: &Tile) -> MoveCost {
        let mut cost = self.rules.base_cost;
        cost += self.rules.terrain(to.terrain).extra_cost;
        cost += self.rules.elevation(to.elevation).extra_cost;

        let mut ends_turn = false;
        if let Some(feature) = to.feature {
            let rule = self.rules.feature(feature);
            cost += rule.cost;
            ends_turn |= rule.ends_turn;
        }

        // Fording: stepping onto a river from dry ground.
        if to.river.is_some() && from.river.is_none() {
            ends_turn = true;
        }

        if ends_turn {
            MoveCost::TurnEnding
        } else {
            MoveCost::Cost(cost.max(0.0))
        }
    }
}
