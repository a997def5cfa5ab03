use hexmarch_protocol::{Hex, MovementStopReason};
use tracing::trace;

use crate::cache::{CacheKey, MoveCostCache};
use crate::context::MovementContext;
use crate::cost::{context_allows, CostModel, MoveCost};
use crate::map::GameMap;
use crate::rules::MovementRules;
use crate::unit::{Mover, UnitProfile};

/// Turn accounting attached to a tile during execution or search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveState {
    pub turn: u32,
    pub moves_remaining: f32,
}

impl MoveState {
    pub fn new(turn: u32, moves_remaining: f32) -> Self {
        Self {
            turn,
            moves_remaining,
        }
    }
}

/// Result of taking one edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Advance {
    pub cost: MoveCost,
    pub state: MoveState,
    /// Move points actually consumed by the edge. A turn-ending edge spends whatever
    /// was left; an overshooting edge spends no more than was left.
    pub spent: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Queue drained with moves to spare.
    Completed,
    /// The turn is over: moves ran out or a step ended the turn.
    TurnEnded,
    /// Nothing was committed for the refused step; the caller should re-plan.
    Refused(MovementStopReason),
}

/// Movement queries over one world's map and rules, memoizing edge costs in `cache`.
pub struct MovementEngine<'a> {
    pub(crate) map: &'a GameMap,
    pub(crate) rules: &'a MovementRules,
    pub(crate) cache: &'a mut MoveCostCache,
}

impl<'a> MovementEngine<'a> {
    pub fn new(map: &'a GameMap, rules: &'a MovementRules, cache: &'a mut MoveCostCache) -> Self {
        Self { map, rules, cache }
    }

    pub fn map(&self) -> &GameMap {
        self.map
    }

    pub fn rules(&self) -> &MovementRules {
        self.rules
    }

    pub fn cache(&self) -> &MoveCostCache {
        &*self.cache
    }

    /// Cost of one edge through `ctx`. Context gates are never cached.
    pub fn cost(&mut self, unit: &UnitProfile, to: Hex, from: Hex, ctx: &MovementContext) -> MoveCost {
        self.cost_keyed(unit.fingerprint(), unit, to, from, ctx)
    }

    pub(crate) fn cost_keyed(
        &mut self,
        fingerprint: u64,
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
        let model = CostModel::new(self.map, self.rules);
        self.cache
            .get_or_insert_with(CacheKey::new(fingerprint, from, to), || {
                model.edge_cost(unit, to, from)
            })
    }

    /// Take the edge `from -> to` starting at `state`. An exhausted state rolls into the next
    /// turn first. `None` means the edge is illegal.
    pub fn advance(
        &mut self,
        unit: &UnitProfile,
        state: MoveState,
        to: Hex,
        from: Hex,
        ctx: &MovementContext,
    ) -> Option<Advance> {
        self.advance_keyed(unit.fingerprint(), unit, state, to, from, ctx)
    }

    pub(crate) fn advance_keyed(
        &mut self,
        fingerprint: u64,
        unit: &UnitProfile,
        state: MoveState,
        to: Hex,
        from: Hex,
        ctx: &MovementContext,
    ) -> Option<Advance> {
        let max_moves = unit.max_moves;
        if !max_moves.is_finite() || max_moves <= 0.0 {
            return None;
        }

        let state = if state.moves_remaining <= 0.0 {
            MoveState::new(state.turn + 1, max_moves)
        } else {
            MoveState::new(state.turn, state.moves_remaining.min(max_moves))
        };

        let cost = self.cost_keyed(fingerprint, unit, to, from, ctx);
        let (spent, remaining) = match cost {
            MoveCost::Blocked => return None,
            MoveCost::TurnEnding => (state.moves_remaining, 0.0),
            MoveCost::Cost(c) => (
                c.min(state.moves_remaining),
                (state.moves_remaining - c).max(0.0),
            ),
        };

        Some(Advance {
            cost,
            state: MoveState::new(state.turn, remaining),
            spent,
        })
    }

    /// Consume the mover's queued path against live `ctx`, one step at a time.
    pub fn walk(&mut self, mover: &mut Mover, ctx: &MovementContext) -> WalkOutcome {
        let profile = mover.profile().clone();
        let fingerprint = profile.fingerprint();

        loop {
            let Some(step) = mover.next_step().copied() else {
                return if mover.moves_left() > 0.0 {
                    WalkOutcome::Completed
                } else {
                    WalkOutcome::TurnEnded
                };
            };
            if mover.moves_left() <= 0.0 {
                return WalkOutcome::TurnEnded;
            }

            let from = mover.position();
            let to = self.map.normalize(step.tile).unwrap_or(step.tile);

            if !self.map.is_neighbor(from, to) {
                trace!(unit = ?mover.id(), %from, %to, "walk refused: step is not adjacent");
                return WalkOutcome::Refused(MovementStopReason::Impassable { attempted: to });
            }
            if ctx.has_friendly(to) && !self.can_clear_friendlies(fingerprint, &profile, mover, ctx) {
                trace!(unit = ?mover.id(), %from, %to, "walk refused: friendly unit in the way");
                return WalkOutcome::Refused(MovementStopReason::Blocked { attempted: to });
            }
            if self.enters_new_zoc(from, to, ctx) {
                trace!(unit = ?mover.id(), %from, %to, "walk refused: entering enemy zone of control");
                return WalkOutcome::Refused(MovementStopReason::EnteredEnemyZoc);
            }

            let state = MoveState::new(mover.turn(), mover.moves_left());
            let Some(advance) = self.advance_keyed(fingerprint, &profile, state, to, from, ctx) else {
                let reason = if ctx.has_enemy(to) {
                    MovementStopReason::Blocked { attempted: to }
                } else {
                    MovementStopReason::Impassable { attempted: to }
                };
                trace!(unit = ?mover.id(), %from, %to, ?reason, "walk refused");
                return WalkOutcome::Refused(reason);
            };

            mover.commit_step(to, advance.state.moves_remaining);
            trace!(
                unit = ?mover.id(),
                %from,
                %to,
                moves_left = mover.moves_left(),
                "walk step committed"
            );

            if advance.state.moves_remaining <= 0.0 {
                return WalkOutcome::TurnEnded;
            }
        }
    }

    /// True when entering `to` puts the mover next to a visible enemy it was not already next to.
    pub fn enters_new_zoc(&self, from: Hex, to: Hex, ctx: &MovementContext) -> bool {
        if ctx.ignore_zoc || ctx.is_embarked {
            return false;
        }
        let from = self.map.normalize(from).unwrap_or(from);
        let already: Vec<Hex> = self
            .map
            .neighbors(from)
            .filter(|n| ctx.has_visible_enemy(*n))
            .collect();
        self.map
            .neighbors(to)
            .filter(|n| ctx.has_visible_enemy(*n))
            .any(|enemy| !already.contains(&enemy))
    }

    /// Dry-run the queue: can the mover get past the friendly units ahead and land on a
    /// free tile before its moves run out this turn?
    fn can_clear_friendlies(
        &mut self,
        fingerprint: u64,
        profile: &UnitProfile,
        mover: &Mover,
        ctx: &MovementContext,
    ) -> bool {
        let mut from = mover.position();
        let mut state = MoveState::new(mover.turn(), mover.moves_left());

        for step in mover.queued() {
            if state.moves_remaining <= 0.0 {
                return false;
            }
            let to = self.map.normalize(step.tile).unwrap_or(step.tile);
            if !self.map.is_neighbor(from, to) || self.enters_new_zoc(from, to, ctx) {
                return false;
            }
            let Some(advance) = self.advance_keyed(fingerprint, profile, state, to, from, ctx) else {
                return false;
            };
            if !ctx.has_friendly(to) {
                return true;
            }
            from = to;
            state = advance.state;
        }
        false
    }
}
