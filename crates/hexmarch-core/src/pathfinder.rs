use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use hexmarch_protocol::{Hex, MovementStopReason, PathPreview, PathStep};
use ordered_float::OrderedFloat;
use tracing::{debug, warn};

use crate::context::MovementContext;
use crate::cost::MoveCost;
use crate::executor::{MoveState, MovementEngine, WalkOutcome};
use crate::unit::Mover;

/// One tile of a movement-range query with the raw cost of the best edge into it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeEntry {
    pub tile: Hex,
    pub cost: MoveCost,
}

#[derive(Debug)]
struct OpenNode {
    f: OrderedFloat<f32>,
    g: OrderedFloat<f32>,
    tie: u64,
    node: usize,
}

impl OpenNode {
    fn key(&self) -> (OrderedFloat<f32>, OrderedFloat<f32>, u64) {
        (self.f, self.g, self.tie)
    }
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap behave like a min-heap.
        other.key().cmp(&self.key())
    }
}

#[derive(Clone, Copy, Debug)]
struct SearchNode {
    tile: Hex,
    state: MoveState,
    g: f32,
    parent: Option<usize>,
}

impl MovementEngine<'_> {
    /// Plan a route from the mover's tile to `target`.
    ///
    /// `g` is the move budget consumed so far; each edge adds what it actually spent.
    /// The closed set is keyed by tile alone: for a fixed per-turn maximum the turn count
    /// grows with consumed budget, so the cheapest arrival is also the earliest.
    /// Returns an empty path when `target` is the start tile or cannot be reached.
    pub fn find_path(&mut self, mover: &Mover, target: Hex, ctx: &MovementContext) -> Vec<PathStep> {
        let map = self.map;
        let (Some(start), Some(target)) = (map.normalize(mover.position()), map.normalize(target))
        else {
            return Vec::new();
        };
        if start == target || ctx.has_friendly(target) {
            return Vec::new();
        }

        let profile = mover.profile();
        let fingerprint = profile.fingerprint();
        let max_turns = self.rules.max_turns;
        let scale = self.rules.cheapest_step().min(1.0);
        let heuristic = |hex: Hex| map.hex_distance(hex, target) as f32 * scale;

        let mut nodes = vec![SearchNode {
            tile: start,
            state: MoveState::new(0, mover.moves_left()),
            g: 0.0,
            parent: None,
        }];
        let mut best: HashMap<Hex, f32> = HashMap::from([(start, 0.0)]);
        let mut open = BinaryHeap::new();
        let mut tie: u64 = 0;
        open.push(OpenNode {
            f: OrderedFloat(heuristic(start)),
            g: OrderedFloat(0.0),
            tie,
            node: 0,
        });
        tie += 1;

        let mut expanded = 0_usize;
        let mut hit_horizon = false;

        while let Some(entry) = open.pop() {
            let current = nodes[entry.node];
            if best.get(&current.tile).is_some_and(|&g| current.g > g) {
                // Stale heap entry.
                continue;
            }
            if current.tile == target {
                let path = reconstruct(&nodes, entry.node);
                debug!(
                    unit = ?mover.id(),
                    %start,
                    %target,
                    steps = path.len(),
                    turns = path.last().map(|s| s.turn).unwrap_or(0),
                    expanded,
                    "path found"
                );
                return path;
            }
            if current.state.turn >= max_turns {
                hit_horizon = true;
                continue;
            }
            expanded += 1;

            for neighbor in map.neighbors(current.tile) {
                let Some(advance) = self.advance_keyed(
                    fingerprint,
                    profile,
                    current.state,
                    neighbor,
                    current.tile,
                    ctx,
                ) else {
                    continue;
                };
                let g = current.g + advance.spent;
                if best.get(&neighbor).is_some_and(|&b| b <= g) {
                    continue;
                }
                best.insert(neighbor, g);
                nodes.push(SearchNode {
                    tile: neighbor,
                    state: advance.state,
                    g,
                    parent: Some(entry.node),
                });
                open.push(OpenNode {
                    f: OrderedFloat(g + heuristic(neighbor)),
                    g: OrderedFloat(g),
                    tie,
                    node: nodes.len() - 1,
                });
                tie += 1;
            }
        }

        if hit_horizon {
            warn!(
                unit = ?mover.id(),
                %start,
                %target,
                max_turns,
                "path search stopped at the turn horizon"
            );
        }
        debug!(unit = ?mover.id(), %start, %target, expanded, "no path");
        Vec::new()
    }

    /// Tiles around the mover reachable with this turn's moves, plus every tile adjacent to
    /// the reachable frontier with its raw edge cost (blocked and turn-ending included).
    pub fn tiles_in_range(&mut self, mover: &Mover, ctx: &MovementContext) -> HashMap<Hex, RangeEntry> {
        let mut out: HashMap<Hex, RangeEntry> = HashMap::new();
        let map = self.map;
        let moves = mover.moves_left();
        let Some(start) = map.normalize(mover.position()) else {
            return out;
        };
        if moves <= 0.0 {
            return out;
        }

        let profile = mover.profile();
        let fingerprint = profile.fingerprint();
        let mut best_remaining: HashMap<Hex, f32> = HashMap::from([(start, moves)]);
        let mut queue = VecDeque::from([(start, moves)]);

        while let Some((tile, remaining)) = queue.pop_front() {
            if best_remaining.get(&tile).is_some_and(|&r| r > remaining) {
                continue;
            }
            for neighbor in map.neighbors(tile) {
                if neighbor == start {
                    continue;
                }
                let cost = self.cost_keyed(fingerprint, profile, neighbor, tile, ctx);
                out.entry(neighbor)
                    .and_modify(|e| {
                        if cost.preference(e.cost) == Ordering::Less {
                            e.cost = cost;
                        }
                    })
                    .or_insert(RangeEntry {
                        tile: neighbor,
                        cost,
                    });

                let Some(c) = cost.value() else {
                    continue;
                };
                if c > remaining {
                    continue;
                }
                // A tile entered with the last move is still expanded so its edges are recorded.
                let left = remaining - c;
                if best_remaining.get(&neighbor).is_some_and(|&r| r >= left) {
                    continue;
                }
                best_remaining.insert(neighbor, left);
                queue.push_back((neighbor, left));
            }
        }

        debug!(unit = ?mover.id(), %start, moves, tiles = out.len(), "range computed");
        out
    }

    /// Plan to `target` and dry-run this turn's walk without touching `mover`.
    pub fn preview(&mut self, mover: &Mover, target: Hex, ctx: &MovementContext) -> PathPreview {
        let full_path = self.find_path(mover, target, ctx);
        if full_path.is_empty() {
            return PathPreview {
                full_path,
                this_turn_path: Vec::new(),
                stop_at: mover.position(),
                stop_reason: None,
            };
        }

        let mut dry_run = mover.clone();
        dry_run.set_path(full_path.iter().copied());
        let outcome = self.walk(&mut dry_run, ctx);

        let committed = full_path.len() - dry_run.queued().len();
        let this_turn_path = full_path[..committed].iter().map(|s| s.tile).collect();
        let stop_reason = match outcome {
            WalkOutcome::Refused(reason) => Some(reason),
            WalkOutcome::TurnEnded if !dry_run.queued().is_empty() => {
                Some(MovementStopReason::MovesExhausted)
            }
            _ => None,
        };

        PathPreview {
            full_path,
            this_turn_path,
            stop_at: dry_run.position(),
            stop_reason,
        }
    }
}

fn reconstruct(nodes: &[SearchNode], goal: usize) -> Vec<PathStep> {
    let mut chain = Vec::new();
    let mut cursor = goal;
    while let Some(parent) = nodes[cursor].parent {
        chain.push(cursor);
        cursor = parent;
    }
    chain.reverse();

    let mut steps: Vec<PathStep> = chain
        .into_iter()
        .map(|i| PathStep {
            tile: nodes[i].tile,
            turn: nodes[i].state.turn,
            is_turn_end: false,
            moves_remaining: nodes[i].state.moves_remaining,
        })
        .collect();

    let turns: Vec<u32> = steps.iter().map(|s| s.turn).collect();
    for (i, step) in steps.iter_mut().enumerate() {
        step.is_turn_end = turns.get(i + 1).map_or(true, |&next| next != step.turn);
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MoveCostCache;
    use crate::map::{Elevation, GameMap, Terrain, Tile};
    use crate::rules::MovementRules;
    use crate::unit::UnitProfile;
    use hexmarch_protocol::EntityId;

    fn grass(width: u32, height: u32) -> GameMap {
        GameMap::new(width, height, Tile::new(Terrain::Grassland)).expect("map")
    }

    fn set(map: &mut GameMap, x: i32, y: i32, tile: Tile) {
        *map.get_mut(Hex::new(x, y)).expect("tile") = tile;
    }

    fn hill() -> Tile {
        Tile::new(Terrain::Grassland).with_elevation(Elevation::Hill)
    }

    fn mover_at(x: i32, y: i32, max_moves: f32) -> Mover {
        Mover::new(EntityId::new(1, 0), UnitProfile::land(max_moves), Hex::new(x, y))
    }

    fn tiles(path: &[PathStep]) -> Vec<Hex> {
        path.iter().map(|s| s.tile).collect()
    }

    #[test]
    fn path_to_own_tile_is_empty() {
        let map = grass(8, 4);
        let rules = MovementRules::standard();
        let mut cache = MoveCostCache::new();
        let mut engine = MovementEngine::new(&map, &rules, &mut cache);
        let ctx = MovementContext::omniscient(&map);
        let mover = mover_at(2, 1, 2.0);
        assert!(engine.find_path(&mover, Hex::new(2, 1), &ctx).is_empty());
        assert!(engine.find_path(&mover, Hex::new(10, 1), &ctx).is_empty());
    }

    #[test]
    fn prefers_the_flat_route_over_the_hill() {
        let rules = MovementRules::standard();
        let ctx_for = MovementContext::omniscient;

        for (hill_at, flat_at) in [((3, 0), (2, 1)), ((2, 1), (3, 0))] {
            let mut map = grass(8, 4);
            set(&mut map, hill_at.0, hill_at.1, hill());
            let mut cache = MoveCostCache::new();
            let mut engine = MovementEngine::new(&map, &rules, &mut cache);
            let ctx = ctx_for(&map);
            let mover = mover_at(2, 0, 3.0);

            let path = engine.find_path(&mover, Hex::new(3, 1), &ctx);
            assert_eq!(
                tiles(&path),
                vec![Hex::new(flat_at.0, flat_at.1), Hex::new(3, 1)]
            );
            assert_eq!(path[1].moves_remaining, 1.0);
        }
    }

    #[test]
    fn overshoot_lands_this_turn() {
        let mut map = grass(8, 4);
        set(&mut map, 3, 0, hill());
        let rules = MovementRules::standard();
        let mut cache = MoveCostCache::new();
        let mut engine = MovementEngine::new(&map, &rules, &mut cache);
        let ctx = MovementContext::omniscient(&map);
        let mut mover = mover_at(2, 0, 2.0);
        mover.set_moves(1.0);

        let path = engine.find_path(&mover, Hex::new(3, 0), &ctx);
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].turn, 0);
        assert!(path[0].is_turn_end);
        assert_eq!(path[0].moves_remaining, 0.0);
    }

    #[test]
    fn exhausted_mover_starts_next_turn() {
        let map = grass(8, 4);
        let rules = MovementRules::standard();
        let mut cache = MoveCostCache::new();
        let mut engine = MovementEngine::new(&map, &rules, &mut cache);
        let ctx = MovementContext::omniscient(&map);
        let mut mover = mover_at(2, 0, 2.0);
        mover.set_moves(0.0);

        let path = engine.find_path(&mover, Hex::new(4, 0), &ctx);
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].turn, 1);
        assert!(!path[0].is_turn_end);
        assert_eq!(path[1].turn, 1);
        assert!(path[1].is_turn_end);
    }

    #[test]
    fn fording_costs_the_same_as_an_equivalent_hill() {
        let mut map = grass(8, 4);
        set(&mut map, 3, 0, Tile::new(Terrain::Grassland).with_river(2));
        set(&mut map, 2, 1, hill());
        let rules = MovementRules::standard();
        let mut cache = MoveCostCache::new();
        let mut engine = MovementEngine::new(&map, &rules, &mut cache);
        let ctx = MovementContext::omniscient(&map);
        let mover = mover_at(2, 0, 3.0);

        // Fording spends all 3 moves; the hill spends 2 and leaves time to reach the goal.
        let path = engine.find_path(&mover, Hex::new(3, 1), &ctx);
        assert_eq!(tiles(&path), vec![Hex::new(2, 1), Hex::new(3, 1)]);
        assert!(path.iter().all(|s| s.turn == 0));
    }

    #[test]
    fn cannot_plan_to_stop_on_a_friendly() {
        let map = grass(8, 4);
        let rules = MovementRules::standard();
        let mut cache = MoveCostCache::new();
        let mut engine = MovementEngine::new(&map, &rules, &mut cache);
        let ctx = MovementContext::omniscient(&map).with_friendly([Hex::new(4, 0), Hex::new(3, 0)]);
        let mover = mover_at(2, 0, 4.0);

        assert!(engine.find_path(&mover, Hex::new(4, 0), &ctx).is_empty());
        let through = engine.find_path(&mover, Hex::new(5, 0), &ctx);
        assert_eq!(through.last().map(|s| s.tile), Some(Hex::new(5, 0)));
    }

    #[test]
    fn unreachable_target_yields_empty_path() {
        let mut map = grass(8, 4);
        for y in 0..4 {
            set(&mut map, 4, y, Tile::new(Terrain::Ocean));
            set(&mut map, 0, y, Tile::new(Terrain::Ocean));
        }
        let rules = MovementRules::standard();
        let mut cache = MoveCostCache::new();
        let mut engine = MovementEngine::new(&map, &rules, &mut cache);
        let ctx = MovementContext::omniscient(&map);
        let mover = mover_at(2, 1, 2.0);
        assert!(engine.find_path(&mover, Hex::new(6, 1), &ctx).is_empty());
    }

    #[test]
    fn path_wraps_across_the_seam() {
        let map = grass(10, 4);
        let rules = MovementRules::standard();
        let mut cache = MoveCostCache::new();
        let mut engine = MovementEngine::new(&map, &rules, &mut cache);
        let ctx = MovementContext::omniscient(&map);
        let mover = mover_at(1, 2, 3.0);

        let path = engine.find_path(&mover, Hex::new(8, 2), &ctx);
        assert_eq!(
            tiles(&path),
            vec![Hex::new(0, 2), Hex::new(9, 2), Hex::new(8, 2)]
        );
    }

    #[test]
    fn range_with_no_moves_is_empty() {
        let map = grass(8, 4);
        let rules = MovementRules::standard();
        let mut cache = MoveCostCache::new();
        let mut engine = MovementEngine::new(&map, &rules, &mut cache);
        let ctx = MovementContext::omniscient(&map);
        let mut mover = mover_at(2, 0, 2.0);
        mover.set_moves(0.0);
        assert!(engine.tiles_in_range(&mover, &ctx).is_empty());
    }

    #[test]
    fn range_records_raw_costs_of_the_frontier() {
        let mut map = grass(10, 4);
        set(&mut map, 3, 0, hill());
        let rules = MovementRules::standard();
        let mut cache = MoveCostCache::new();
        let mut engine = MovementEngine::new(&map, &rules, &mut cache);
        let ctx = MovementContext::omniscient(&map);

        let mut mover = mover_at(2, 0, 2.0);
        mover.set_moves(1.0);
        let range = engine.tiles_in_range(&mover, &ctx);
        assert_eq!(range.len(), 10);
        assert_eq!(range[&Hex::new(3, 0)].cost, MoveCost::Cost(2.0));
        assert_eq!(range[&Hex::new(1, 0)].cost, MoveCost::Cost(1.0));
        // Edges out of tiles entered with the last move.
        assert_eq!(range[&Hex::new(0, 0)].cost, MoveCost::Cost(1.0));
        assert!(range.contains_key(&Hex::new(3, 1)));
        // The hill is an overshoot and is not expanded.
        assert!(!range.contains_key(&Hex::new(4, 0)));

        mover.set_moves(2.0);
        let range = engine.tiles_in_range(&mover, &ctx);
        assert!(range.contains_key(&Hex::new(0, 0)));
        assert!(range.contains_key(&Hex::new(4, 0)));
        assert!(!range.contains_key(&Hex::new(5, 0)));
        assert!(!range.contains_key(&Hex::new(2, 0)));
    }

    #[test]
    fn range_expands_tiles_entered_with_the_last_move() {
        let map = grass(10, 4);
        let rules = MovementRules::standard();
        let mut cache = MoveCostCache::new();
        let mut engine = MovementEngine::new(&map, &rules, &mut cache);
        let ctx = MovementContext::omniscient(&map);
        let mover = mover_at(2, 0, 1.0);

        let range = engine.tiles_in_range(&mover, &ctx);
        assert_eq!(range[&Hex::new(4, 0)].cost, MoveCost::Cost(1.0));
        assert!(!range.contains_key(&Hex::new(5, 0)));
        assert!(range
            .keys()
            .all(|&hex| (1..=2).contains(&map.hex_distance(Hex::new(2, 0), hex))));
    }

    #[test]
    fn range_reports_blocked_and_turn_ending_edges() {
        let mut map = grass(10, 4);
        set(&mut map, 3, 0, Tile::new(Terrain::Coast));
        set(&mut map, 1, 0, Tile::new(Terrain::Grassland).with_river(1));
        let rules = MovementRules::standard();
        let mut cache = MoveCostCache::new();
        let mut engine = MovementEngine::new(&map, &rules, &mut cache);
        let ctx = MovementContext::omniscient(&map).with_enemies([Hex::new(2, 1)]);
        let mover = mover_at(2, 0, 1.0);

        let range = engine.tiles_in_range(&mover, &ctx);
        assert_eq!(range[&Hex::new(3, 0)].cost, MoveCost::Blocked);
        assert_eq!(range[&Hex::new(2, 1)].cost, MoveCost::Blocked);
        assert_eq!(range[&Hex::new(1, 0)].cost, MoveCost::TurnEnding);
        // Not expanded through the ford.
        assert!(!range.contains_key(&Hex::new(0, 0)));
    }

    #[test]
    fn preview_reports_this_turn_and_stop() {
        let map = grass(16, 6);
        let rules = MovementRules::standard();
        let mut cache = MoveCostCache::new();
        let mut engine = MovementEngine::new(&map, &rules, &mut cache);
        let ctx = MovementContext::omniscient(&map);
        let mover = mover_at(0, 2, 2.0);

        let preview = engine.preview(&mover, Hex::new(6, 2), &ctx);
        assert_eq!(preview.full_path.len(), 6);
        assert_eq!(preview.this_turn_path, vec![Hex::new(1, 2), Hex::new(2, 2)]);
        assert_eq!(preview.stop_at, Hex::new(2, 2));
        assert_eq!(preview.stop_reason, Some(MovementStopReason::MovesExhausted));
        assert_eq!(mover.position(), Hex::new(0, 2));
    }

    #[test]
    fn preview_of_unreachable_target_stays_put() {
        let map = grass(8, 4);
        let rules = MovementRules::standard();
        let mut cache = MoveCostCache::new();
        let mut engine = MovementEngine::new(&map, &rules, &mut cache);
        let ctx = MovementContext::omniscient(&map);
        let mover = mover_at(2, 1, 2.0);

        let preview = engine.preview(&mover, Hex::new(2, 1), &ctx);
        assert!(preview.full_path.is_empty());
        assert_eq!(preview.stop_at, Hex::new(2, 1));
        assert_eq!(preview.stop_reason, None);
    }
}
