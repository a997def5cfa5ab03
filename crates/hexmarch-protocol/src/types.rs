use serde::{Deserialize, Serialize};

use crate::Hex;

/// Landing state after one edge of a planned route.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub tile: Hex,
    /// Turn index relative to the turn the route was planned in (0 = this turn).
    pub turn: u32,
    /// True when the unit stops here for the turn: last step, or the next step is a later turn.
    pub is_turn_end: bool,
    pub moves_remaining: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MovementStopReason {
    EnteredEnemyZoc,
    Blocked { attempted: Hex },
    Impassable { attempted: Hex },
    MovesExhausted,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathPreview {
    pub full_path: Vec<PathStep>,
    pub this_turn_path: Vec<Hex>,
    pub stop_at: Hex,
    #[serde(default)]
    pub stop_reason: Option<MovementStopReason>,
}
