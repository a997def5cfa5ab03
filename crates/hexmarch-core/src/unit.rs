use std::collections::{BTreeSet, VecDeque};

use hexmarch_protocol::{Hex, PathStep, UnitId};
use serde::{Deserialize, Serialize};

/// Movement domain of a unit. Air and space units never move through this core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Land,
    Water,
    Air,
    Space,
}

impl Platform {
    pub fn is_mobile(self) -> bool {
        matches!(self, Platform::Land | Platform::Water)
    }

    fn tag(self) -> u8 {
        match self {
            Platform::Land => 0,
            Platform::Water => 1,
            Platform::Air => 2,
            Platform::Space => 3,
        }
    }
}

/// Capability flags granted by a unit's design or its owner's research.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Special {
    Embark,
    NavigateSea,
    NavigateOcean,
    NavigateIce,
    ClimbMountains,
    ClimbSnowMountains,
}

impl Special {
    fn tag(self) -> u8 {
        match self {
            Special::Embark => 0,
            Special::NavigateSea => 1,
            Special::NavigateOcean => 2,
            Special::NavigateIce => 3,
            Special::ClimbMountains => 4,
            Special::ClimbSnowMountains => 5,
        }
    }
}

/// Derived capability set of a unit: what it may enter, and how far it goes per turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitProfile {
    pub platform: Platform,
    pub specials: BTreeSet<Special>,
    pub max_moves: f32,
}

impl UnitProfile {
    pub fn new(platform: Platform, max_moves: f32) -> Self {
        Self {
            platform,
            specials: BTreeSet::new(),
            max_moves,
        }
    }

    pub fn land(max_moves: f32) -> Self {
        Self::new(Platform::Land, max_moves)
    }

    pub fn naval(max_moves: f32) -> Self {
        Self::new(Platform::Water, max_moves)
    }

    /// Union of design and research specials; duplicates and order do not matter.
    pub fn with_specials<D, R>(mut self, design: D, research: R) -> Self
    where
        D: IntoIterator<Item = Special>,
        R: IntoIterator<Item = Special>,
    {
        self.specials.extend(design);
        self.specials.extend(research);
        self
    }

    pub fn grant(&mut self, special: Special) -> &mut Self {
        self.specials.insert(special);
        self
    }

    pub fn has(&self, special: Special) -> bool {
        self.specials.contains(&special)
    }

    /// Stable cache key for this capability set. Equal capabilities share cost entries.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new();
        h.write_u8(self.platform.tag());
        h.write_u32(self.specials.len() as u32);
        for special in &self.specials {
            h.write_u8(special.tag());
        }
        h.write_u32(self.max_moves.to_bits());
        h.finish()
    }
}

struct Fnv1a64 {
    hash: u64,
}

impl Fnv1a64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            hash: Self::OFFSET_BASIS,
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.hash ^= u64::from(b);
            self.hash = self.hash.wrapping_mul(Self::PRIME);
        }
    }

    fn write_u8(&mut self, v: u8) {
        self.write(&[v]);
    }

    fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    fn finish(&self) -> u64 {
        self.hash
    }
}

/// Live movement state of one unit: where it stands, what it has left, and where it is headed.
#[derive(Clone, Debug)]
pub struct Mover {
    id: UnitId,
    profile: UnitProfile,
    position: Hex,
    moves_left: f32,
    turn: u32,
    queue: VecDeque<PathStep>,
}

impl Mover {
    /// A fresh mover starts its turn with full moves.
    pub fn new(id: UnitId, profile: UnitProfile, position: Hex) -> Self {
        let moves_left = profile.max_moves.max(0.0);
        Self {
            id,
            profile,
            position,
            moves_left,
            turn: 0,
            queue: VecDeque::new(),
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn profile(&self) -> &UnitProfile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut UnitProfile {
        &mut self.profile
    }

    pub fn position(&self) -> Hex {
        self.position
    }

    pub fn moves_left(&self) -> f32 {
        self.moves_left
    }

    pub fn max_moves(&self) -> f32 {
        self.profile.max_moves
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Clamped to `0..=max_moves`.
    pub fn set_moves(&mut self, moves: f32) {
        self.moves_left = moves.clamp(0.0, self.profile.max_moves.max(0.0));
    }

    pub fn set_position(&mut self, position: Hex) {
        self.position = position;
    }

    pub fn append_path<I>(&mut self, steps: I)
    where
        I: IntoIterator<Item = PathStep>,
    {
        self.queue.extend(steps);
    }

    pub fn set_path<I>(&mut self, steps: I)
    where
        I: IntoIterator<Item = PathStep>,
    {
        self.queue.clear();
        self.queue.extend(steps);
    }

    pub fn clear_path(&mut self) {
        self.queue.clear();
    }

    pub fn queued(&self) -> &VecDeque<PathStep> {
        &self.queue
    }

    pub fn next_step(&self) -> Option<&PathStep> {
        self.queue.front()
    }

    /// Refill moves for a new turn. The queued path is kept.
    pub fn start_turn(&mut self) {
        self.turn += 1;
        self.moves_left = self.profile.max_moves.max(0.0);
    }

    /// Pop the next queued step and stand on `tile`, its map-normalized form.
    pub(crate) fn commit_step(&mut self, tile: Hex, moves_left: f32) -> Option<PathStep> {
        let step = self.queue.pop_front()?;
        self.position = tile;
        self.set_moves(moves_left);
        Some(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexmarch_protocol::EntityId;

    fn step(x: i32, y: i32) -> PathStep {
        PathStep {
            tile: Hex::new(x, y),
            turn: 0,
            is_turn_end: false,
            moves_remaining: 0.0,
        }
    }

    #[test]
    fn fingerprint_ignores_special_source_and_order() {
        let a = UnitProfile::land(2.0).with_specials(
            [Special::Embark, Special::ClimbMountains],
            [Special::NavigateSea],
        );
        let b = UnitProfile::land(2.0).with_specials(
            [Special::NavigateSea],
            [Special::ClimbMountains, Special::Embark, Special::Embark],
        );
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_separates_capabilities() {
        let base = UnitProfile::land(2.0);
        let mut embark = base.clone();
        embark.grant(Special::Embark);
        assert_ne!(base.fingerprint(), embark.fingerprint());
        assert_ne!(
            base.fingerprint(),
            UnitProfile::land(3.0).fingerprint()
        );
        assert_ne!(base.fingerprint(), UnitProfile::naval(2.0).fingerprint());
    }

    #[test]
    fn set_moves_is_clamped_to_maximum() {
        let mut mover = Mover::new(EntityId::new(1, 0), UnitProfile::land(2.0), Hex::new(0, 0));
        mover.set_moves(5.0);
        assert_eq!(mover.moves_left(), 2.0);
        mover.set_moves(-1.0);
        assert_eq!(mover.moves_left(), 0.0);
    }

    #[test]
    fn path_queue_appends_and_replaces() {
        let mut mover = Mover::new(EntityId::new(1, 0), UnitProfile::land(2.0), Hex::new(0, 0));
        mover.append_path([step(1, 0)]);
        mover.append_path([step(2, 0), step(3, 0)]);
        assert_eq!(mover.queued().len(), 3);

        mover.set_path([step(0, 1)]);
        assert_eq!(mover.next_step().map(|s| s.tile), Some(Hex::new(0, 1)));

        let committed = mover.commit_step(Hex::new(0, 1), 1.0).expect("step");
        assert_eq!(committed.tile, Hex::new(0, 1));
        assert_eq!(mover.position(), Hex::new(0, 1));
        assert!(mover.queued().is_empty());

        mover.append_path([step(1, 1)]);
        mover.clear_path();
        assert!(mover.next_step().is_none());
    }

    #[test]
    fn start_turn_refills_moves() {
        let mut mover = Mover::new(EntityId::new(1, 0), UnitProfile::land(3.0), Hex::new(0, 0));
        mover.set_moves(0.0);
        mover.start_turn();
        assert_eq!(mover.moves_left(), 3.0);
        assert_eq!(mover.turn(), 1);
    }
}
