use serde::{Deserialize, Serialize};
use thiserror::Error;

use hexmarch_protocol::{CityId, Hex, RiverId};
use std::collections::VecDeque;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("map {width}x{height} is degenerate (need width >= 3 and height >= 2)")]
    Degenerate { width: u32, height: u32 },
    #[error("expected {expected} tiles for the map, got {got}")]
    TileCountMismatch { expected: usize, got: usize },
    #[error("hex {hex} is off the map")]
    OutOfBounds { hex: Hex },
    #[error("hex {hex} has only {found} manhattan neighbors (at least 3 required)")]
    TooFewNeighbors { hex: Hex, found: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Land,
    Water,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Grassland,
    Plains,
    Tundra,
    Desert,
    Snow,
    Coast,
    Lake,
    Sea,
    Ocean,
    Ice,
}

impl Terrain {
    pub const ALL: [Terrain; 10] = [
        Terrain::Grassland,
        Terrain::Plains,
        Terrain::Tundra,
        Terrain::Desert,
        Terrain::Snow,
        Terrain::Coast,
        Terrain::Lake,
        Terrain::Sea,
        Terrain::Ocean,
        Terrain::Ice,
    ];

    pub fn domain(self) -> Domain {
        match self {
            Terrain::Coast | Terrain::Lake | Terrain::Sea | Terrain::Ocean | Terrain::Ice => {
                Domain::Water
            }
            _ => Domain::Land,
        }
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Elevation {
    #[default]
    Flat,
    Hill,
    Mountain,
    SnowMountain,
}

impl Elevation {
    pub const ALL: [Elevation; 4] = [
        Elevation::Flat,
        Elevation::Hill,
        Elevation::Mountain,
        Elevation::SnowMountain,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Forest,
    PineForest,
    Jungle,
    Kelp,
    Atoll,
    Lagoon,
    Shrubs,
    Oasis,
    FloodPlain,
    TradeWinds,
    Swamp,
}

impl Feature {
    pub const ALL: [Feature; 11] = [
        Feature::Forest,
        Feature::PineForest,
        Feature::Jungle,
        Feature::Kelp,
        Feature::Atoll,
        Feature::Lagoon,
        Feature::Shrubs,
        Feature::Oasis,
        Feature::FloodPlain,
        Feature::TradeWinds,
        Feature::Swamp,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Construction {
    Canal,
    Lock,
    Farm,
    Mine,
    Fort,
}

impl Construction {
    /// Constructions that let ships cross land.
    pub fn is_waterway(self) -> bool {
        matches!(self, Construction::Canal | Construction::Lock)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub terrain: Terrain,
    #[serde(default)]
    pub elevation: Elevation,
    #[serde(default)]
    pub feature: Option<Feature>,
    #[serde(default)]
    pub river: Option<RiverId>,
    #[serde(default)]
    pub city: Option<CityId>,
    #[serde(default)]
    pub construction: Option<Construction>,
}

impl Tile {
    pub fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            elevation: Elevation::Flat,
            feature: None,
            river: None,
            city: None,
            construction: None,
        }
    }

    pub fn with_elevation(mut self, elevation: Elevation) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.feature = Some(feature);
        self
    }

    pub fn with_river(mut self, river: RiverId) -> Self {
        self.river = Some(river);
        self
    }

    pub fn with_city(mut self, city: CityId) -> Self {
        self.city = Some(city);
        self
    }

    pub fn with_construction(mut self, construction: Construction) -> Self {
        self.construction = Some(construction);
        self
    }

    pub fn domain(&self) -> Domain {
        self.terrain.domain()
    }

    /// Ships may leave the water onto this tile: a city or a waterway construction.
    pub fn is_port(&self) -> bool {
        self.city.is_some() || self.construction.is_some_and(Construction::is_waterway)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DistanceMetric {
    /// Six hex neighbors per ring step.
    Hex,
    /// Four orthogonal grid steps (E, W, N, S in offset space).
    Manhattan,
    /// Eight grid steps (orthogonal plus diagonal in offset space).
    Chebyshev,
}

impl DistanceMetric {
    fn steps(self, hex: Hex) -> &'static [(i32, i32)] {
        const MANHATTAN: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, -1), (0, 1)];
        const CHEBYSHEV: [(i32, i32); 8] = [
            (1, 0),
            (-1, 0),
            (0, -1),
            (0, 1),
            (1, -1),
            (-1, -1),
            (1, 1),
            (-1, 1),
        ];
        match self {
            DistanceMetric::Hex => &hex.directions()[..],
            DistanceMetric::Manhattan => &MANHATTAN,
            DistanceMetric::Chebyshev => &CHEBYSHEV,
        }
    }
}

/// A cylindrical hex world: X wraps modulo `width`, Y is clamped to `0..height`.
#[derive(Clone, Debug)]
pub struct GameMap {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl GameMap {
    pub fn new(width: u32, height: u32, default_tile: Tile) -> Result<Self, MapError> {
        check_dimensions(width, height)?;
        let tiles = vec![default_tile; (width as usize) * (height as usize)];
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    /// Build a map from row-major tiles supplied by the host.
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<Tile>) -> Result<Self, MapError> {
        check_dimensions(width, height)?;
        let expected = (width as usize) * (height as usize);
        if tiles.len() != expected {
            return Err(MapError::TileCountMismatch {
                expected,
                got: tiles.len(),
            });
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Wrap X into `0..width`; `None` when Y falls off the map (never wrapped).
    pub fn normalize(&self, hex: Hex) -> Option<Hex> {
        if hex.y < 0 || hex.y >= self.height as i32 {
            return None;
        }
        Some(Hex {
            x: hex.x.rem_euclid(self.width as i32),
            y: hex.y,
        })
    }

    pub fn contains(&self, hex: Hex) -> bool {
        self.normalize(hex).is_some()
    }

    pub fn index_of(&self, hex: Hex) -> Option<usize> {
        let hex = self.normalize(hex)?;
        Some((hex.y as usize) * (self.width as usize) + (hex.x as usize))
    }

    pub fn hex_at_index(&self, index: usize) -> Option<Hex> {
        if index >= self.tiles.len() {
            return None;
        }
        let x = (index % self.width as usize) as i32;
        let y = (index / self.width as usize) as i32;
        Some(Hex { x, y })
    }

    pub fn get(&self, hex: Hex) -> Option<&Tile> {
        let index = self.index_of(hex)?;
        self.tiles.get(index)
    }

    /// Mutable tile access. Callers holding a cost cache must invalidate `hex` afterwards;
    /// `World::update_tile` does both.
    pub fn get_mut(&mut self, hex: Hex) -> Option<&mut Tile> {
        let index = self.index_of(hex)?;
        self.tiles.get_mut(index)
    }

    pub fn tile(&self, hex: Hex) -> Result<&Tile, MapError> {
        self.get(hex).ok_or(MapError::OutOfBounds { hex })
    }

    /// Adjacent tiles in E, W, NE, NW, SE, SW order, normalized; `None` past the poles.
    pub fn neighbor_slots(&self, hex: Hex) -> [Option<Hex>; 6] {
        let mut out = [None; 6];
        for (slot, &(dx, dy)) in out.iter_mut().zip(hex.directions()) {
            *slot = self.normalize(hex.offset(dx, dy));
        }
        out
    }

    pub fn neighbors(&self, hex: Hex) -> impl Iterator<Item = Hex> {
        self.neighbor_slots(hex).into_iter().flatten()
    }

    pub fn is_neighbor(&self, a: Hex, b: Hex) -> bool {
        let Some(b) = self.normalize(b) else {
            return false;
        };
        self.neighbors(a).any(|n| n == b)
    }

    /// Hex distance using the shorter way around the X seam.
    pub fn hex_distance(&self, a: Hex, b: Hex) -> i32 {
        let width = self.width as i32;
        let a = Hex::new(a.x.rem_euclid(width), a.y);
        let b = Hex::new(b.x.rem_euclid(width), b.y);
        [-width, 0, width]
            .into_iter()
            .map(|shift| a.distance(Hex::new(b.x + shift, b.y)))
            .min()
            .unwrap_or(0)
    }

    /// Tiles within `distance` ring steps of `center` (excluding `center`), in stable index
    /// order. Hex rings come from cube space; the grid metrics expand breadth-first. X wraps
    /// and rows past the poles are dropped.
    pub fn neighbors_within_distance(
        &self,
        center: Hex,
        distance: u32,
        metric: DistanceMetric,
    ) -> Result<Vec<Hex>, MapError> {
        let center = self
            .normalize(center)
            .ok_or(MapError::OutOfBounds { hex: center })?;
        let start = self
            .index_of(center)
            .ok_or(MapError::OutOfBounds { hex: center })?;

        let found = self.metric_neighbors(center, DistanceMetric::Manhattan).count();
        if found < 3 {
            return Err(MapError::TooFewNeighbors { hex: center, found });
        }

        let within = match metric {
            DistanceMetric::Hex => self.hex_rings(center, distance),
            DistanceMetric::Manhattan | DistanceMetric::Chebyshev => {
                self.grid_rings(start, distance, metric)
            }
        };

        Ok(within
            .into_iter()
            .enumerate()
            .filter(|&(index, inside)| inside && index != start)
            .filter_map(|(index, _)| self.hex_at_index(index))
            .collect())
    }

    fn hex_rings(&self, center: Hex, distance: u32) -> Vec<bool> {
        let mut within = vec![false; self.len()];
        let cube = center.to_cube();
        let radius = i32::try_from(distance).unwrap_or(i32::MAX);
        for ring in 1..=radius {
            // Rings this wide only revisit tiles already marked.
            if ring > self.width as i32 + self.height as i32 {
                break;
            }
            for hex in cube.ring(ring).map(|c| c.to_hex()) {
                if let Some(index) = self.normalize(hex).and_then(|h| self.index_of(h)) {
                    within[index] = true;
                }
            }
        }
        within
    }

    fn grid_rings(&self, start: usize, distance: u32, metric: DistanceMetric) -> Vec<bool> {
        let mut dist = vec![u32::MAX; self.len()];
        dist[start] = 0;

        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(index) = queue.pop_front() {
            let d = dist[index];
            if d >= distance {
                continue;
            }
            let Some(hex) = self.hex_at_index(index) else {
                continue;
            };
            for neighbor in self.metric_neighbors(hex, metric) {
                let Some(n_index) = self.index_of(neighbor) else {
                    continue;
                };
                if dist[n_index] <= d + 1 {
                    continue;
                }
                dist[n_index] = d + 1;
                queue.push_back(n_index);
            }
        }

        dist.into_iter().map(|d| d <= distance).collect()
    }

    fn metric_neighbors(&self, hex: Hex, metric: DistanceMetric) -> impl Iterator<Item = Hex> {
        let mut out: Vec<Hex> = Vec::with_capacity(8);
        for &(dx, dy) in metric.steps(hex) {
            let Some(n) = self.normalize(hex.offset(dx, dy)) else {
                continue;
            };
            if n != hex && !out.contains(&n) {
                out.push(n);
            }
        }
        out.into_iter()
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), MapError> {
    if width < 3 || height < 2 {
        return Err(MapError::Degenerate { width, height });
    }
    Ok(())
}
