use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Offset coordinates on an "odd-r" hex grid: odd rows sit half a hex to the right.
///
/// `x` is the column and `y` the row. These coordinates are unbounded; wrapping and
/// clamping against a concrete map happens in the map layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hex {
    pub x: i32,
    pub y: i32,
}

impl Hex {
    /// Neighbor offsets on even rows: E, W, NE, NW, SE, SW.
    pub const EVEN_ROW_DIRECTIONS: [(i32, i32); 6] =
        [(1, 0), (-1, 0), (0, -1), (-1, -1), (0, 1), (-1, 1)];
    /// Neighbor offsets on odd rows: E, W, NE, NW, SE, SW.
    pub const ODD_ROW_DIRECTIONS: [(i32, i32); 6] =
        [(1, 0), (-1, 0), (1, -1), (0, -1), (1, 1), (0, 1)];

    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn is_odd_row(self) -> bool {
        self.y & 1 != 0
    }

    pub fn directions(self) -> &'static [(i32, i32); 6] {
        if self.is_odd_row() {
            &Self::ODD_ROW_DIRECTIONS
        } else {
            &Self::EVEN_ROW_DIRECTIONS
        }
    }

    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Hex {
        Hex {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// The six adjacent hexes in E, W, NE, NW, SE, SW order.
    pub fn neighbors(self) -> impl Iterator<Item = Hex> {
        self.directions()
            .iter()
            .map(move |&(dx, dy)| self.offset(dx, dy))
    }

    #[inline]
    pub const fn to_cube(self) -> Cube {
        Cube {
            q: self.x - (self.y - (self.y & 1)) / 2,
            r: self.y,
        }
    }

    /// Unwrapped hex distance. Use the map's distance for cylindrical worlds.
    #[inline]
    pub fn distance(self, other: Hex) -> i32 {
        self.to_cube().distance(other.to_cube())
    }
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HexParseError {
    #[error("hex key {0:?} is missing the ',' separator")]
    MissingSeparator(String),
    #[error("hex key {input:?} has an invalid component: {source}")]
    InvalidComponent {
        input: String,
        #[source]
        source: ParseIntError,
    },
}

impl FromStr for Hex {
    type Err = HexParseError;

    /// Parses the `"x,y"` key form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| HexParseError::MissingSeparator(s.to_string()))?;
        let component = |raw: &str| {
            raw.trim()
                .parse::<i32>()
                .map_err(|source| HexParseError::InvalidComponent {
                    input: s.to_string(),
                    source,
                })
        };
        Ok(Hex {
            x: component(x)?,
            y: component(y)?,
        })
    }
}

/// Axial coordinates (q, r). The implicit cube coordinate is `s = -q - r`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cube {
    pub q: i32,
    pub r: i32,
}

impl Cube {
    pub const DIRECTIONS: [Cube; 6] = [
        Cube { q: 1, r: 0 },  // East
        Cube { q: 1, r: -1 }, // Northeast
        Cube { q: 0, r: -1 }, // Northwest
        Cube { q: -1, r: 0 }, // West
        Cube { q: -1, r: 1 }, // Southwest
        Cube { q: 0, r: 1 },  // Southeast
    ];

    #[inline]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    #[inline]
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    #[inline]
    pub const fn to_hex(self) -> Hex {
        Hex {
            x: self.q + (self.r - (self.r & 1)) / 2,
            y: self.r,
        }
    }

    #[inline]
    pub fn distance(self, other: Cube) -> i32 {
        ((self.q - other.q).abs() + (self.r - other.r).abs() + (self.s() - other.s()).abs()) / 2
    }

    /// All hexes at exactly `radius` distance, in a deterministic ring order.
    pub fn ring(self, radius: i32) -> impl Iterator<Item = Cube> {
        RingIter::new(self, radius)
    }
}

impl std::ops::Add for Cube {
    type Output = Cube;

    fn add(self, other: Cube) -> Cube {
        Cube {
            q: self.q + other.q,
            r: self.r + other.r,
        }
    }
}

impl std::ops::Mul<i32> for Cube {
    type Output = Cube;

    fn mul(self, rhs: i32) -> Self::Output {
        Cube {
            q: self.q * rhs,
            r: self.r * rhs,
        }
    }
}

struct RingIter {
    radius: i32,
    side: usize,
    step: i32,
    current: Option<Cube>,
}

impl RingIter {
    fn new(center: Cube, radius: i32) -> Self {
        let current = (radius > 0).then(|| center + Cube::DIRECTIONS[4] * radius);
        Self {
            radius,
            side: 0,
            step: 0,
            current,
        }
    }
}

impl Iterator for RingIter {
    type Item = Cube;

    fn next(&mut self) -> Option<Self::Item> {
        let cube = self.current?;
        let next = cube + Cube::DIRECTIONS[self.side];

        self.step += 1;
        if self.step >= self.radius {
            self.step = 0;
            self.side += 1;
        }

        self.current = (self.side < 6).then_some(next);
        Some(cube)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_conversion_roundtrips_on_both_row_parities() {
        for y in -3..=3 {
            for x in -3..=3 {
                let hex = Hex::new(x, y);
                assert_eq!(hex.to_cube().to_hex(), hex);
            }
        }
    }

    #[test]
    fn neighbors_are_at_distance_one_on_even_and_odd_rows() {
        for center in [Hex::new(2, 2), Hex::new(2, 3), Hex::new(-1, -1)] {
            let neighbors: Vec<_> = center.neighbors().collect();
            assert_eq!(neighbors.len(), 6);
            assert!(neighbors.iter().all(|n| center.distance(*n) == 1));
        }
    }

    #[test]
    fn odd_row_neighbors_shift_right() {
        let neighbors: Vec<_> = Hex::new(2, 1).neighbors().collect();
        assert!(neighbors.contains(&Hex::new(3, 0)));
        assert!(neighbors.contains(&Hex::new(3, 2)));
        assert!(!neighbors.contains(&Hex::new(1, 0)));
    }

    #[test]
    fn hex_distance_matches_expected() {
        assert_eq!(Hex::new(0, 0).distance(Hex::new(0, 0)), 0);
        assert_eq!(Hex::new(2, 0).distance(Hex::new(3, 1)), 2);
        assert_eq!(Hex::new(0, 0).distance(Hex::new(4, 0)), 4);
    }

    #[test]
    fn ring_has_six_hexes_per_step_of_radius() {
        let center = Cube::new(0, 0);
        assert_eq!(center.ring(0).count(), 0);
        for radius in 1..=4 {
            let ring: Vec<_> = center.ring(radius).collect();
            assert_eq!(ring.len() as i32, 6 * radius);
            assert!(ring.iter().all(|c| center.distance(*c) == radius));
        }
    }

    #[test]
    fn parse_accepts_display_form() {
        let hex: Hex = "3,-2".parse().expect("parse");
        assert_eq!(hex, Hex::new(3, -2));
        assert_eq!(hex.to_string().parse::<Hex>(), Ok(hex));
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        assert!(matches!(
            "3".parse::<Hex>(),
            Err(HexParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            "a,1".parse::<Hex>(),
            Err(HexParseError::InvalidComponent { .. })
        ));
    }
}
