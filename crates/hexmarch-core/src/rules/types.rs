use std::collections::BTreeMap;

use serde::Deserialize;

use crate::map::{Elevation, Feature, Terrain};
use crate::unit::Special;

const DIFFICULT_TERRAIN_COST: f32 = 1.0;
const ROUGH_ELEVATION_COST: f32 = 1.0;

fn default_base_cost() -> f32 {
    1.0
}

fn default_max_turns() -> u32 {
    64
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTerrainRule {
    #[serde(default)]
    pub difficult: bool,
    #[serde(default)]
    pub requires: Option<Special>,
}

impl RawTerrainRule {
    pub fn compile(self) -> TerrainRule {
        TerrainRule {
            extra_cost: if self.difficult {
                DIFFICULT_TERRAIN_COST
            } else {
                0.0
            },
            requires: self.requires,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawElevationRule {
    #[serde(default)]
    pub rough: bool,
    #[serde(default)]
    pub requires: Option<Special>,
}

impl RawElevationRule {
    pub fn compile(self) -> ElevationRule {
        ElevationRule {
            extra_cost: if self.rough { ROUGH_ELEVATION_COST } else { 0.0 },
            requires: self.requires,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFeatureRule {
    #[serde(default)]
    pub cost: f32,
    #[serde(default)]
    pub ends_turn: bool,
}

impl RawFeatureRule {
    pub fn compile(self) -> FeatureRule {
        FeatureRule {
            cost: self.cost,
            ends_turn: self.ends_turn,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPathfinding {
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

impl Default for RawPathfinding {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMovementRules {
    #[serde(default = "default_base_cost")]
    pub base_cost: f32,
    #[serde(default = "default_base_cost")]
    pub flat_naval_cost: f32,
    #[serde(default)]
    pub pathfinding: RawPathfinding,
    #[serde(default)]
    pub terrains: BTreeMap<Terrain, RawTerrainRule>,
    #[serde(default)]
    pub elevations: BTreeMap<Elevation, RawElevationRule>,
    #[serde(default)]
    pub features: BTreeMap<Feature, RawFeatureRule>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TerrainRule {
    pub extra_cost: f32,
    pub requires: Option<Special>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElevationRule {
    pub extra_cost: f32,
    pub requires: Option<Special>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureRule {
    pub cost: f32,
    pub ends_turn: bool,
}

/// Compiled movement cost table. Missing entries behave as "no modifier, no requirement".
#[derive(Debug, Clone, PartialEq)]
pub struct MovementRules {
    pub base_cost: f32,
    pub naval_cost: f32,
    pub max_turns: u32,
    terrains: BTreeMap<Terrain, TerrainRule>,
    elevations: BTreeMap<Elevation, ElevationRule>,
    features: BTreeMap<Feature, FeatureRule>,
}

impl MovementRules {
    pub fn from_parts(
        base_cost: f32,
        naval_cost: f32,
        max_turns: u32,
        terrains: BTreeMap<Terrain, TerrainRule>,
        elevations: BTreeMap<Elevation, ElevationRule>,
        features: BTreeMap<Feature, FeatureRule>,
    ) -> Self {
        Self {
            base_cost,
            naval_cost,
            max_turns,
            terrains,
            elevations,
            features,
        }
    }

    /// The stock table: +1 difficult terrain, +1 rough elevation, +1 dense features,
    /// -0.5 trade winds, swamps end the turn.
    pub fn standard() -> Self {
        let terrains = Terrain::ALL
            .into_iter()
            .map(|terrain| {
                let rule = match terrain {
                    Terrain::Desert | Terrain::Snow => RawTerrainRule {
                        difficult: true,
                        requires: None,
                    },
                    Terrain::Sea => RawTerrainRule {
                        difficult: false,
                        requires: Some(Special::NavigateSea),
                    },
                    Terrain::Ocean => RawTerrainRule {
                        difficult: false,
                        requires: Some(Special::NavigateOcean),
                    },
                    Terrain::Ice => RawTerrainRule {
                        difficult: false,
                        requires: Some(Special::NavigateIce),
                    },
                    _ => RawTerrainRule::default(),
                };
                (terrain, rule.compile())
            })
            .collect();

        let elevations = Elevation::ALL
            .into_iter()
            .map(|elevation| {
                let requires = match elevation {
                    Elevation::Mountain => Some(Special::ClimbMountains),
                    Elevation::SnowMountain => Some(Special::ClimbSnowMountains),
                    _ => None,
                };
                let rule = RawElevationRule {
                    rough: elevation != Elevation::Flat,
                    requires,
                };
                (elevation, rule.compile())
            })
            .collect();

        let features = Feature::ALL
            .into_iter()
            .map(|feature| {
                let rule = match feature {
                    Feature::Forest
                    | Feature::PineForest
                    | Feature::Jungle
                    | Feature::Kelp
                    | Feature::Atoll
                    | Feature::Lagoon => FeatureRule {
                        cost: 1.0,
                        ends_turn: false,
                    },
                    Feature::Shrubs | Feature::Oasis | Feature::FloodPlain => {
                        FeatureRule::default()
                    }
                    Feature::TradeWinds => FeatureRule {
                        cost: -0.5,
                        ends_turn: false,
                    },
                    Feature::Swamp => FeatureRule {
                        cost: 0.0,
                        ends_turn: true,
                    },
                };
                (feature, rule)
            })
            .collect();

        Self {
            base_cost: 1.0,
            naval_cost: 1.0,
            max_turns: default_max_turns(),
            terrains,
            elevations,
            features,
        }
    }

    pub fn terrain(&self, terrain: Terrain) -> TerrainRule {
        self.terrains.get(&terrain).copied().unwrap_or_default()
    }

    pub fn elevation(&self, elevation: Elevation) -> ElevationRule {
        self.elevations.get(&elevation).copied().unwrap_or_default()
    }

    pub fn feature(&self, feature: Feature) -> FeatureRule {
        self.features.get(&feature).copied().unwrap_or_default()
    }

    /// Smallest numeric cost any single edge can have under this table.
    pub fn cheapest_step(&self) -> f32 {
        let cheapest_feature = self
            .features
            .values()
            .map(|f| f.cost)
            .fold(0.0_f32, f32::min);
        (self.base_cost + cheapest_feature)
            .max(0.0)
            .min(self.naval_cost)
    }
}

impl Default for MovementRules {
    fn default() -> Self {
        Self::standard()
    }
}
