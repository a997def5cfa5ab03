use thiserror::Error;
use tracing::debug;

use crate::rules::{MovementRules, RawMovementRules};

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid movement rules: {0}")]
    Invalid(String),
}

pub enum RulesSource<'a> {
    Embedded,
    /// Directory containing a `movement.yaml`.
    Path(String),
    Bytes(&'a [u8]),
}

pub fn load_rules(source: RulesSource<'_>) -> Result<MovementRules, RulesError> {
    let (origin, raw): (&str, RawMovementRules) = match source {
        RulesSource::Embedded => {
            let yaml = include_str!("../../data/movement.yaml");
            ("embedded", serde_yaml::from_str(yaml)?)
        }
        RulesSource::Path(path) => {
            let yaml = std::fs::read_to_string(format!("{path}/movement.yaml"))?;
            ("path", serde_yaml::from_str(&yaml)?)
        }
        RulesSource::Bytes(bytes) => ("bytes", serde_yaml::from_str(std::str::from_utf8(bytes)?)?),
    };

    let rules = compile_rules(raw)?;
    debug!(
        origin,
        base_cost = rules.base_cost,
        naval_cost = rules.naval_cost,
        max_turns = rules.max_turns,
        "movement rules loaded"
    );
    Ok(rules)
}

fn compile_rules(raw: RawMovementRules) -> Result<MovementRules, RulesError> {
    if !raw.base_cost.is_finite() || raw.base_cost <= 0.0 {
        return Err(RulesError::Invalid(format!(
            "base_cost must be positive, got {}",
            raw.base_cost
        )));
    }
    if !raw.flat_naval_cost.is_finite() || raw.flat_naval_cost <= 0.0 {
        return Err(RulesError::Invalid(format!(
            "flat_naval_cost must be positive, got {}",
            raw.flat_naval_cost
        )));
    }
    if raw.pathfinding.max_turns == 0 {
        return Err(RulesError::Invalid(
            "pathfinding.max_turns must be at least 1".to_string(),
        ));
    }
    if let Some((feature, rule)) = raw.features.iter().find(|(_, r)| !r.cost.is_finite()) {
        return Err(RulesError::Invalid(format!(
            "feature {feature:?} has non-finite cost {}",
            rule.cost
        )));
    }

    let terrains = raw
        .terrains
        .into_iter()
        .map(|(k, v)| (k, v.compile()))
        .collect();
    let elevations = raw
        .elevations
        .into_iter()
        .map(|(k, v)| (k, v.compile()))
        .collect();
    let features = raw
        .features
        .into_iter()
        .map(|(k, v)| (k, v.compile()))
        .collect();

    Ok(MovementRules::from_parts(
        raw.base_cost,
        raw.flat_naval_cost,
        raw.pathfinding.max_turns,
        terrains,
        elevations,
        features,
    ))
}
