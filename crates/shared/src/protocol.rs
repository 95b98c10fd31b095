use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    domain::{Agent, GridBox, SimulationVariant, Storage},
    error::{ConfigError, SchemaError},
};

pub const MAX_WIND_SPEED: i32 = 50;
pub const MAX_SPREAD_PROBABILITY: u8 = 100;

/// Opaque `Location` returned by the engine for one running simulation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(location: impl Into<String>) -> Result<Self, SchemaError> {
        let location = location.into();
        if location.trim().is_empty() {
            return Err(SchemaError::EmptyLocation);
        }
        Ok(Self(location))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WildfireTunables {
    pub probability_of_spread: u8,
    pub south_wind_speed: i32,
    pub west_wind_speed: i32,
    #[serde(rename = "bigJumps")]
    pub big_jumps: bool,
}

impl Default for WildfireTunables {
    fn default() -> Self {
        Self {
            probability_of_spread: MAX_SPREAD_PROBABILITY,
            south_wind_speed: 0,
            west_wind_speed: 0,
            big_jumps: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    pub width: u32,
    pub height: u32,
    pub number: u32,
    pub variant: SimulationVariant,
    pub wildfire: WildfireTunables,
}

impl SimulationConfig {
    pub fn new(variant: SimulationVariant, width: u32, height: u32, number: u32) -> Self {
        Self {
            width,
            height,
            number,
            variant,
            wildfire: WildfireTunables::default(),
        }
    }

    pub fn with_wildfire(mut self, wildfire: WildfireTunables) -> Self {
        self.wildfire = wildfire;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::new("width", "must be positive"));
        }
        if self.height == 0 {
            return Err(ConfigError::new("height", "must be positive"));
        }
        if self.number == 0 {
            return Err(ConfigError::new("number", "must be positive"));
        }
        if self.variant == SimulationVariant::Wildfire {
            let tunables = &self.wildfire;
            if tunables.probability_of_spread > MAX_SPREAD_PROBABILITY {
                return Err(ConfigError::new(
                    "probability_of_spread",
                    format!(
                        "must be within 0..={MAX_SPREAD_PROBABILITY}, got {}",
                        tunables.probability_of_spread
                    ),
                ));
            }
            for (field, speed) in [
                ("south_wind_speed", tunables.south_wind_speed),
                ("west_wind_speed", tunables.west_wind_speed),
            ] {
                if speed.abs() > MAX_WIND_SPEED {
                    return Err(ConfigError::new(
                        field,
                        format!("must be within -{MAX_WIND_SPEED}..={MAX_WIND_SPEED}, got {speed}"),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn to_request(&self) -> CreateSimulationRequest {
        CreateSimulationRequest {
            dim: [self.width, self.height],
            number: self.number,
            wildfire: (self.variant == SimulationVariant::Wildfire).then_some(self.wildfire),
        }
    }
}

/// Body of `POST /simulations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSimulationRequest {
    pub dim: [u32; 2],
    pub number: u32,
    #[serde(flatten)]
    pub wildfire: Option<WildfireTunables>,
}

/// Body of `GET <Location>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationState {
    #[serde(default)]
    pub boxes: Vec<GridBox>,
    #[serde(default, rename = "robots", alias = "cars")]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub storages: Vec<Storage>,
}

impl SimulationState {
    pub fn validate(&self) -> Result<(), SchemaError> {
        check_entities("box", self.boxes.iter().map(|b| (b.id.0, b.pos)))?;
        check_entities("agent", self.agents.iter().map(|a| (a.id.0, a.pos)))?;
        check_entities("storage", self.storages.iter().map(|s| (s.id.0, s.pos)))?;
        Ok(())
    }
}

fn check_entities(
    kind: &'static str,
    entities: impl Iterator<Item = (i64, crate::domain::GridPos)>,
) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for (id, pos) in entities {
        if !pos.is_on_grid() {
            return Err(SchemaError::OffGrid {
                kind,
                id,
                x: pos.x,
                y: pos.y,
            });
        }
        if !seen.insert(id) {
            return Err(SchemaError::DuplicateId { kind, id });
        }
    }
    Ok(())
}

/// Success body of `POST /simulations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedSimulation {
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(default)]
    pub boxes: Vec<GridBox>,
    #[serde(default, rename = "robots", alias = "cars")]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub storages: Vec<Storage>,
}

impl CreatedSimulation {
    pub fn into_parts(self) -> Result<(SessionHandle, SimulationState), SchemaError> {
        let handle = SessionHandle::new(self.location)?;
        let state = SimulationState {
            boxes: self.boxes,
            agents: self.agents,
            storages: self.storages,
        };
        state.validate()?;
        Ok((handle, state))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{Activity, BoxStatus, Heading, StorageTier};

    #[test]
    fn wildfire_request_carries_tunables() {
        let config = SimulationConfig::new(SimulationVariant::Wildfire, 80, 60, 40).with_wildfire(
            WildfireTunables {
                probability_of_spread: 55,
                south_wind_speed: -10,
                west_wind_speed: 20,
                big_jumps: true,
            },
        );
        let body = serde_json::to_value(config.to_request()).expect("serialize");
        assert_eq!(
            body,
            json!({
                "dim": [80, 60],
                "number": 40,
                "probability_of_spread": 55,
                "south_wind_speed": -10,
                "west_wind_speed": 20,
                "bigJumps": true
            })
        );
    }

    #[test]
    fn warehouse_request_sends_only_dimensions_and_count() {
        let config = SimulationConfig::new(SimulationVariant::Warehouse, 40, 40, 10);
        let body = serde_json::to_value(config.to_request()).expect("serialize");
        assert_eq!(body, json!({ "dim": [40, 40], "number": 10 }));
    }

    #[test]
    fn rejects_out_of_range_config() {
        let zero_width = SimulationConfig::new(SimulationVariant::Warehouse, 0, 40, 10);
        assert_eq!(zero_width.validate().expect_err("width").field, "width");

        let no_entities = SimulationConfig::new(SimulationVariant::Warehouse, 40, 40, 0);
        assert_eq!(no_entities.validate().expect_err("number").field, "number");

        let gusty = SimulationConfig::new(SimulationVariant::Wildfire, 40, 40, 10).with_wildfire(
            WildfireTunables {
                west_wind_speed: 51,
                ..WildfireTunables::default()
            },
        );
        assert_eq!(gusty.validate().expect_err("wind").field, "west_wind_speed");

        let hot = SimulationConfig::new(SimulationVariant::Wildfire, 40, 40, 10).with_wildfire(
            WildfireTunables {
                probability_of_spread: 101,
                ..WildfireTunables::default()
            },
        );
        assert_eq!(
            hot.validate().expect_err("probability").field,
            "probability_of_spread"
        );
    }

    #[test]
    fn warehouse_ignores_wildfire_tunables_during_validation() {
        let config = SimulationConfig::new(SimulationVariant::Warehouse, 40, 40, 10).with_wildfire(
            WildfireTunables {
                probability_of_spread: 200,
                ..WildfireTunables::default()
            },
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn decodes_state_with_cars_key_and_missing_storages() {
        let state: SimulationState = serde_json::from_value(json!({
            "boxes": [{ "id": 1, "pos": [3, 4], "status": "burning" }],
            "cars": [{ "id": 7, "pos": [1, 1], "orientation": 3, "stopped": "moving" }]
        }))
        .expect("decode");

        assert_eq!(state.boxes[0].status, BoxStatus::Burning);
        assert_eq!(state.agents[0].orientation, Heading::West);
        assert_eq!(state.agents[0].activity, Activity::Moving);
        assert!(state.storages.is_empty());
        assert!(state.validate().is_ok());
    }

    #[test]
    fn any_non_moving_activity_counts_as_stopped() {
        let state: SimulationState = serde_json::from_value(json!({
            "robots": [
                { "id": 1, "pos": [2, 2], "orientation": 0, "stopped": "stopped" },
                { "id": 2, "pos": [2, 3], "orientation": 1, "stopped": "idle" }
            ]
        }))
        .expect("decode");
        assert!(state.agents.iter().all(|agent| !agent.is_moving()));
    }

    #[test]
    fn non_string_activity_counts_as_stopped() {
        let state: SimulationState = serde_json::from_value(json!({
            "robots": [
                { "id": 1, "pos": [2, 2], "orientation": 0, "stopped": true },
                { "id": 2, "pos": [2, 3], "orientation": 1, "stopped": false },
                { "id": 3, "pos": [2, 4], "orientation": 2, "stopped": null },
                { "id": 4, "pos": [2, 5], "orientation": 3, "stopped": 1 }
            ]
        }))
        .expect("decode");
        assert_eq!(state.agents.len(), 4);
        assert!(state.agents.iter().all(|agent| agent.activity == Activity::Stopped));
    }

    #[test]
    fn rejects_orientation_outside_compass() {
        let decoded = serde_json::from_value::<SimulationState>(json!({
            "robots": [{ "id": 1, "pos": [2, 2], "orientation": 4, "stopped": "moving" }]
        }));
        assert!(decoded.is_err());
    }

    #[test]
    fn schema_validation_catches_duplicates_and_zero_coordinates() {
        let state: SimulationState = serde_json::from_value(json!({
            "boxes": [
                { "id": 1, "pos": [3, 4], "status": "pending" },
                { "id": 1, "pos": [5, 4], "status": "pending" }
            ]
        }))
        .expect("decode");
        assert_eq!(
            state.validate(),
            Err(SchemaError::DuplicateId { kind: "box", id: 1 })
        );

        let state: SimulationState = serde_json::from_value(json!({
            "storages": [{ "id": 9, "pos": [0, 4], "boxes": 2 }]
        }))
        .expect("decode");
        assert!(matches!(
            state.validate(),
            Err(SchemaError::OffGrid { kind: "storage", id: 9, .. })
        ));
    }

    #[test]
    fn created_simulation_splits_into_handle_and_state() {
        let created: CreatedSimulation = serde_json::from_value(json!({
            "Location": "/simulations/abc",
            "boxes": [{ "id": 1, "pos": [3, 4], "status": "pending" }],
            "robots": [],
            "storages": [{ "id": 2, "pos": [1, 1], "boxes": 5 }]
        }))
        .expect("decode");
        let (handle, state) = created.into_parts().expect("parts");
        assert_eq!(handle.as_str(), "/simulations/abc");
        assert_eq!(state.boxes.len(), 1);
        assert_eq!(state.storages[0].tier(), StorageTier::Full);
    }

    #[test]
    fn created_simulation_requires_location() {
        let created: CreatedSimulation =
            serde_json::from_value(json!({ "Location": "  ", "boxes": [] })).expect("decode");
        assert_eq!(
            created.into_parts().expect_err("empty location"),
            SchemaError::EmptyLocation
        );
    }
}
