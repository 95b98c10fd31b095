use chrono::{DateTime, Utc};
use shared::{
    domain::{GridBox, SimulationVariant, Storage},
    protocol::SimulationState,
};

use crate::{
    metrics::Metrics,
    orientation::{AgentPose, OrientationMemory},
};

/// One complete, immutable view of the simulation, published once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub iteration: u64,
    pub variant: SimulationVariant,
    pub captured_at: DateTime<Utc>,
    pub boxes: Vec<GridBox>,
    pub agents: Vec<AgentPose>,
    pub storages: Vec<Storage>,
    pub metrics: Metrics,
}

impl Snapshot {
    pub(crate) fn build(
        iteration: u64,
        variant: SimulationVariant,
        state: SimulationState,
        orientation: &mut OrientationMemory,
    ) -> Self {
        let metrics = Metrics::compute(variant, &state);
        let SimulationState {
            boxes,
            agents,
            storages,
        } = state;
        Self {
            iteration,
            variant,
            captured_at: Utc::now(),
            boxes,
            agents: orientation.observe(agents),
            storages,
            metrics,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.boxes.len() + self.agents.len() + self.storages.len()
    }
}
