//! Derived figures and end-of-run detection. Both are pure functions of one state.

use shared::{
    domain::{BoxStatus, SimulationVariant},
    protocol::SimulationState,
};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    pub total_boxes: usize,
    pub pending: usize,
    pub delivered: usize,
    pub burning: usize,
    pub burnt: usize,
    /// Boxes not yet in the variant's completed status.
    pub remaining: usize,
    pub completion_percent: f64,
    pub agents_moving: usize,
    pub agents_stopped: usize,
    pub stored_boxes: u64,
}

impl Metrics {
    pub fn compute(variant: SimulationVariant, state: &SimulationState) -> Self {
        let mut metrics = Metrics {
            total_boxes: state.boxes.len(),
            ..Metrics::default()
        };
        for grid_box in &state.boxes {
            match grid_box.status {
                BoxStatus::Pending => metrics.pending += 1,
                BoxStatus::Delivered => metrics.delivered += 1,
                BoxStatus::Burning => metrics.burning += 1,
                BoxStatus::Burnt => metrics.burnt += 1,
            }
        }
        metrics.agents_moving = state.agents.iter().filter(|agent| agent.is_moving()).count();
        metrics.agents_stopped = state.agents.len() - metrics.agents_moving;
        metrics.stored_boxes = state
            .storages
            .iter()
            .map(|storage| u64::from(storage.boxes))
            .sum();

        let completed = match variant {
            SimulationVariant::Warehouse => metrics.delivered,
            SimulationVariant::Wildfire => metrics.burnt,
        };
        metrics.remaining = metrics.total_boxes - completed;
        metrics.completion_percent = if metrics.total_boxes == 0 {
            0.0
        } else {
            completed as f64 * 100.0 / metrics.total_boxes as f64
        };
        metrics
    }

    pub fn completion_fraction(&self) -> f64 {
        self.completion_percent / 100.0
    }

    pub fn completion_label(&self) -> String {
        format!("{:.2}", self.completion_percent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationRule {
    /// Every robot has parked, or every box reached its storage.
    AgentsIdleOrAllDelivered,
    /// Nothing is burning any more.
    FireBurnedOut,
}

impl TerminationRule {
    pub fn for_variant(variant: SimulationVariant) -> Self {
        match variant {
            SimulationVariant::Warehouse => Self::AgentsIdleOrAllDelivered,
            SimulationVariant::Wildfire => Self::FireBurnedOut,
        }
    }

    pub fn is_met(self, state: &SimulationState) -> bool {
        match self {
            Self::AgentsIdleOrAllDelivered => {
                let agents_idle = !state.agents.is_empty()
                    && state.agents.iter().all(|agent| !agent.is_moving());
                let all_delivered = !state.boxes.is_empty()
                    && state
                        .boxes
                        .iter()
                        .all(|grid_box| grid_box.status == BoxStatus::Delivered);
                agents_idle || all_delivered
            }
            Self::FireBurnedOut => {
                !state.boxes.is_empty()
                    && state
                        .boxes
                        .iter()
                        .all(|grid_box| grid_box.status != BoxStatus::Burning)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/metrics_tests.rs"]
mod tests;
