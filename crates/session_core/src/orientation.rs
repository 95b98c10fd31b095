use std::collections::{HashMap, HashSet};

use shared::domain::{Agent, AgentId, Heading};

/// Rotation a renderer applies to an agent sprite for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    /// First sighting: heading mapped straight to an angle, no interpolation.
    Absolute(u16),
    /// Clockwise turn since the previous snapshot, always one of 0, 90, 180, 270.
    Delta(u16),
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Self::Absolute(degrees) | Self::Delta(degrees) => degrees,
        }
    }
}

pub fn rotation_between(previous: Option<Heading>, current: Heading) -> Rotation {
    match previous {
        None => Rotation::Absolute(current.degrees()),
        Some(previous) => {
            let steps = (current.index() + 4 - previous.index()) % 4;
            Rotation::Delta(u16::from(steps) * 90)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPose {
    pub agent: Agent,
    pub rotation: Rotation,
}

/// Last observed heading per agent for the current run.
#[derive(Debug, Default, Clone)]
pub struct OrientationMemory {
    last_seen: HashMap<AgentId, Heading>,
}

impl OrientationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes each agent's rotation, then records its heading and forgets agents not present.
    pub fn observe(&mut self, agents: Vec<Agent>) -> Vec<AgentPose> {
        let present: HashSet<AgentId> = agents.iter().map(|agent| agent.id).collect();
        self.last_seen.retain(|id, _| present.contains(id));

        agents
            .into_iter()
            .map(|agent| {
                let rotation =
                    rotation_between(self.last_seen.get(&agent.id).copied(), agent.orientation);
                self.last_seen.insert(agent.id, agent.orientation);
                AgentPose { agent, rotation }
            })
            .collect()
    }

    pub fn heading_of(&self, id: AgentId) -> Option<Heading> {
        self.last_seen.get(&id).copied()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.last_seen.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.last_seen.clear();
    }
}

#[cfg(test)]
#[path = "tests/orientation_tests.rs"]
mod tests;
