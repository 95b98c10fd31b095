use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(BoxId);
id_newtype!(AgentId);
id_newtype!(StorageId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimulationVariant {
    #[default]
    Warehouse,
    Wildfire,
}

impl fmt::Display for SimulationVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warehouse => f.write_str("warehouse"),
            Self::Wildfire => f.write_str("wildfire"),
        }
    }
}

/// Grid cell, 1-based on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
}

impl GridPos {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn is_on_grid(&self) -> bool {
        self.x >= 1 && self.y >= 1
    }
}

impl From<[u32; 2]> for GridPos {
    fn from([x, y]: [u32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<GridPos> for [u32; 2] {
    fn from(pos: GridPos) -> Self {
        [pos.x, pos.y]
    }
}

/// One of four discrete headings, 90 degrees apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Heading {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::North, Heading::East, Heading::South, Heading::West];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn degrees(self) -> u16 {
        u16::from(self.index()) * 90
    }
}

impl TryFrom<u8> for Heading {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::North),
            1 => Ok(Self::East),
            2 => Ok(Self::South),
            3 => Ok(Self::West),
            other => Err(format!("orientation must be 0..=3, got {other}")),
        }
    }
}

impl From<Heading> for u8 {
    fn from(heading: Heading) -> Self {
        heading.index()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxStatus {
    Pending,
    Delivered,
    Burning,
    Burnt,
}

/// Only the string `"moving"` counts as moving; any other wire value is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "WireActivity", into = "String")]
pub enum Activity {
    Moving,
    Stopped,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireActivity {
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl From<WireActivity> for Activity {
    fn from(value: WireActivity) -> Self {
        match value {
            WireActivity::Text(text) => text.into(),
            WireActivity::Other(_) => Self::Stopped,
        }
    }
}

impl From<String> for Activity {
    fn from(value: String) -> Self {
        if value == "moving" {
            Self::Moving
        } else {
            Self::Stopped
        }
    }
}

impl From<Activity> for String {
    fn from(activity: Activity) -> Self {
        match activity {
            Activity::Moving => "moving".to_string(),
            Activity::Stopped => "stopped".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBox {
    pub id: BoxId,
    pub pos: GridPos,
    pub status: BoxStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub pos: GridPos,
    pub orientation: Heading,
    #[serde(rename = "stopped")]
    pub activity: Activity,
}

impl Agent {
    pub fn is_moving(&self) -> bool {
        self.activity == Activity::Moving
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageTier {
    Empty,
    Low,
    High,
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub id: StorageId,
    pub pos: GridPos,
    pub boxes: u32,
}

impl Storage {
    /// Rendering bucket for the stack height.
    pub fn tier(&self) -> StorageTier {
        match self.boxes {
            0 => StorageTier::Empty,
            1..=2 => StorageTier::Low,
            3..=4 => StorageTier::High,
            _ => StorageTier::Full,
        }
    }
}
