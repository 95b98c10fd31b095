use thiserror::Error;

/// Out-of-range value supplied while building a simulation config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {message}")]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl ConfigError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Engine payload that parsed as JSON but breaks the entity schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{kind} {id} has position outside the grid: [{x}, {y}]")]
    OffGrid {
        kind: &'static str,
        id: i64,
        x: u32,
        y: u32,
    },
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: i64 },
    #[error("session location must not be empty")]
    EmptyLocation,
}
