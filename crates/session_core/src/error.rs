use shared::error::{ConfigError, SchemaError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("simulation engine unreachable: {0}")]
    Unreachable(String),
    #[error("malformed engine response: {0}")]
    Malformed(String),
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// Poll loops keep running through these.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Malformed(_))
    }
}

impl From<ConfigError> for ClientError {
    fn from(value: ConfigError) -> Self {
        Self::InvalidConfig(value.to_string())
    }
}

impl From<SchemaError> for ClientError {
    fn from(value: SchemaError) -> Self {
        Self::Malformed(value.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::Unreachable(format!("request timed out: {value}"))
        } else if value.is_decode() {
            Self::Malformed(value.to_string())
        } else {
            Self::Unreachable(value.to_string())
        }
    }
}
