use thiserror::Error;

use crate::kingdom::registry::WorldKey;

#[derive(Error, Debug)]
pub enum KingdomError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unsupported save version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("No world registered under {0}")]
    UnknownWorld(WorldKey),

    #[error("World {0} already has a kingdom")]
    AlreadyFounded(WorldKey),
}

pub type Result<T> = std::result::Result<T, KingdomError>;
