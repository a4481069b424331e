use thiserror::Error;

use crate::types::{PluginId, ThingId};

#[derive(Debug, Error)]
pub enum PluginHostError {
    #[error("plugin not found: {0}")]
    NotFound(PluginId),

    #[error("failed to read plugin manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse plugin manifest: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid plugin manifest: {0}")]
    InvalidManifest(String),

    #[error("plugin api version {found} unsupported (core supports {core_major}.{core_minor})")]
    UnsupportedApiVersion {
        found: String,
        core_major: u32,
        core_minor: u32,
    },

    #[error("plugin call timed out")]
    Timeout,

    #[error("thing {0} is not owned by a loaded plugin")]
    OrphanedThing(ThingId),

    #[error("plugin runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, PluginHostError>;
