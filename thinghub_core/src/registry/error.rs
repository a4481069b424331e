use thiserror::Error;

use crate::types::{PluginId, ThingClassId, VendorId};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("vendor not found: {0}")]
    VendorNotFound(VendorId),

    #[error("plugin not found: {0}")]
    PluginNotFound(PluginId),

    #[error("thing class not found: {0}")]
    ThingClassNotFound(ThingClassId),

    #[error("invalid plugin metadata: {0}")]
    InvalidMetadata(String),

    #[error("plugin api version {found} is not supported (expected {expected})")]
    UnsupportedApiVersion { found: String, expected: String },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
