//! Vendor and Plugin: static metadata loaded from a plugin's manifest.

use serde::{Deserialize, Serialize};

use super::ids::{PluginId, VendorId};
use super::param::ParamType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plugin {
    pub id: PluginId,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub params: Vec<ParamType>,
    /// Semver-ish API version the plugin was built against; checked at
    /// load time against the host's supported range (§4.3).
    pub api_version: String,
}
