//! The on-disk declarative document a plugin ships: vendors, thing
//! classes and the plugin's own identity, all loaded from TOML.

use serde::{Deserialize, Serialize};

use crate::types::{Plugin, ThingClass, Vendor};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifestDoc {
    pub plugin: Plugin,
    #[serde(default)]
    pub vendors: Vec<Vendor>,
    #[serde(default)]
    pub thing_classes: Vec<ThingClass>,
}

impl PluginManifestDoc {
    /// Mandatory-field checks that can't be expressed through serde
    /// alone. Per-class/vendor problems are reported individually so the
    /// caller can skip just the offending entries rather than failing
    /// the whole manifest (§4.1).
    pub fn validate(&self) -> Result<(), String> {
        if self.plugin.name.is_empty() {
            return Err("plugin name cannot be empty".into());
        }
        if self.plugin.api_version.is_empty() {
            return Err("plugin apiVersion cannot be empty".into());
        }
        Ok(())
    }
}
