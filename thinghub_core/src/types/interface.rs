//! Interface definitions: named capability sets a ThingClass may claim.

use serde::{Deserialize, Serialize};

/// A named capability set. Interfaces are bundled declarative data, not
/// plugin-supplied, and are immutable once the registry loads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    #[serde(default)]
    pub required_states: Vec<String>,
    #[serde(default)]
    pub required_actions: Vec<String>,
    #[serde(default)]
    pub required_events: Vec<String>,
    #[serde(default)]
    pub parent_interfaces: Vec<String>,
}
