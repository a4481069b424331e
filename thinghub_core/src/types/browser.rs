//! BrowserItem / BrowserItemAction: transient results of a plugin's
//! `browse`/`browserItem` calls for browsable thing classes.

use serde::{Deserialize, Serialize};

use super::ids::ThingId;
use super::param::ParamType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserItem {
    pub item_id: String,
    pub thing_id: ThingId,
    pub display_name: String,
    pub description: String,
    pub icon: Option<String>,
    pub executable: bool,
    pub browsable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserItemAction {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub param_types: Vec<ParamType>,
}
