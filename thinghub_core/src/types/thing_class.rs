//! ThingClass: the immutable type/schema a thing conforms to.

use serde::{Deserialize, Serialize};

use super::ids::{PluginId, ThingClassId, VendorId};
use super::param::ParamType;
use super::state::{ActionType, EventType, StateType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreateMethod {
    User,
    Discovery,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SetupMethod {
    JustAdd,
    DisplayPin,
    EnterPin,
    PushButton,
    UserAndPassword,
    OAuth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThingClass {
    pub id: ThingClassId,
    pub vendor_id: VendorId,
    pub plugin_id: PluginId,
    pub name: String,
    pub display_name: String,
    pub create_methods: Vec<CreateMethod>,
    pub setup_method: SetupMethod,
    #[serde(default)]
    pub param_types: Vec<ParamType>,
    #[serde(default)]
    pub settings_types: Vec<ParamType>,
    #[serde(default)]
    pub discovery_param_types: Vec<ParamType>,
    #[serde(default)]
    pub state_types: Vec<StateType>,
    #[serde(default)]
    pub action_types: Vec<ActionType>,
    #[serde(default)]
    pub event_types: Vec<EventType>,
    /// Interface names the class claims to implement. The registry
    /// validates and may drop entries here that don't check out (§4.1);
    /// this field holds the class's declared *intent*, the registry
    /// keeps the validated subset separately.
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub browsable: bool,
}

impl ThingClass {
    pub fn state_type(&self, id: super::ids::StateTypeId) -> Option<&StateType> {
        self.state_types.iter().find(|s| s.id == id)
    }

    pub fn action_type(&self, id: super::ids::ActionTypeId) -> Option<&ActionType> {
        self.action_types.iter().find(|a| a.id == id)
    }

    pub fn event_type(&self, id: super::ids::EventTypeId) -> Option<&EventType> {
        self.event_types.iter().find(|e| e.id == id)
    }

    pub fn supports_create_method(&self, method: CreateMethod) -> bool {
        self.create_methods.contains(&method)
    }
}
