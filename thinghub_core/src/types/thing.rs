//! Thing: a configured device or service instance, and its setup state
//! machine (§4.4).

use serde::{Deserialize, Serialize};

use super::ids::{ParamTypeId, PluginId, StateTypeId, ThingClassId, ThingId};
use super::param::{ParamMap, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SetupStatus {
    None,
    InProgress,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thing {
    pub id: ThingId,
    pub thing_class_id: ThingClassId,
    pub plugin_id: PluginId,
    pub name: String,
    pub parent_id: Option<ThingId>,
    /// Immutable once setup completes.
    pub params: ParamMap,
    /// User-mutable, validated against `settingsTypes`.
    pub settings: ParamMap,
    pub states: std::collections::HashMap<StateTypeId, Value>,
    pub auto_created: bool,
    pub setup_status: SetupStatus,
    pub setup_error: Option<String>,
    pub setup_display_message: Option<String>,
}

impl Thing {
    pub fn new(
        id: ThingId,
        thing_class_id: ThingClassId,
        plugin_id: PluginId,
        name: String,
        parent_id: Option<ThingId>,
        params: ParamMap,
        auto_created: bool,
    ) -> Self {
        Self {
            id,
            thing_class_id,
            plugin_id,
            name,
            parent_id,
            params,
            settings: ParamMap::new(),
            states: std::collections::HashMap::new(),
            auto_created,
            setup_status: SetupStatus::None,
            setup_error: None,
            setup_display_message: None,
        }
    }

    /// Only things in `Complete` are eligible sources of events, state
    /// changes, and action targets for rules (§4.4).
    pub fn is_operational(&self) -> bool {
        self.setup_status == SetupStatus::Complete
    }

    pub fn state_value(&self, state_type_id: StateTypeId) -> Option<&Value> {
        self.states.get(&state_type_id)
    }

    pub fn set_state_value(&mut self, state_type_id: StateTypeId, value: Value) -> bool {
        let changed = self.states.get(&state_type_id) != Some(&value);
        self.states.insert(state_type_id, value);
        changed
    }

    pub fn param_value(&self, param_type_id: ParamTypeId) -> Option<&Value> {
        self.params.get(&param_type_id)
    }
}
