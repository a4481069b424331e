//! StateType and ActionType/EventType definitions.

use serde::{Deserialize, Serialize};

use super::ids::{ActionTypeId, EventTypeId, ParamTypeId, StateTypeId};
use super::param::{ParamType, SemanticType, Value};

/// Describes one state slot of a ThingClass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateType {
    pub id: StateTypeId,
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    pub default_value: Value,
    pub min_value: Option<Value>,
    pub max_value: Option<Value>,
    #[serde(default)]
    pub allowed_values: Vec<Value>,
    pub unit: Option<String>,
    /// Whether the last value is persisted across restarts.
    #[serde(default)]
    pub cached: bool,
    /// Whether this state can also be driven by an action (the registry
    /// synthesizes a matching ActionType when this is set).
    #[serde(default)]
    pub writable: bool,
    pub display_name_event: String,
    pub display_name_action: Option<String>,
}

/// Describes one action or event parameter list, shared shape for both
/// ActionType and EventType (the original system keeps these distinct
/// structs that only differ in name, mirrored here as two thin aliases
/// over the same fields to keep call sites self-documenting).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionType {
    pub id: ActionTypeId,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub param_types: Vec<ParamType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventType {
    pub id: EventTypeId,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub param_types: Vec<ParamType>,
}

impl StateType {
    /// The id shared by the synthesized "stateChanged" EventType, and,
    /// when writable, the synthesized ActionType (§4.1).
    pub fn synthesized_event_type(&self) -> EventType {
        EventType {
            id: EventTypeId(self.id.0),
            name: format!("{}Changed", self.name),
            display_name: self.display_name_event.clone(),
            param_types: vec![ParamType {
                id: ParamTypeId(self.id.0),
                name: self.name.clone(),
                display_name: self.display_name.clone(),
                semantic_type: self.semantic_type,
                default_value: Some(self.default_value.clone()),
                min_value: self.min_value.clone(),
                max_value: self.max_value.clone(),
                allowed_values: self.allowed_values.clone(),
                unit: self.unit.clone(),
                input_type: Default::default(),
                read_only: false,
                index: 0,
            }],
        }
    }

    pub fn synthesized_action_type(&self) -> Option<ActionType> {
        if !self.writable {
            return None;
        }
        Some(ActionType {
            id: ActionTypeId(self.id.0),
            name: self.name.clone(),
            display_name: self
                .display_name_action
                .clone()
                .unwrap_or_else(|| self.display_name.clone()),
            param_types: vec![ParamType {
                id: ParamTypeId(self.id.0),
                name: self.name.clone(),
                display_name: self.display_name.clone(),
                semantic_type: self.semantic_type,
                default_value: Some(self.default_value.clone()),
                min_value: self.min_value.clone(),
                max_value: self.max_value.clone(),
                allowed_values: self.allowed_values.clone(),
                unit: self.unit.clone(),
                input_type: Default::default(),
                read_only: false,
                index: 0,
            }],
        })
    }
}
