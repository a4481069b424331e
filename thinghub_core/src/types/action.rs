//! Action and Event: transient payloads routed between ThingManager,
//! PluginHost and RuleEngine.

use serde::{Deserialize, Serialize};

use super::ids::{ActionTypeId, EventTypeId, ThingId};
use super::param::ParamMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    User,
    Rule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub action_type_id: ActionTypeId,
    pub thing_id: ThingId,
    pub params: ParamMap,
    pub trigger: Trigger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type_id: EventTypeId,
    pub thing_id: ThingId,
    pub params: ParamMap,
    /// Set when this event is the synthesized "stateChanged" companion
    /// of a state value write, rather than a plugin-originated event.
    pub is_state_change: bool,
}

/// Result of one executed Action, as surfaced through
/// `actionFinished`/`ActionInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionExecutionStatus {
    Success,
    Failure,
}
