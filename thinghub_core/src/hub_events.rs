//! HubEvent: the notification set published to external subscribers
//! (transport servers, tests) over a `tokio::sync::broadcast` channel
//! (§6 "Notifications published").

use chrono::{DateTime, Utc};

use crate::types::{
    ParamTypeId, RuleId, StateTypeId, Thing, ThingId, Value,
};

#[derive(Debug, Clone)]
pub enum HubEvent {
    ThingAdded(Thing),
    ThingRemoved(ThingId),
    ThingChanged(Thing),
    ThingSettingChanged {
        thing_id: ThingId,
        param_type_id: ParamTypeId,
        value: Value,
    },
    StateChanged {
        thing_id: ThingId,
        state_type_id: StateTypeId,
        value: Value,
    },
    EventTriggered(crate::types::Event),
    RuleAdded(RuleId),
    RuleRemoved(RuleId),
    RuleActiveChanged {
        rule_id: RuleId,
        active: bool,
    },
    RuleConfigurationChanged(RuleId),
    PluginConfigChanged(crate::types::PluginId),
    Tick(DateTime<Utc>),
    DateTimeChanged(DateTime<Utc>),
}

pub type HubEventSender = tokio::sync::broadcast::Sender<HubEvent>;
pub type HubEventReceiver = tokio::sync::broadcast::Receiver<HubEvent>;

/// Publishes to a broadcast sender, swallowing the "no subscribers"
/// error the way a fire-and-forget notification should.
pub fn publish(tx: &HubEventSender, event: HubEvent) {
    let _ = tx.send(event);
}
