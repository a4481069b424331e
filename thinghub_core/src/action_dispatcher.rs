//! ActionDispatcher: converts a `RuleAction` into one or more concrete
//! `Action`/browser-item invocations and forwards them to ThingManager,
//! collecting result statuses without letting one failure cancel its
//! siblings (§4.7).

use std::sync::Arc;

use tracing::warn;

use crate::thing_manager::ThingManager;
use crate::types::{
    ActionExecutionStatus, ParamMap, RuleAction, RuleActionParamValue, RuleActionTarget,
    ThingId, Trigger, Value,
};

pub struct ActionDispatcher {
    things: Arc<ThingManager>,
}

/// Context available while resolving a RuleAction's params: the event
/// that triggered an event-based rule, if any.
#[derive(Default)]
pub struct ResolutionContext<'a> {
    pub triggering_event: Option<&'a crate::types::Event>,
}

impl ActionDispatcher {
    pub fn new(things: Arc<ThingManager>) -> Self {
        Self { things }
    }

    fn resolve_params(
        &self,
        action: &RuleAction,
        thing_id: ThingId,
        ctx: &ResolutionContext,
    ) -> ParamMap {
        let mut params = ParamMap::new();
        for p in &action.params {
            let value: Option<Value> = match &p.value {
                RuleActionParamValue::Value(v) => Some(v.clone()),
                RuleActionParamValue::Event {
                    event_type_id,
                    event_param_type_id,
                } => ctx.triggering_event.and_then(|event| {
                    if event.event_type_id == *event_type_id {
                        event.params.get(event_param_type_id).cloned()
                    } else {
                        None
                    }
                }),
                RuleActionParamValue::State {
                    state_thing_id,
                    state_type_id,
                } => self
                    .things
                    .thing(*state_thing_id)
                    .ok()
                    .and_then(|t| t.state_value(*state_type_id).cloned())
                    .or_else(|| {
                        // Fall back to the acting thing's own state if the
                        // RuleActionParam references it implicitly.
                        self.things
                            .thing(thing_id)
                            .ok()
                            .and_then(|t| t.state_value(*state_type_id).cloned())
                    }),
            };
            if let Some(value) = value {
                params.insert(p.param_type_id, value);
            }
        }
        params
    }

    /// Executes one RuleAction, fanning out to every thing implementing
    /// an interface-addressed action. Returns one status per concrete
    /// invocation.
    pub async fn dispatch(&self, action: &RuleAction, ctx: &ResolutionContext<'_>) -> Vec<ActionExecutionStatus> {
        match &action.target {
            RuleActionTarget::Thing { thing_id, action_type_id } => {
                let params = self.resolve_params(action, *thing_id, ctx);
                match self
                    .things
                    .execute_action(*thing_id, *action_type_id, params, Trigger::Rule)
                    .await
                {
                    Ok(status) => vec![status],
                    Err(e) => {
                        warn!(error = %e, "rule action failed");
                        vec![ActionExecutionStatus::Failure]
                    }
                }
            }
            RuleActionTarget::Interface { interface, interface_action } => {
                let things = self.things.operational_things_implementing(interface);
                let mut statuses = Vec::with_capacity(things.len());
                for thing in things {
                    let Some(action_type_id) = self
                        .things
                        .registry()
                        .action_type_id_by_name(thing.thing_class_id, interface_action)
                    else {
                        continue;
                    };
                    let params = self.resolve_params(action, thing.id, ctx);
                    match self
                        .things
                        .execute_action(thing.id, action_type_id, params, Trigger::Rule)
                        .await
                    {
                        Ok(status) => statuses.push(status),
                        Err(e) => {
                            warn!(thing_id = %thing.id, error = %e, "rule action failed for interface fan-out");
                            statuses.push(ActionExecutionStatus::Failure);
                        }
                    }
                }
                statuses
            }
            RuleActionTarget::Browser { thing_id, browser_item_id } => {
                match self.things.execute_browser_item(*thing_id, browser_item_id.clone()).await {
                    Ok(status) => vec![status],
                    Err(e) => {
                        warn!(thing_id = %thing_id, error = %e, "rule browser-item action failed");
                        vec![ActionExecutionStatus::Failure]
                    }
                }
            }
        }
    }

    pub async fn dispatch_all(&self, actions: &[RuleAction], ctx: &ResolutionContext<'_>) -> Vec<ActionExecutionStatus> {
        let mut all = Vec::new();
        for action in actions {
            all.extend(self.dispatch(action, ctx).await);
        }
        all
    }
}
