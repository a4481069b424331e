//! RuleEngine: evaluates rules against events, state changes, and time,
//! and drives the ActionDispatcher (§4.6).

pub mod calendar;
pub mod error;
pub mod evaluator;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::action_dispatcher::{ActionDispatcher, ResolutionContext};
use crate::arena::Arena;
use crate::hub_events::{publish, HubEvent, HubEventSender};
use crate::persistence::{PersistenceStore, PersistenceStoreExt, Role};
use crate::types::{Event, Rule, RuleId, RuleKind, ThingId, Value};

pub use error::{Result, RuleEngineError};

/// Policy for how `removeRule` handles a rule referencing a removed
/// thing (§4.6); applied by the caller before invoking `remove_rule`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThingRemovalPolicy {
    Cascade,
    Update,
}

pub struct RuleEngine {
    rules: Arena<RuleId, Rule>,
    dispatcher: ActionDispatcher,
    events: HubEventSender,
    store: Arc<dyn PersistenceStore>,
}

impl RuleEngine {
    pub fn new(dispatcher: ActionDispatcher, events: HubEventSender, store: Arc<dyn PersistenceStore>) -> Self {
        Self {
            rules: Arena::new(),
            dispatcher,
            events,
            store,
        }
    }

    fn persist_rule(&self, rule: &Rule) {
        if let Err(e) = self
            .store
            .write_typed(Role::Rules, &rule.id.to_string(), "config", "rule", rule)
        {
            tracing::warn!(rule_id = %rule.id, error = %e, "failed to persist rule");
        }
    }

    fn forget_rule(&self, rule_id: RuleId) {
        let group = rule_id.to_string();
        let _ = self.store.remove_group(Role::Rules, &group);
        let _ = self.store.remove_group(Role::Tags, &group);
    }

    pub fn add_rule(&self, rule: Rule) -> Result<RuleId> {
        rule.kind().map_err(RuleEngineError::InvalidRuleFormat)?;
        for item in &rule.time_descriptor.calendar_items {
            item.validate().map_err(RuleEngineError::InvalidCalendarItem)?;
        }
        for item in &rule.time_descriptor.time_event_items {
            item.validate().map_err(RuleEngineError::InvalidTimeEventItem)?;
        }
        let id = rule.id;
        self.persist_rule(&rule);
        self.rules.insert(id, rule);
        publish(&self.events, HubEvent::RuleAdded(id));
        Ok(id)
    }

    pub fn edit_rule(&self, rule: Rule) -> Result<()> {
        let id = rule.id;
        if !self.rules.contains(&id) {
            return Err(RuleEngineError::RuleNotFound(id));
        }
        rule.kind().map_err(RuleEngineError::InvalidRuleFormat)?;
        self.persist_rule(&rule);
        self.rules.insert(id, rule);
        publish(&self.events, HubEvent::RuleConfigurationChanged(id));
        Ok(())
    }

    pub fn remove_rule(&self, rule_id: RuleId) -> Result<()> {
        self.rules
            .remove(&rule_id)
            .ok_or(RuleEngineError::RuleNotFound(rule_id))?;
        self.forget_rule(rule_id);
        publish(&self.events, HubEvent::RuleRemoved(rule_id));
        Ok(())
    }

    /// Loads every persisted rule back into the arena without
    /// re-publishing `RuleAdded`, for use during startup restoration.
    pub fn load_from_storage(&self) {
        for group in self.store.groups(Role::Rules) {
            if let Some(rule) = self.store.read_typed::<Rule>(Role::Rules, &group, "config", "rule") {
                self.rules.insert(rule.id, rule);
            }
        }
    }

    /// Prunes or cascades a thing reference out of every rule, per the
    /// caller's chosen per-rule policy.
    pub fn handle_thing_removed(&self, thing_id: ThingId, policies: &HashMap<RuleId, ThingRemovalPolicy>) {
        for rule_id in self.rules.ids() {
            let policy = policies.get(&rule_id).copied().unwrap_or(ThingRemovalPolicy::Update);
            let references = self.rules.with(&rule_id, |r| rule_references_thing(r, thing_id)).unwrap_or(false);
            if !references {
                continue;
            }
            match policy {
                ThingRemovalPolicy::Cascade => {
                    let _ = self.remove_rule(rule_id);
                }
                ThingRemovalPolicy::Update => {
                    let emptied = self.rules.with_mut(&rule_id, |r| {
                        prune_thing_references(r, thing_id);
                        r.event_descriptors.is_empty()
                            && r.state_evaluator.is_none()
                            && r.time_descriptor.is_empty()
                    });
                    if emptied == Some(true) {
                        let _ = self.remove_rule(rule_id);
                    } else {
                        if let Ok(rule) = self.rule(rule_id) {
                            self.persist_rule(&rule);
                        }
                        publish(&self.events, HubEvent::RuleConfigurationChanged(rule_id));
                    }
                }
            }
        }
    }

    pub fn set_enabled(&self, rule_id: RuleId, enabled: bool) -> Result<()> {
        self.rules
            .with_mut(&rule_id, |r| r.enabled = enabled)
            .ok_or(RuleEngineError::RuleNotFound(rule_id))?;
        publish(&self.events, HubEvent::RuleConfigurationChanged(rule_id));
        Ok(())
    }

    pub fn rule(&self, rule_id: RuleId) -> Result<Rule> {
        self.rules.get(&rule_id).ok_or(RuleEngineError::RuleNotFound(rule_id))
    }

    pub fn rules(&self) -> Vec<Rule> {
        self.rules.values()
    }

    pub fn find_rules(&self, thing_id: ThingId) -> Vec<RuleId> {
        self.rules
            .values()
            .into_iter()
            .filter(|r| rule_references_thing(r, thing_id))
            .map(|r| r.id)
            .collect()
    }

    pub async fn execute_actions(&self, rule_id: RuleId) -> Result<()> {
        let rule = self.rule(rule_id)?;
        if !rule.executable {
            return Err(RuleEngineError::InvalidRuleFormat("rule is not executable".into()));
        }
        self.dispatcher
            .dispatch_all(&rule.actions, &ResolutionContext::default())
            .await;
        Ok(())
    }

    pub async fn execute_exit_actions(&self, rule_id: RuleId) -> Result<()> {
        let rule = self.rule(rule_id)?;
        if !rule.executable {
            return Err(RuleEngineError::InvalidRuleFormat("rule is not executable".into()));
        }
        self.dispatcher
            .dispatch_all(&rule.exit_actions, &ResolutionContext::default())
            .await;
        Ok(())
    }

    /// Runs the per-tick evaluation algorithm (§4.6) for every enabled
    /// rule against `now`. Driven by `HubEvent::DateTimeChanged` (once
    /// per minute), not the per-second `Tick` -- a `TimeEventItem`
    /// matches its whole target minute, so ticking more than once a
    /// minute would redispatch the same time-event rule repeatedly.
    /// `things` is needed to evaluate StateEvaluator leaves.
    pub async fn on_tick(&self, now: DateTime<Utc>, things: &crate::thing_manager::ThingManager) {
        for rule_id in self.rules.ids() {
            let Some(rule) = self.rules.get(&rule_id) else { continue };
            if !rule.enabled {
                continue;
            }
            self.evaluate_rule_for_tick(rule, now, things).await;
        }
    }

    async fn evaluate_rule_for_tick(&self, rule: Rule, now: DateTime<Utc>, things: &crate::thing_manager::ThingManager) {
        let calendar_active = calendar::calendar_descriptor_active(&rule.time_descriptor.calendar_items, now);
        let state_active = rule
            .state_evaluator
            .as_ref()
            .map(|e| evaluator::evaluate(e, things))
            .unwrap_or(true);

        let fired_time_event = rule
            .time_descriptor
            .time_event_items
            .iter()
            .any(|item| calendar::time_event_item_fires(item, now));

        match rule.kind() {
            Ok(RuleKind::StateBased) => {
                let new_active = rule.enabled && calendar_active && state_active;
                if new_active != rule.active {
                    self.rules.with_mut(&rule.id, |r| {
                        r.active = new_active;
                        r.last_active_change = Some(now);
                    });
                    publish(
                        &self.events,
                        HubEvent::RuleActiveChanged {
                            rule_id: rule.id,
                            active: new_active,
                        },
                    );
                    let actions = if new_active { &rule.actions } else { &rule.exit_actions };
                    self.dispatcher.dispatch_all(actions, &ResolutionContext::default()).await;
                }
            }
            Ok(RuleKind::EventBased) | Ok(RuleKind::Mixed) => {
                if fired_time_event && calendar_active && state_active {
                    debug!(rule_id = %rule.id, "time event fired rule actions");
                    self.dispatcher.dispatch_all(&rule.actions, &ResolutionContext::default()).await;
                }
            }
            Err(_) => {}
        }
    }

    /// Handles a plugin-sourced event (and its synthesized
    /// stateChanged companion) reaching any event-based or mixed rule
    /// whose eventDescriptors match. `now` is the hub's current time
    /// (`TimeManager::current_date_time`), not wall-clock time, so a
    /// calendar gate respects a test's time override (§4.5/§4.6).
    pub async fn on_event(&self, event: &Event, now: DateTime<Utc>, things: &crate::thing_manager::ThingManager) {
        for rule_id in self.rules.ids() {
            let Some(rule) = self.rules.get(&rule_id) else { continue };
            if !rule.enabled {
                continue;
            }
            if !rule
                .event_descriptors
                .iter()
                .any(|d| event_descriptor_matches(d, event))
            {
                continue;
            }
            let calendar_active = calendar::calendar_descriptor_active(&rule.time_descriptor.calendar_items, now);
            let state_active = rule
                .state_evaluator
                .as_ref()
                .map(|e| evaluator::evaluate(e, things))
                .unwrap_or(true);
            if calendar_active && state_active {
                let ctx = ResolutionContext {
                    triggering_event: Some(event),
                };
                publish(&self.events, HubEvent::EventTriggered(event.clone()));
                self.dispatcher.dispatch_all(&rule.actions, &ctx).await;
            }
        }
    }
}

fn event_descriptor_matches(descriptor: &crate::types::EventDescriptor, event: &Event) -> bool {
    if descriptor.thing_id != event.thing_id || descriptor.event_type_id != event.event_type_id {
        return false;
    }
    descriptor.param_values.iter().all(|(param_type_id, op, expected)| {
        event
            .params
            .get(param_type_id)
            .map(|actual| evaluator_compare(actual, *op, expected))
            .unwrap_or(false)
    })
}

fn evaluator_compare(actual: &Value, op: crate::types::ComparisonOperator, expected: &Value) -> bool {
    use crate::types::ComparisonOperator::*;
    use std::cmp::Ordering::*;
    match (op, actual.partial_compare(expected)) {
        (Eq, Some(Equal)) => true,
        (Neq, Some(o)) => o != Equal,
        (Lt, Some(Less)) => true,
        (Lte, Some(Less | Equal)) => true,
        (Gt, Some(Greater)) => true,
        (Gte, Some(Greater | Equal)) => true,
        _ => false,
    }
}

fn rule_references_thing(rule: &Rule, thing_id: ThingId) -> bool {
    rule.event_descriptors.iter().any(|d| d.thing_id == thing_id)
        || matches!(
            &rule.state_evaluator,
            Some(e) if state_evaluator_references(e, thing_id)
        )
        || rule.actions.iter().any(|a| action_references_thing(a, thing_id))
        || rule.exit_actions.iter().any(|a| action_references_thing(a, thing_id))
}

fn state_evaluator_references(evaluator: &crate::types::StateEvaluator, thing_id: ThingId) -> bool {
    match evaluator {
        crate::types::StateEvaluator::Leaf(d) => {
            matches!(&d.target, crate::types::StateTarget::Thing { thing_id: t, .. } if *t == thing_id)
        }
        crate::types::StateEvaluator::Node { children, .. } => {
            children.iter().any(|c| state_evaluator_references(c, thing_id))
        }
    }
}

fn action_references_thing(action: &crate::types::RuleAction, thing_id: ThingId) -> bool {
    matches!(&action.target, crate::types::RuleActionTarget::Thing { thing_id: t, .. } if *t == thing_id)
}

fn prune_thing_references(rule: &mut Rule, thing_id: ThingId) {
    rule.event_descriptors.retain(|d| d.thing_id != thing_id);
    rule.actions.retain(|a| !action_references_thing(a, thing_id));
    rule.exit_actions.retain(|a| !action_references_thing(a, thing_id));
    if matches!(&rule.state_evaluator, Some(e) if state_evaluator_references(e, thing_id)) {
        rule.state_evaluator = None;
    }
}
