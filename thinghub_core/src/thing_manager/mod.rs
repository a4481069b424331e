//! ThingManager: owns the live Thing set, drives the setup state
//! machine, and is the single writer of thing-related persisted state
//! (§4.4).

pub mod error;
pub mod param_validator;

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{info, warn};

use crate::arena::Arena;
use crate::async_ops::OpKind;
use crate::hub_events::{publish, HubEvent, HubEventSender};
use crate::persistence::{PersistenceStore, PersistenceStoreExt, Role};
use crate::plugin_host::PluginHost;
use crate::registry::TypeRegistry;
use crate::translation::TranslationService;
use crate::types::{
    Action, ActionExecutionStatus, PairingTransaction, PairingTransactionId, ParamMap,
    ParamTypeId, PluginId, SetupStatus, StateTypeId, Thing, ThingClassId, ThingDescriptor,
    ThingDescriptorId, ThingId, Trigger, Value,
};

pub use error::{Result, ThingManagerError};
use param_validator::{validate, ParamSource};

/// A pending discovery result, evicted after `DISCOVERY_TTL` unless a
/// caller adds the described thing first (§4.4).
struct CachedDescriptor {
    descriptor: ThingDescriptor,
    expires_at: std::time::Instant,
}

const DISCOVERY_TTL: std::time::Duration = std::time::Duration::from_secs(30);

pub struct ThingManager {
    registry: TypeRegistry,
    plugin_host: Arc<PluginHost>,
    things: Arena<ThingId, Thing>,
    descriptors: Arena<ThingDescriptorId, CachedDescriptor>,
    pairings: Arena<PairingTransactionId, PairingTransaction>,
    events: HubEventSender,
    store: Arc<dyn PersistenceStore>,
    translations: Arc<TranslationService>,
}

impl ThingManager {
    pub fn new(
        registry: TypeRegistry,
        plugin_host: Arc<PluginHost>,
        events: HubEventSender,
        store: Arc<dyn PersistenceStore>,
        translations: Arc<TranslationService>,
    ) -> Self {
        Self {
            registry,
            plugin_host,
            things: Arena::new(),
            descriptors: Arena::new(),
            pairings: Arena::new(),
            events,
            store,
            translations,
        }
    }

    /// Writes the thing's full configuration to the `Things` role, the
    /// unit the §4.4 "retained in storage but not instantiated" rule
    /// operates on.
    fn persist_thing(&self, thing: &Thing) {
        if let Err(e) = self
            .store
            .write_typed(Role::Things, &thing.id.to_string(), "config", "thing", thing)
        {
            warn!(thing_id = %thing.id, error = %e, "failed to persist thing configuration");
        }
    }

    fn persist_state(&self, thing_id: ThingId, state_type_id: StateTypeId, value: &Value) {
        if let Err(e) = self.store.write_typed(
            Role::ThingStates,
            &thing_id.to_string(),
            "states",
            &state_type_id.to_string(),
            value,
        ) {
            warn!(%thing_id, %state_type_id, error = %e, "failed to persist cached state");
        }
    }

    pub fn thing(&self, id: ThingId) -> Result<Thing> {
        self.things.get(&id).ok_or(ThingManagerError::ThingNotFound(id))
    }

    pub fn things(&self) -> Vec<Thing> {
        self.things.values()
    }

    pub fn things_of_class(&self, class_id: ThingClassId) -> Vec<Thing> {
        self.things
            .values()
            .into_iter()
            .filter(|t| t.thing_class_id == class_id)
            .collect()
    }

    /// Things that are operational and whose class implements `interface`.
    pub fn operational_things_implementing(&self, interface: &str) -> Vec<Thing> {
        let class_ids = self.registry.thing_classes_implementing(interface);
        self.things
            .values()
            .into_iter()
            .filter(|t| t.is_operational() && class_ids.contains(&t.thing_class_id))
            .collect()
    }

    pub async fn discover_things(
        &self,
        thing_class_id: ThingClassId,
        params: ParamMap,
    ) -> Result<Vec<ThingDescriptor>> {
        let class = self
            .registry
            .thing_class(thing_class_id)
            .map_err(|_| ThingManagerError::ThingClassNotFound(thing_class_id))?;

        let validated = validate(&class.discovery_param_types, &params, ParamSource::Discovery)?;

        let descriptors = timeout(
            OpKind::Discovery.default_timeout(),
            self.plugin_host.discover(class.plugin_id, thing_class_id, validated),
        )
        .await
        .map_err(|_| ThingManagerError::Timeout)?
        .map_err(|e| ThingManagerError::SetupFailed(e.to_string()))?;

        let expires_at = std::time::Instant::now() + DISCOVERY_TTL;
        for descriptor in &descriptors {
            self.descriptors.insert(
                descriptor.id,
                CachedDescriptor {
                    descriptor: descriptor.clone(),
                    expires_at,
                },
            );
        }
        Ok(descriptors)
    }

    fn cached_descriptor(&self, id: ThingDescriptorId) -> Result<ThingDescriptor> {
        let expired = self
            .descriptors
            .with(&id, |cached| cached.expires_at < std::time::Instant::now())
            .ok_or(ThingManagerError::ThingDescriptorNotFound(id))?;
        if expired {
            self.descriptors.remove(&id);
            return Err(ThingManagerError::ThingDescriptorNotFound(id));
        }
        self.descriptors
            .with(&id, |cached| cached.descriptor.clone())
            .ok_or(ThingManagerError::ThingDescriptorNotFound(id))
    }

    pub async fn add_configured_thing(
        &self,
        thing_class_id: ThingClassId,
        name: String,
        params: ParamMap,
        id: Option<ThingId>,
    ) -> Result<Thing> {
        let class = self
            .registry
            .thing_class(thing_class_id)
            .map_err(|_| ThingManagerError::ThingClassNotFound(thing_class_id))?;

        if !class.supports_create_method(crate::types::CreateMethod::User) {
            return Err(ThingManagerError::CreationMethodNotSupported);
        }
        if class.setup_method != crate::types::SetupMethod::JustAdd {
            return Err(ThingManagerError::SetupMethodNotSupported);
        }

        let validated = validate(&class.param_types, &params, ParamSource::User)?;
        let thing_id = id.unwrap_or_else(ThingId::new);
        if self.things.contains(&thing_id) {
            return Err(ThingManagerError::DuplicateUuid);
        }

        let thing = Thing::new(thing_id, thing_class_id, class.plugin_id, name, None, validated, false);
        self.run_setup(thing).await
    }

    pub async fn add_discovered_thing(
        &self,
        name: String,
        descriptor_id: ThingDescriptorId,
        param_overrides: ParamMap,
        id: Option<ThingId>,
    ) -> Result<Thing> {
        let descriptor = self.cached_descriptor(descriptor_id)?;
        let class = self
            .registry
            .thing_class(descriptor.thing_class_id)
            .map_err(|_| ThingManagerError::ThingClassNotFound(descriptor.thing_class_id))?;

        // User-supplied params override descriptor params per ParamType.
        let mut merged = descriptor.params.clone();
        merged.extend(param_overrides);
        let validated = validate(&class.param_types, &merged, ParamSource::Discovery)?;

        let thing_id = id.unwrap_or_else(ThingId::new);
        if self.things.contains(&thing_id) {
            return Err(ThingManagerError::DuplicateUuid);
        }

        self.descriptors.remove(&descriptor_id);

        let thing = Thing::new(
            thing_id,
            descriptor.thing_class_id,
            class.plugin_id,
            name,
            descriptor.parent_id,
            validated,
            false,
        );
        self.run_setup(thing).await
    }

    /// Starts a pairing transaction for a class whose `setupMethod` needs
    /// one (anything but `justAdd`); the plugin returns a transaction id
    /// the caller later passes to `confirm_pairing` (§4.4 suspension
    /// points).
    pub async fn pairing_start(
        &self,
        thing_class_id: ThingClassId,
        name: String,
        params: ParamMap,
        parent_id: Option<ThingId>,
    ) -> Result<PairingTransaction> {
        let class = self
            .registry
            .thing_class(thing_class_id)
            .map_err(|_| ThingManagerError::ThingClassNotFound(thing_class_id))?;
        if class.setup_method == crate::types::SetupMethod::JustAdd {
            return Err(ThingManagerError::SetupMethodNotSupported);
        }
        let validated = validate(&class.param_types, &params, ParamSource::User)?;

        let transaction_id = timeout(
            OpKind::Pairing.default_timeout(),
            self.plugin_host.start_pairing(class.plugin_id, thing_class_id, validated.clone()),
        )
        .await
        .map_err(|_| ThingManagerError::Timeout)?
        .map_err(|e| ThingManagerError::SetupFailed(e.to_string()))?;

        let transaction = PairingTransaction {
            id: transaction_id,
            thing_class_id,
            thing_id: None,
            params: validated,
            name,
            parent_id,
            o_auth_url: None,
        };
        self.pairings.insert(transaction_id, transaction.clone());
        Ok(transaction)
    }

    /// Completes a pairing transaction and, on success, creates and sets
    /// up the paired thing. The transaction is single-use: it is removed
    /// whether confirmation succeeds or fails.
    pub async fn confirm_pairing(
        &self,
        transaction_id: PairingTransactionId,
        username: Option<String>,
        secret: Option<String>,
    ) -> Result<Thing> {
        let transaction = self
            .pairings
            .get(&transaction_id)
            .ok_or(ThingManagerError::PairingTransactionIdNotFound(transaction_id))?;
        self.pairings.remove(&transaction_id);

        let class = self
            .registry
            .thing_class(transaction.thing_class_id)
            .map_err(|_| ThingManagerError::ThingClassNotFound(transaction.thing_class_id))?;

        timeout(
            OpKind::Pairing.default_timeout(),
            self.plugin_host.confirm_pairing(class.plugin_id, transaction_id, username, secret),
        )
        .await
        .map_err(|_| ThingManagerError::Timeout)?
        .map_err(|_| ThingManagerError::AuthenticationFailure)?;

        let thing = Thing::new(
            ThingId::new(),
            transaction.thing_class_id,
            class.plugin_id,
            transaction.name.clone(),
            transaction.parent_id,
            transaction.params.clone(),
            false,
        );
        self.run_setup(thing).await
    }

    async fn run_setup(&self, mut thing: Thing) -> Result<Thing> {
        thing.setup_status = SetupStatus::InProgress;
        let thing_id = thing.id;
        self.things.insert(thing_id, thing.clone());

        let outcome = timeout(
            OpKind::Setup.default_timeout(),
            self.plugin_host.setup_thing(thing.plugin_id, thing.clone()),
        )
        .await;

        let (status, error) = match outcome {
            Ok(Ok(())) => (SetupStatus::Complete, None),
            Ok(Err(e)) => (SetupStatus::Failed, Some(e.to_string())),
            Err(_) => (SetupStatus::Failed, Some("setup timed out".into())),
        };

        let display_message = error
            .as_ref()
            .map(|e| self.translations.translate(thing.plugin_id, e));
        self.things.with_mut(&thing_id, |t| {
            t.setup_status = status;
            t.setup_error = error.clone();
            t.setup_display_message = display_message.clone();
        });
        self.persist_thing(&self.thing(thing_id)?);

        if status == SetupStatus::Complete {
            let _ = self.plugin_host.post_setup(thing.plugin_id, &thing).await;
            info!(thing_id = %thing_id, "thing setup complete");
            publish(&self.events, HubEvent::ThingAdded(self.thing(thing_id)?));
        } else {
            warn!(thing_id = %thing_id, error = ?error, "thing setup failed");
        }

        self.thing(thing_id)
    }

    pub async fn reconfigure_thing(
        &self,
        thing_id: ThingId,
        params: ParamMap,
        from_discovery: bool,
    ) -> Result<Thing> {
        let existing = self.thing(thing_id)?;
        let class = self
            .registry
            .thing_class(existing.thing_class_id)
            .map_err(|_| ThingManagerError::ThingClassNotFound(existing.thing_class_id))?;

        let source = if from_discovery {
            ParamSource::Discovery
        } else {
            ParamSource::User
        };
        let validated = validate(&class.param_types, &params, source)?;

        let _ = self.plugin_host.thing_removed(existing.plugin_id, &existing).await;

        self.things.with_mut(&thing_id, |t| {
            t.setup_status = SetupStatus::None;
            t.params = validated.clone();
        });

        let updated = self.thing(thing_id)?;
        self.run_setup(updated).await
    }

    pub fn edit_thing(&self, thing_id: ThingId, name: String) -> Result<()> {
        self.things
            .with_mut(&thing_id, |t| t.name = name)
            .ok_or(ThingManagerError::ThingNotFound(thing_id))?;
        publish(&self.events, HubEvent::ThingChanged(self.thing(thing_id)?));
        Ok(())
    }

    pub fn set_thing_settings(&self, thing_id: ThingId, settings: ParamMap) -> Result<()> {
        let thing = self.thing(thing_id)?;
        let class = self
            .registry
            .thing_class(thing.thing_class_id)
            .map_err(|_| ThingManagerError::ThingClassNotFound(thing.thing_class_id))?;
        let validated = validate(&class.settings_types, &settings, ParamSource::User)?;

        for (param_type_id, value) in &validated {
            self.things.with_mut(&thing_id, |t| {
                t.settings.insert(*param_type_id, value.clone());
            });
            publish(
                &self.events,
                HubEvent::ThingSettingChanged {
                    thing_id,
                    param_type_id: *param_type_id,
                    value: value.clone(),
                },
            );
        }
        Ok(())
    }

    /// Applies a state write sourced from the plugin, emitting
    /// `stateChanged` only when the value actually differs.
    pub fn set_state_value(&self, thing_id: ThingId, state_type_id: StateTypeId, value: Value) -> Result<()> {
        let changed = self
            .things
            .with_mut(&thing_id, |t| t.set_state_value(state_type_id, value.clone()))
            .ok_or(ThingManagerError::ThingNotFound(thing_id))?;

        if changed {
            let cached = self
                .thing(thing_id)
                .ok()
                .and_then(|t| self.registry.thing_class(t.thing_class_id).ok())
                .and_then(|c| c.state_type(state_type_id).map(|s| s.cached))
                .unwrap_or(false);
            if cached {
                self.persist_state(thing_id, state_type_id, &value);
            }
            publish(
                &self.events,
                HubEvent::StateChanged {
                    thing_id,
                    state_type_id,
                    value,
                },
            );
        }
        Ok(())
    }

    /// Removes a thing and recursively its children, purging every
    /// persisted group (config, cached state, tags) the removal
    /// cascades over -- the only case the core guarantees tag
    /// cascade-deletion for.
    pub async fn remove_configured_thing(&self, thing_id: ThingId) -> Result<()> {
        let thing = self.thing(thing_id)?;

        let children: Vec<ThingId> = self
            .things
            .values()
            .into_iter()
            .filter(|t| t.parent_id == Some(thing_id))
            .map(|t| t.id)
            .collect();
        for child_id in children {
            Box::pin(self.remove_configured_thing(child_id)).await?;
        }

        let _ = self.plugin_host.thing_removed(thing.plugin_id, &thing).await;
        self.things.remove(&thing_id);
        let group = thing_id.to_string();
        let _ = self.store.remove_group(Role::Things, &group);
        let _ = self.store.remove_group(Role::ThingStates, &group);
        let _ = self.store.remove_group(Role::Tags, &group);
        publish(&self.events, HubEvent::ThingRemoved(thing_id));
        Ok(())
    }

    pub async fn execute_action(&self, thing_id: ThingId, action_type_id: crate::types::ActionTypeId, params: ParamMap, trigger: Trigger) -> Result<ActionExecutionStatus> {
        let thing = self.thing(thing_id)?;
        if !thing.is_operational() {
            return Err(ThingManagerError::ThingNotFound(thing_id));
        }
        let class = self
            .registry
            .thing_class(thing.thing_class_id)
            .map_err(|_| ThingManagerError::ThingClassNotFound(thing.thing_class_id))?;
        let action_type = class
            .action_type(action_type_id)
            .ok_or(ThingManagerError::ActionTypeNotFound(action_type_id))?;
        let validated = validate(&action_type.param_types, &params, ParamSource::User)?;

        let action = Action {
            action_type_id,
            thing_id,
            params: validated,
            trigger,
        };

        let result = timeout(
            OpKind::Action.default_timeout(),
            self.plugin_host.execute_action(thing.plugin_id, action),
        )
        .await
        .map_err(|_| ThingManagerError::Timeout)?
        .map_err(|e| ThingManagerError::HardwareFailure(e.to_string()))?;

        Ok(result)
    }

    /// Lists the browsable items under `item_id` (or the root, if
    /// `None`) for a browsable thing (§4.4 suspension points).
    pub async fn browse(
        &self,
        thing_id: ThingId,
        item_id: Option<String>,
        locale: &str,
    ) -> Result<Vec<crate::types::BrowserItem>> {
        let thing = self.thing(thing_id)?;
        let class = self
            .registry
            .thing_class(thing.thing_class_id)
            .map_err(|_| ThingManagerError::ThingClassNotFound(thing.thing_class_id))?;
        if !class.browsable {
            return Err(ThingManagerError::UnsupportedFeature("browse".into()));
        }

        self.translations.set_locale(locale);
        let plugin_id = thing.plugin_id;
        let mut items = timeout(
            OpKind::Browse.default_timeout(),
            self.plugin_host.browse(plugin_id, &thing, item_id, locale),
        )
        .await
        .map_err(|_| ThingManagerError::Timeout)?
        .map_err(|e| ThingManagerError::ItemNotFound(e.to_string()))?;

        for item in &mut items {
            item.display_name = self.translations.translate(plugin_id, &item.display_name);
        }
        Ok(items)
    }

    pub async fn execute_browser_item(&self, thing_id: ThingId, item_id: String) -> Result<ActionExecutionStatus> {
        let thing = self.thing(thing_id)?;
        let class = self
            .registry
            .thing_class(thing.thing_class_id)
            .map_err(|_| ThingManagerError::ThingClassNotFound(thing.thing_class_id))?;
        if !class.browsable {
            return Err(ThingManagerError::UnsupportedFeature("browse".into()));
        }

        timeout(
            OpKind::Browse.default_timeout(),
            self.plugin_host.execute_browser_item(thing.plugin_id, &thing, item_id.clone()),
        )
        .await
        .map_err(|_| ThingManagerError::Timeout)?
        .map_err(|_| ThingManagerError::ItemNotExecutable(item_id))
    }

    pub async fn execute_browser_item_action(
        &self,
        thing_id: ThingId,
        item_id: String,
        action_name: String,
        params: ParamMap,
    ) -> Result<ActionExecutionStatus> {
        let thing = self.thing(thing_id)?;
        let class = self
            .registry
            .thing_class(thing.thing_class_id)
            .map_err(|_| ThingManagerError::ThingClassNotFound(thing.thing_class_id))?;
        if !class.browsable {
            return Err(ThingManagerError::UnsupportedFeature("browse".into()));
        }

        timeout(
            OpKind::Browse.default_timeout(),
            self.plugin_host
                .execute_browser_item_action(thing.plugin_id, &thing, item_id.clone(), action_name, params),
        )
        .await
        .map_err(|_| ThingManagerError::Timeout)?
        .map_err(|_| ThingManagerError::ItemNotExecutable(item_id))
    }

    /// Restores persisted (thingId, stateTypeId) state values before
    /// setup runs, per the §4.4 "State cache" rule.
    pub fn restore_cached_state(&self, thing_id: ThingId, state_type_id: StateTypeId, value: Value) {
        self.things.with_mut(&thing_id, |t| {
            t.states.insert(state_type_id, value);
        });
    }

    /// Inserts a thing loaded from storage without running setup; used
    /// during startup restoration.
    pub fn load_persisted_thing(&self, thing: Thing) {
        self.things.insert(thing.id, thing);
    }

    /// Orders persisted things so a parent is always set up before its
    /// children, per the §4.4 "Startup ordering" rule. Returns an error
    /// if a cycle is detected (modeled as `DuplicateUuid`, the closest
    /// available status for storage corruption).
    pub fn startup_order(things: &[Thing]) -> Result<Vec<ThingId>> {
        let mut remaining: Vec<&Thing> = things.iter().collect();
        let mut taken = std::collections::HashSet::new();
        let mut order = Vec::with_capacity(things.len());

        while !remaining.is_empty() {
            let before = remaining.len();
            remaining.retain(|t| {
                let ready = match t.parent_id {
                    None => true,
                    Some(parent) => taken.contains(&parent),
                };
                if ready {
                    taken.insert(t.id);
                    order.push(t.id);
                }
                !ready
            });
            if remaining.len() == before {
                return Err(ThingManagerError::DuplicateUuid);
            }
        }
        Ok(order)
    }

    pub async fn setup_from_storage(&self, thing_id: ThingId) -> Result<Thing> {
        let thing = self.thing(thing_id)?;
        self.run_setup(thing).await
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Loads every persisted thing whose class is currently registered,
    /// restores its cached state, and returns the ids in parent-before-
    /// child setup order. A thing whose `ThingClass` isn't loaded (the
    /// plugin providing it hasn't been loaded this run) is left in
    /// storage untouched and simply skipped, per the §4.1 "a Thing
    /// exists iff its ThingClass is present and loadable" rule.
    pub fn load_from_storage(&self) -> Result<Vec<ThingId>> {
        let mut loaded = Vec::new();
        for group in self.store.groups(Role::Things) {
            let Some(thing) = self.store.read_typed::<Thing>(Role::Things, &group, "config", "thing") else {
                continue;
            };
            if self.registry.thing_class(thing.thing_class_id).is_err() {
                warn!(thing_id = %thing.id, "thing class no longer loaded; leaving thing in storage");
                continue;
            }
            let thing_id = thing.id;
            self.load_persisted_thing(thing);
            for key in self.store.keys(Role::ThingStates, &group, "states") {
                let Some(value) = self.store.read_typed::<Value>(Role::ThingStates, &group, "states", &key) else {
                    continue;
                };
                let Ok(uuid) = key.parse::<uuid::Uuid>() else { continue };
                self.restore_cached_state(thing_id, StateTypeId(uuid), value);
            }
            loaded.push(self.thing(thing_id)?);
        }
        Self::startup_order(&loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thing_with_parent(parent: Option<ThingId>) -> Thing {
        Thing::new(
            ThingId::new(),
            ThingClassId::new(),
            PluginId::new(),
            "t".into(),
            parent,
            ParamMap::new(),
            false,
        )
    }

    #[test]
    fn startup_order_places_parents_before_children() {
        let parent = thing_with_parent(None);
        let child = thing_with_parent(Some(parent.id));
        let order = ThingManager::startup_order(&[child.clone(), parent.clone()]).unwrap();
        let parent_pos = order.iter().position(|id| *id == parent.id).unwrap();
        let child_pos = order.iter().position(|id| *id == child.id).unwrap();
        assert!(parent_pos < child_pos);
    }

    #[test]
    fn startup_order_detects_cycles() {
        let a_id = ThingId::new();
        let b_id = ThingId::new();
        let mut a = thing_with_parent(Some(b_id));
        a.id = a_id;
        let mut b = thing_with_parent(Some(a_id));
        b.id = b_id;
        let err = ThingManager::startup_order(&[a, b]).unwrap_err();
        assert!(matches!(err, ThingManagerError::DuplicateUuid));
    }
}
