//! Hub: wires TypeRegistry, PluginHost, ThingManager, RuleEngine,
//! TimeManager, persistence and translation together and drives the
//! single event loop that feeds ticks and plugin-pushed events into the
//! rule engine (§4, §5).
//!
//! Grounded on the teacher's `Orchestrator`/`orchestrator/processor.rs`:
//! one mpsc-fed loop owns dispatch, broadcast fans results out to
//! subscribers. Here the mpsc side carries plugin-pushed callbacks
//! (`PluginCallback`) instead of a generic command enum, since every
//! hub-initiated operation is already a plain async method on
//! `ThingManager`/`RuleEngine` rather than a command needing routing.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::action_dispatcher::ActionDispatcher;
use crate::hub_events::{HubEvent, HubEventReceiver, HubEventSender};
use crate::persistence::{FileStore, PersistenceStore};
use crate::plugin_host::{PluginCallback, PluginHost};
use crate::registry::TypeRegistry;
use crate::rule_engine::RuleEngine;
use crate::thing_manager::ThingManager;
use crate::time_manager::TimeManager;
use crate::translation::TranslationService;

pub struct Hub {
    pub registry: TypeRegistry,
    pub things: Arc<ThingManager>,
    pub rules: Arc<RuleEngine>,
    pub time: Arc<TimeManager>,
    pub plugins: Arc<PluginHost>,
    pub translations: Arc<TranslationService>,
    pub store: Arc<dyn PersistenceStore>,
    events: HubEventSender,
}

impl Hub {
    pub fn new(storage_path: impl AsRef<std::path::Path>) -> Self {
        let (events, _rx) = tokio::sync::broadcast::channel(1024);
        let registry = TypeRegistry::new();
        let store: Arc<dyn PersistenceStore> = Arc::new(FileStore::new(storage_path));
        let plugins = Arc::new(PluginHost::new(registry.clone(), store.clone()));
        let translations = TranslationService::new("en_US");
        let things = Arc::new(ThingManager::new(
            registry.clone(),
            plugins.clone(),
            events.clone(),
            store.clone(),
            translations.clone(),
        ));
        let dispatcher = ActionDispatcher::new(things.clone());
        let rules = Arc::new(RuleEngine::new(dispatcher, events.clone(), store.clone()));
        let time = Arc::new(TimeManager::new(events.clone()));

        Self {
            registry,
            things,
            rules,
            time,
            plugins,
            translations,
            store,
            events,
        }
    }

    pub fn subscribe(&self) -> HubEventReceiver {
        self.events.subscribe()
    }

    pub fn events(&self) -> HubEventSender {
        self.events.clone()
    }

    /// Restores rules and things (in parent-before-child order) from
    /// storage. Must run after plugins are loaded, since a thing whose
    /// class isn't registered yet is skipped rather than waited for
    /// (§4.1, §4.4 "Startup ordering").
    pub async fn restore(&self) {
        self.rules.load_from_storage();
        match self.things.load_from_storage() {
            Ok(order) => {
                for thing_id in order {
                    if let Err(e) = self.things.setup_from_storage(thing_id).await {
                        warn!(%thing_id, error = %e, "failed to restore persisted thing");
                    }
                }
            }
            Err(e) => warn!(error = %e, "failed to order persisted things for restoration"),
        }
    }

    /// Runs until `plugin_callbacks` closes or `self.time.stop()` is
    /// called from elsewhere. Spawns the TimeManager ticker and feeds
    /// its minute-aligned `DateTimeChanged` signal into the rule
    /// engine's per-tick evaluation, while forwarding plugin-pushed
    /// events into rule matching.
    pub async fn run(&self, mut plugin_callbacks: mpsc::Receiver<PluginCallback>) {
        info!("starting hub event loop");
        let time = self.time.clone();
        let time_task = tokio::spawn(async move { time.run().await });

        let mut hub_events = self.subscribe();
        loop {
            tokio::select! {
                received = hub_events.recv() => {
                    match received {
                        // Rule evaluation subscribes to the minute-aligned
                        // dateTimeChanged signal, not the per-second tick
                        // (§4.6) -- ticking on every `Tick` would dispatch
                        // a matching time-event rule's actions once per
                        // second instead of once per matching minute.
                        Ok(HubEvent::DateTimeChanged(now)) => {
                            self.rules.on_tick(now, &self.things).await;
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "hub event subscriber lagged, some ticks were dropped");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                callback = plugin_callbacks.recv() => {
                    match callback {
                        Some(PluginCallback::EmitEvent(_thing_id, event)) => {
                            self.rules.on_event(&event, self.time.current_date_time(), &self.things).await;
                        }
                        Some(PluginCallback::AutoThingsAppeared(plugin_id, descriptors)) => {
                            debug!(%plugin_id, count = descriptors.len(), "plugin reported auto-discovered things");
                        }
                        Some(PluginCallback::AutoThingDisappeared(plugin_id, thing_id)) => {
                            debug!(%plugin_id, %thing_id, "plugin reported an auto-created thing disappeared");
                        }
                        None => break,
                    }
                }
            }
        }

        time_task.abort();
        info!("hub event loop stopped");
    }
}
