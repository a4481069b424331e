//! thinghub_core - core types and engines for a home-automation hub:
//! thing/plugin lifecycle, rule evaluation, and time-based triggers.

pub mod action_dispatcher;
pub mod arena;
pub mod async_ops;
pub mod hub;
pub mod hub_events;
pub mod persistence;
pub mod plugin_host;
pub mod registry;
pub mod rule_engine;
pub mod thing_manager;
pub mod time_manager;
pub mod translation;
pub mod types;

pub use action_dispatcher::ActionDispatcher;
pub use arena::{Arena, UuidArena};
pub use hub::Hub;
pub use hub_events::{HubEvent, HubEventReceiver, HubEventSender};
pub use plugin_host::{PluginHost, ThingPlugin};
pub use registry::TypeRegistry;
pub use rule_engine::RuleEngine;
pub use thing_manager::ThingManager;
pub use time_manager::TimeManager;
pub use translation::TranslationService;
