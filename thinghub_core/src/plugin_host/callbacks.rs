//! Unsolicited pushes a plugin raises toward the core, independent of
//! any call the host made. A plugin is handed a `CallbackSink` (an
//! mpsc sender) at `init` time for these; everything else (setup,
//! pairing, actions, browsing) completes as the return value of the
//! matching `ThingPlugin` method instead, since an `async fn` already
//! suspends for as long as the plugin needs.

use tokio::sync::mpsc;

use crate::types::{Event, PluginId, ThingDescriptor, ThingId};

#[derive(Debug, Clone)]
pub enum PluginCallback {
    EmitEvent(ThingId, Event),
    AutoThingsAppeared(PluginId, Vec<ThingDescriptor>),
    AutoThingDisappeared(PluginId, ThingId),
}

pub type CallbackSink = mpsc::Sender<PluginCallback>;
