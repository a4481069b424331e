//! The trait every plugin implements. Kept as a trait object
//! (`Arc<dyn ThingPlugin>`) rather than an inheritance hierarchy, so the
//! host can hold a heterogeneous set of plugins behind one interface.

use async_trait::async_trait;

use crate::types::{
    Action, ActionExecutionStatus, BrowserItem, ParamMap, PairingTransactionId, PluginId,
    Thing, ThingClassId, ThingDescriptor,
};

use super::callbacks::CallbackSink;
use super::error::Result;

#[async_trait]
pub trait ThingPlugin: Send + Sync {
    fn id(&self) -> PluginId;

    /// Called once at load time with the plugin's persisted config
    /// params and a sink for subsequent async callbacks.
    async fn init(&self, config_params: ParamMap, callbacks: CallbackSink) -> Result<()>;

    /// Starts background monitoring for auto-created things, if the
    /// plugin supports `createMethod: auto`. No-op otherwise.
    async fn start_monitoring_auto(&self) -> Result<()>;

    async fn discover(&self, thing_class_id: ThingClassId, params: ParamMap) -> Result<Vec<ThingDescriptor>>;

    async fn setup_thing(&self, thing: Thing) -> Result<()>;

    async fn post_setup(&self, thing: &Thing) -> Result<()>;

    async fn thing_removed(&self, thing: &Thing) -> Result<()>;

    async fn start_pairing(&self, thing_class_id: ThingClassId, params: ParamMap) -> Result<PairingTransactionId>;

    async fn confirm_pairing(
        &self,
        transaction_id: PairingTransactionId,
        username: Option<String>,
        secret: Option<String>,
    ) -> Result<()>;

    async fn execute_action(&self, action: Action) -> Result<ActionExecutionStatus>;

    async fn browse(&self, thing: &Thing, item_id: Option<String>, locale: &str) -> Result<Vec<BrowserItem>>;

    async fn execute_browser_item(&self, thing: &Thing, item_id: String) -> Result<ActionExecutionStatus>;

    async fn execute_browser_item_action(
        &self,
        thing: &Thing,
        item_id: String,
        action_name: String,
        params: ParamMap,
    ) -> Result<ActionExecutionStatus>;
}
