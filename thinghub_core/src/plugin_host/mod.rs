//! PluginHost: discovers plugin manifests, registers their declared
//! types in the TypeRegistry, and dispatches the operation set every
//! `ThingPlugin` exposes (§4.3).

pub mod callbacks;
pub mod error;
pub mod manifest;
pub mod plugin_trait;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::arena::Arena;
use crate::persistence::{PersistenceStore, PersistenceStoreExt, Role};
use crate::registry::TypeRegistry;
use crate::types::{
    Action, ActionExecutionStatus, BrowserItem, PairingTransactionId, ParamMap, ParamTypeId,
    PluginId, Thing, ThingClassId, ThingDescriptor,
};

pub use callbacks::{CallbackSink, PluginCallback};
pub use error::{PluginHostError, Result};
pub use manifest::PluginManifestDoc;
pub use plugin_trait::ThingPlugin;

const CORE_API_MAJOR: u32 = 1;
const CORE_API_MINOR: u32 = 0;

pub struct PluginHost {
    registry: TypeRegistry,
    plugins: Arena<PluginId, Arc<dyn ThingPlugin>>,
    store: Arc<dyn PersistenceStore>,
}

fn parse_api_version(version: &str) -> std::result::Result<(u32, u32), String> {
    let mut parts = version.split('.');
    let major = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| format!("malformed apiVersion: {version}"))?;
    let minor = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    Ok((major, minor))
}

impl PluginHost {
    pub fn new(registry: TypeRegistry, store: Arc<dyn PersistenceStore>) -> Self {
        Self {
            registry,
            plugins: Arena::new(),
            store,
        }
    }

    /// Plugin config, persisted per paramTypeId so a restart can restore
    /// it losslessly (§4.4, §5).
    fn persist_plugin_config(&self, plugin_id: PluginId, config_params: &ParamMap) {
        for (param_type_id, value) in config_params {
            if let Err(e) = self.store.write_typed(
                Role::Plugins,
                &plugin_id.to_string(),
                "config",
                &param_type_id.to_string(),
                value,
            ) {
                warn!(%plugin_id, %param_type_id, error = %e, "failed to persist plugin configuration");
            }
        }
    }

    /// Reads back a plugin's persisted configuration, for use before
    /// re-attaching it on restart.
    pub fn load_plugin_config(&self, plugin_id: PluginId) -> ParamMap {
        let group = plugin_id.to_string();
        let mut params = ParamMap::new();
        for key in self.store.keys(Role::Plugins, &group, "config") {
            if let Some(value) = self
                .store
                .read_typed(Role::Plugins, &group, "config", &key)
            {
                if let Ok(uuid) = key.parse::<uuid::Uuid>() {
                    params.insert(ParamTypeId(uuid), value);
                }
            }
        }
        params
    }

    /// Reads and parses a manifest file from disk, without registering
    /// anything yet. Split out from `load_manifest` so a caller can
    /// construct the matching `Arc<dyn ThingPlugin>` before committing
    /// the plugin's types to the registry.
    pub async fn read_manifest_file(&self, path: impl AsRef<Path>) -> Result<PluginManifestDoc> {
        let path = path.as_ref();
        debug!(?path, "reading plugin manifest");
        let content = tokio::fs::read_to_string(path).await?;
        let doc: PluginManifestDoc = toml::from_str(&content)?;
        doc.validate().map_err(PluginHostError::InvalidManifest)?;
        Ok(doc)
    }

    /// Validates the manifest's api version and registers its vendors
    /// and thing classes with the TypeRegistry. An individual vendor or
    /// thing class that fails to validate is skipped with a warning;
    /// the rest of the plugin still loads (§4.1).
    pub fn register_manifest(&self, doc: &PluginManifestDoc) -> Result<()> {
        let (major, minor) = parse_api_version(&doc.plugin.api_version)
            .map_err(PluginHostError::InvalidManifest)?;
        if major != CORE_API_MAJOR || minor > CORE_API_MINOR {
            return Err(PluginHostError::UnsupportedApiVersion {
                found: doc.plugin.api_version.clone(),
                core_major: CORE_API_MAJOR,
                core_minor: CORE_API_MINOR,
            });
        }

        self.registry
            .register_plugin(doc.plugin.clone())
            .map_err(|e| PluginHostError::InvalidManifest(e.to_string()))?;

        for vendor in &doc.vendors {
            self.registry.register_vendor(vendor.clone());
        }

        for class in &doc.thing_classes {
            if let Err(e) = self.registry.register_thing_class(class.clone()) {
                warn!(class = %class.name, error = %e, "skipping invalid thing class from manifest");
                continue;
            }
        }

        info!(plugin = %doc.plugin.name, "registered plugin manifest");
        Ok(())
    }

    /// Commits a constructed plugin instance, making it reachable for
    /// dispatch. Call after `register_manifest` for the same manifest.
    pub async fn attach_plugin(
        &self,
        plugin: Arc<dyn ThingPlugin>,
        config_params: ParamMap,
        callbacks: CallbackSink,
    ) -> Result<()> {
        let id = plugin.id();
        self.persist_plugin_config(id, &config_params);
        plugin.init(config_params, callbacks).await?;
        self.plugins.insert(id, plugin);
        Ok(())
    }

    pub fn plugin(&self, id: PluginId) -> Result<Arc<dyn ThingPlugin>> {
        self.plugins.get(&id).ok_or(PluginHostError::NotFound(id))
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub async fn discover(
        &self,
        plugin_id: PluginId,
        thing_class_id: ThingClassId,
        params: ParamMap,
    ) -> Result<Vec<ThingDescriptor>> {
        self.plugin(plugin_id)?.discover(thing_class_id, params).await
    }

    pub async fn setup_thing(&self, plugin_id: PluginId, thing: Thing) -> Result<()> {
        self.plugin(plugin_id)?.setup_thing(thing).await
    }

    pub async fn post_setup(&self, plugin_id: PluginId, thing: &Thing) -> Result<()> {
        self.plugin(plugin_id)?.post_setup(thing).await
    }

    pub async fn thing_removed(&self, plugin_id: PluginId, thing: &Thing) -> Result<()> {
        self.plugin(plugin_id)?.thing_removed(thing).await
    }

    pub async fn start_pairing(
        &self,
        plugin_id: PluginId,
        thing_class_id: ThingClassId,
        params: ParamMap,
    ) -> Result<PairingTransactionId> {
        self.plugin(plugin_id)?
            .start_pairing(thing_class_id, params)
            .await
    }

    pub async fn confirm_pairing(
        &self,
        plugin_id: PluginId,
        transaction_id: PairingTransactionId,
        username: Option<String>,
        secret: Option<String>,
    ) -> Result<()> {
        self.plugin(plugin_id)?
            .confirm_pairing(transaction_id, username, secret)
            .await
    }

    pub async fn execute_action(
        &self,
        plugin_id: PluginId,
        action: Action,
    ) -> Result<ActionExecutionStatus> {
        self.plugin(plugin_id)?.execute_action(action).await
    }

    pub async fn browse(
        &self,
        plugin_id: PluginId,
        thing: &Thing,
        item_id: Option<String>,
        locale: &str,
    ) -> Result<Vec<BrowserItem>> {
        self.plugin(plugin_id)?.browse(thing, item_id, locale).await
    }

    pub async fn execute_browser_item(
        &self,
        plugin_id: PluginId,
        thing: &Thing,
        item_id: String,
    ) -> Result<ActionExecutionStatus> {
        self.plugin(plugin_id)?.execute_browser_item(thing, item_id).await
    }

    pub async fn execute_browser_item_action(
        &self,
        plugin_id: PluginId,
        thing: &Thing,
        item_id: String,
        action_name: String,
        params: ParamMap,
    ) -> Result<ActionExecutionStatus> {
        self.plugin(plugin_id)?
            .execute_browser_item_action(thing, item_id, action_name, params)
            .await
    }
}
