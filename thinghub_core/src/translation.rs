//! TranslationService: resolves a plugin's displayName strings against
//! the hub's active locale, falling back to the original string
//! unchanged rather than ever erroring (§5).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::types::PluginId;

#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    /// locale -> original string -> translated string
    entries: HashMap<String, HashMap<String, String>>,
}

impl TranslationTable {
    pub fn insert(&mut self, locale: impl Into<String>, original: impl Into<String>, translated: impl Into<String>) {
        self.entries.entry(locale.into()).or_default().insert(original.into(), translated.into());
    }
}

pub struct TranslationService {
    locale: RwLock<String>,
    tables: RwLock<HashMap<PluginId, TranslationTable>>,
}

impl TranslationService {
    pub fn new(default_locale: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            locale: RwLock::new(default_locale.into()),
            tables: RwLock::new(HashMap::new()),
        })
    }

    pub fn set_locale(&self, locale: impl Into<String>) {
        *self.locale.write().unwrap() = locale.into();
    }

    pub fn locale(&self) -> String {
        self.locale.read().unwrap().clone()
    }

    pub fn load_table(&self, plugin_id: PluginId, table: TranslationTable) {
        self.tables.write().unwrap().insert(plugin_id, table);
    }

    /// Translates `original` for `plugin_id` under the active locale.
    /// Any miss (no table, no locale entry, no matching string) falls
    /// back to `original` unchanged -- translation is a display nicety,
    /// never a source of hard failures.
    pub fn translate(&self, plugin_id: PluginId, original: &str) -> String {
        let locale = self.locale();
        let tables = self.tables.read().unwrap();
        let translated = tables
            .get(&plugin_id)
            .and_then(|t| t.entries.get(&locale))
            .and_then(|m| m.get(original))
            .cloned();
        match translated {
            Some(s) => s,
            None => {
                debug!(%plugin_id, %locale, original, "no translation found, using original string");
                original.to_string()
            }
        }
    }
}
