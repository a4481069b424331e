//! Hierarchical key-value persistence: role -> group -> subgroup -> key,
//! the shape configured things, thing states, plugin configs, rules and
//! tags are all saved under (§5 "Persistence").
//!
//! Grounded on the teacher's `storage.rs` `FileStorage` (one file per
//! unit, in-memory cache, debug!/error! tracing on every operation) but
//! one JSON document per `Role` instead of per-element, since a role's
//! whole tree is small enough to keep resident and rewriting it whole
//! on every write lets the write be atomic via rename.

pub mod error;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

pub use error::{PersistenceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Things,
    ThingStates,
    Plugins,
    Rules,
    Tags,
}

impl Role {
    const ALL: [Role; 5] = [Role::Things, Role::ThingStates, Role::Plugins, Role::Rules, Role::Tags];

    fn file_name(self) -> &'static str {
        match self {
            Role::Things => "things.json",
            Role::ThingStates => "thing_states.json",
            Role::Plugins => "plugins.json",
            Role::Rules => "rules.json",
            Role::Tags => "tags.json",
        }
    }
}

type SubgroupDoc = HashMap<String, serde_json::Value>;
type GroupDoc = HashMap<String, SubgroupDoc>;
type RoleDoc = HashMap<String, GroupDoc>;

/// A hierarchical key-value store. `group`/`subgroup` let callers
/// address e.g. a thing id and then its settings vs. its states
/// without colliding keys.
pub trait PersistenceStore: Send + Sync {
    fn write(&self, role: Role, group: &str, subgroup: &str, key: &str, value: serde_json::Value) -> Result<()>;
    fn read(&self, role: Role, group: &str, subgroup: &str, key: &str) -> Option<serde_json::Value>;
    fn remove_group(&self, role: Role, group: &str) -> Result<()>;
    fn groups(&self, role: Role) -> Vec<String>;
    fn subgroups(&self, role: Role, group: &str) -> Vec<String>;
    fn keys(&self, role: Role, group: &str, subgroup: &str) -> Vec<String>;
}

#[derive(Debug)]
pub struct FileStore {
    base_path: PathBuf,
    cache: Arc<Mutex<HashMap<&'static str, RoleDoc>>>,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        let base_path = base_path.as_ref().to_path_buf();
        if !base_path.exists() {
            debug!(?base_path, "creating persistence directory");
            if let Err(e) = fs::create_dir_all(&base_path) {
                error!(error = %e, "failed to create persistence directory");
            }
        }
        Self {
            base_path,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn doc_path(&self, role: Role) -> PathBuf {
        self.base_path.join(role.file_name())
    }

    fn load(&self, role: Role) -> RoleDoc {
        let path = self.doc_path(role);
        if !path.exists() {
            return RoleDoc::new();
        }
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(error = %e, ?path, "ignoring corrupt persistence document");
                RoleDoc::new()
            }),
            Err(e) => {
                error!(error = %e, ?path, "failed to read persistence document");
                RoleDoc::new()
            }
        }
    }

    fn with_doc<R>(&self, role: Role, f: impl FnOnce(&mut RoleDoc) -> R) -> R {
        let mut cache = self.cache.lock().unwrap();
        let doc = cache.entry(role.file_name()).or_insert_with(|| self.load(role));
        f(doc)
    }

    fn persist(&self, role: Role, doc: &RoleDoc) -> Result<()> {
        let path = self.doc_path(role);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(doc)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &path)?;
        debug!(?path, "persisted role document");
        Ok(())
    }
}

impl PersistenceStore for FileStore {
    fn write(&self, role: Role, group: &str, subgroup: &str, key: &str, value: serde_json::Value) -> Result<()> {
        let doc = self.with_doc(role, |doc| {
            doc.entry(group.to_string())
                .or_default()
                .entry(subgroup.to_string())
                .or_default()
                .insert(key.to_string(), value);
            doc.clone()
        });
        self.persist(role, &doc)
    }

    fn read(&self, role: Role, group: &str, subgroup: &str, key: &str) -> Option<serde_json::Value> {
        self.with_doc(role, |doc| {
            doc.get(group).and_then(|g| g.get(subgroup)).and_then(|s| s.get(key)).cloned()
        })
    }

    fn remove_group(&self, role: Role, group: &str) -> Result<()> {
        let doc = self.with_doc(role, |doc| {
            doc.remove(group);
            doc.clone()
        });
        self.persist(role, &doc)
    }

    fn groups(&self, role: Role) -> Vec<String> {
        self.with_doc(role, |doc| doc.keys().cloned().collect())
    }

    fn subgroups(&self, role: Role, group: &str) -> Vec<String> {
        self.with_doc(role, |doc| {
            doc.get(group).map(|g| g.keys().cloned().collect()).unwrap_or_default()
        })
    }

    fn keys(&self, role: Role, group: &str, subgroup: &str) -> Vec<String> {
        self.with_doc(role, |doc| {
            doc.get(group)
                .and_then(|g| g.get(subgroup))
                .map(|s| s.keys().cloned().collect())
                .unwrap_or_default()
        })
    }
}

/// Convenience helpers for typed values layered over the raw
/// `serde_json::Value` store.
pub trait PersistenceStoreExt: PersistenceStore {
    fn write_typed<T: Serialize>(&self, role: Role, group: &str, subgroup: &str, key: &str, value: &T) -> Result<()> {
        self.write(role, group, subgroup, key, serde_json::to_value(value)?)
    }

    fn read_typed<T: DeserializeOwned>(&self, role: Role, group: &str, subgroup: &str, key: &str) -> Option<T> {
        self.read(role, group, subgroup, key).and_then(|v| serde_json::from_value(v).ok())
    }
}

impl<S: PersistenceStore + ?Sized> PersistenceStoreExt for S {}

/// Eagerly warms the cache for every role, surfacing read errors early
/// instead of on first access from a hot path.
pub fn warm_cache(store: &FileStore) {
    for role in Role::ALL {
        store.with_doc(role, |_| ());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store
            .write_typed(Role::Things, "thing-1", "params", "brightness", &Sample {
                name: "lamp".into(),
                count: 3,
            })
            .unwrap();
        let read: Sample = store.read_typed(Role::Things, "thing-1", "params", "brightness").unwrap();
        assert_eq!(read, Sample { name: "lamp".into(), count: 3 });
    }

    #[test]
    fn write_survives_reload_from_disk() {
        let dir = tempdir().unwrap();
        {
            let store = FileStore::new(dir.path());
            store.write(Role::Rules, "rule-1", "meta", "enabled", serde_json::json!(true)).unwrap();
        }
        let reopened = FileStore::new(dir.path());
        assert_eq!(
            reopened.read(Role::Rules, "rule-1", "meta", "enabled"),
            Some(serde_json::json!(true))
        );
    }

    #[test]
    fn remove_group_drops_whole_subtree() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.write(Role::Things, "thing-1", "params", "k", serde_json::json!(1)).unwrap();
        store.remove_group(Role::Things, "thing-1").unwrap();
        assert!(store.read(Role::Things, "thing-1", "params", "k").is_none());
        assert!(store.groups(Role::Things).is_empty());
    }

    #[test]
    fn groups_and_keys_enumerate_what_was_written() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.write(Role::Tags, "thing-1", "tags", "room", serde_json::json!("kitchen")).unwrap();
        store.write(Role::Tags, "thing-1", "tags", "floor", serde_json::json!("1")).unwrap();
        assert_eq!(store.groups(Role::Tags), vec!["thing-1".to_string()]);
        assert_eq!(store.subgroups(Role::Tags, "thing-1"), vec!["tags".to_string()]);
        let mut keys = store.keys(Role::Tags, "thing-1", "tags");
        keys.sort();
        assert_eq!(keys, vec!["floor".to_string(), "room".to_string()]);
    }
}
