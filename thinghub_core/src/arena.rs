//! Generic thread-safe arena: every stateful manager (ThingManager,
//! RuleEngine, TypeRegistry) keeps its entities in one of these, indexed
//! by id, rather than wiring entities to each other through pointers.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

#[derive(Debug)]
pub struct Arena<K, T> {
    inner: Arc<Mutex<HashMap<K, T>>>,
}

impl<K, T> Clone for Arena<K, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, T> Arena<K, T>
where
    K: Eq + Hash + Copy,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn insert(&self, id: K, item: T) -> Option<T> {
        let mut guard = self.inner.lock().unwrap();
        guard.insert(id, item)
    }

    pub fn get(&self, id: &K) -> Option<T>
    where
        T: Clone,
    {
        let guard = self.inner.lock().unwrap();
        guard.get(id).cloned()
    }

    pub fn with<R>(&self, id: &K, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.inner.lock().unwrap();
        guard.get(id).map(f)
    }

    pub fn with_mut<R>(&self, id: &K, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.inner.lock().unwrap();
        guard.get_mut(id).map(f)
    }

    pub fn remove(&self, id: &K) -> Option<T> {
        let mut guard = self.inner.lock().unwrap();
        guard.remove(id)
    }

    pub fn contains(&self, id: &K) -> bool {
        let guard = self.inner.lock().unwrap();
        guard.contains_key(id)
    }

    pub fn ids(&self) -> Vec<K> {
        let guard = self.inner.lock().unwrap();
        guard.keys().copied().collect()
    }

    pub fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        let guard = self.inner.lock().unwrap();
        guard.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let guard = self.inner.lock().unwrap();
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn retain(&self, mut f: impl FnMut(&K, &mut T) -> bool) {
        let mut guard = self.inner.lock().unwrap();
        guard.retain(|k, v| f(k, v));
    }
}

impl<K, T> Default for Arena<K, T>
where
    K: Eq + Hash + Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A bare `Uuid`-keyed arena, used where the id type is erased (e.g. the
/// async op tracker keys by a raw transaction id).
pub type UuidArena<T> = Arena<Uuid, T>;
