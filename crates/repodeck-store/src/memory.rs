use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{KeyValueStore, Result, StoreError};

/// In-process store
///
/// Clones share the same map, which makes "restart the app" easy to fake:
/// keep a clone, drop everything else, load again from the clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_values() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set("theme", "dark").unwrap();

        assert_eq!(other.get_string("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(other.len(), 1);
    }
}
