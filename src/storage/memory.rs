use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::internal_error::InternalResult;

use super::traits::{FallbackStore, PrimaryStore};

/// In-process store usable as either tier. Nothing outlives the value.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FallbackStore for MemoryStore {
    fn get_item(&self, key: &str) -> InternalResult<Option<String>> {
        Ok(self.entries.read()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> InternalResult<()> {
        self.entries.write()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> InternalResult<()> {
        self.entries.write()?.remove(key);
        Ok(())
    }
}

#[async_trait]
impl PrimaryStore for MemoryStore {
    async fn get_item(&self, key: &str) -> InternalResult<Option<Value>> {
        match FallbackStore::get_item(self, key)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn set_item(&self, key: &str, value: &Value) -> InternalResult<()> {
        FallbackStore::set_item(self, key, &serde_json::to_string(value)?)
    }

    async fn remove_item(&self, key: &str) -> InternalResult<()> {
        FallbackStore::remove_item(self, key)
    }
}
