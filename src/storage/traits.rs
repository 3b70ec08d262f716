use async_trait::async_trait;
use serde_json::Value;

use crate::internal_error::InternalResult;

/// Primary tier: an asynchronous store of structured (JSON) values.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    /// Returns `None` when the key has never been written.
    async fn get_item(&self, key: &str) -> InternalResult<Option<Value>>;

    async fn set_item(&self, key: &str, value: &Value) -> InternalResult<()>;

    async fn remove_item(&self, key: &str) -> InternalResult<()>;
}

/// Secondary tier: a synchronous store of plain strings.
pub trait FallbackStore: Send + Sync {
    fn get_item(&self, key: &str) -> InternalResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> InternalResult<()>;

    fn remove_item(&self, key: &str) -> InternalResult<()>;
}
