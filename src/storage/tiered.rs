use std::sync::Arc;

use log::warn;
use serde_json::Value;

use crate::internal_error::{InternalError, InternalResult};

use super::traits::{FallbackStore, PrimaryStore};

/// Whether a successful primary write is also copied into the fallback tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirror {
    /// Fallback is written only when the primary write fails.
    OnFailure,
    /// Fallback is written after every primary write as well.
    Always,
}

/// Coordinates the two tiers: every operation tries the primary store first
/// and degrades to the fallback store when the primary errors.
///
/// A fallback hit is returned as-is; it is never merged back into the
/// primary tier here (that is the job of the one-time migration).
pub struct TieredStore {
    primary: Arc<dyn PrimaryStore>,
    fallback: Arc<dyn FallbackStore>,
}

impl TieredStore {
    pub fn new(primary: Arc<dyn PrimaryStore>, fallback: Arc<dyn FallbackStore>) -> Self {
        Self { primary, fallback }
    }

    pub fn primary(&self) -> &dyn PrimaryStore {
        self.primary.as_ref()
    }

    pub fn fallback(&self) -> &dyn FallbackStore {
        self.fallback.as_ref()
    }

    /// Primary value, or the fallback value if the primary errors.
    pub async fn read(&self, key: &str) -> InternalResult<Option<Value>> {
        match self.primary.get_item(key).await {
            Ok(value) => Ok(value),
            Err(primary_error) => {
                warn!("primary read of {} failed, using fallback: {}", key, primary_error);
                self.read_fallback(key)
                    .map_err(|fallback_error| exhausted(&primary_error, &fallback_error))
            }
        }
    }

    /// Like `read`, but an absent primary value also consults the fallback.
    pub async fn read_or_fallback(&self, key: &str) -> InternalResult<Option<Value>> {
        match self.read(key).await? {
            Some(value) => Ok(Some(value)),
            None => self.read_fallback(key),
        }
    }

    pub async fn write(&self, key: &str, value: &Value, mirror: Mirror) -> InternalResult<()> {
        match self.primary.set_item(key, value).await {
            Ok(()) => {
                if mirror == Mirror::Always {
                    if let Err(e) = self.write_fallback(key, value) {
                        warn!("mirroring {} into fallback failed: {}", key, e);
                    }
                }
                Ok(())
            }
            Err(primary_error) => {
                warn!("primary write of {} failed, using fallback: {}", key, primary_error);
                self.write_fallback(key, value)
                    .map_err(|fallback_error| exhausted(&primary_error, &fallback_error))
            }
        }
    }

    pub fn read_fallback(&self, key: &str) -> InternalResult<Option<Value>> {
        match self.fallback.get_item(key)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    pub fn write_fallback(&self, key: &str, value: &Value) -> InternalResult<()> {
        self.fallback.set_item(key, &serde_json::to_string(value)?)
    }
}

fn exhausted(primary: &InternalError, fallback: &InternalError) -> InternalError {
    InternalError::TiersExhausted {
        primary: primary.to_string(),
        fallback: fallback.to_string(),
    }
}
