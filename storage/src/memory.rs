use crate::{store::LeaseStore, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Process-local store. Clones share the same slot, so several simulated
/// replicas can contend over one value.
#[derive(Debug, Clone, Default)]
pub struct MemoryLeaseStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(value.into()))),
        }
    }

    /// Synchronous peek, for assertions.
    pub fn value(&self) -> Option<String> {
        self.slot.lock().clone()
    }

    pub fn put(&self, value: impl Into<String>) {
        *self.slot.lock() = Some(value.into());
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn get(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().clone())
    }

    async fn set(&self, value: &str) -> Result<()> {
        *self.slot.lock() = Some(value.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.slot.lock().take();
        Ok(())
    }
}
