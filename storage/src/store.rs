use crate::Result;
use async_trait::async_trait;

/// One key in a last-write-wins store.
///
/// `set` is an unconditional overwrite. Implementations must not promise any
/// ordering relative to concurrent writers, and callers must not assume it.
#[async_trait]
pub trait LeaseStore: Send + Sync + std::fmt::Debug {
    /// Current value, or `None` when the key is absent.
    async fn get(&self) -> Result<Option<String>>;
    async fn set(&self, value: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}
