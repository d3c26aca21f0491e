// Store wrappers for exercising lease protocols without a control plane

use crate::{memory::MemoryLeaseStore, store::LeaseStore, Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

/// One call made against a [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Get,
    Set(String),
    Clear,
}

impl StoreOp {
    pub fn is_write(&self) -> bool {
        !matches!(self, StoreOp::Get)
    }
}

/// Which operation kind should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Faults {
    pub get: bool,
    pub set: bool,
    pub clear: bool,
}

/// Records every call and optionally injects failures or a competing write.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryLeaseStore,
    ops: Mutex<Vec<StoreOp>>,
    faults: Mutex<Faults>,
    /// Gets left until a one-shot read failure
    get_countdown: Mutex<Option<usize>>,
    interloper: Mutex<Option<String>>,
}

impl RecordingStore {
    pub fn new(inner: MemoryLeaseStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self::new(MemoryLeaseStore::with_value(value))
    }

    pub fn inner(&self) -> &MemoryLeaseStore {
        &self.inner
    }

    pub fn value(&self) -> Option<String> {
        self.inner.value()
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().clone()
    }

    pub fn writes(&self) -> Vec<StoreOp> {
        self.ops.lock().iter().filter(|op| op.is_write()).cloned().collect()
    }

    pub fn reset_ops(&self) {
        self.ops.lock().clear();
    }

    pub fn set_faults(&self, faults: Faults) {
        *self.faults.lock() = faults;
    }

    /// Fail only the `n`-th `get` from now (1-based), once.
    pub fn fail_nth_get(&self, n: usize) {
        *self.get_countdown.lock() = Some(n);
    }

    fn take_get_fault(&self) -> bool {
        let mut countdown = self.get_countdown.lock();
        match *countdown {
            Some(1) => {
                *countdown = None;
                true
            }
            Some(n) if n > 1 => {
                *countdown = Some(n - 1);
                false
            }
            _ => false,
        }
    }

    /// After the next successful `set`, overwrite the slot with `value` as if
    /// another replica's write had landed late. The foreign write is not
    /// recorded as one of our operations.
    pub fn overwrite_after_next_set(&self, value: impl Into<String>) {
        *self.interloper.lock() = Some(value.into());
    }
}

#[async_trait]
impl LeaseStore for RecordingStore {
    async fn get(&self) -> Result<Option<String>> {
        self.ops.lock().push(StoreOp::Get);
        let fail = self.faults.lock().get || self.take_get_fault();
        if fail {
            return Err(Error::Injected("get"));
        }
        self.inner.get().await
    }

    async fn set(&self, value: &str) -> Result<()> {
        self.ops.lock().push(StoreOp::Set(value.to_string()));
        let fail = self.faults.lock().set;
        if fail {
            return Err(Error::Injected("set"));
        }
        self.inner.set(value).await?;
        let foreign = self.interloper.lock().take();
        if let Some(foreign) = foreign {
            self.inner.put(foreign);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.ops.lock().push(StoreOp::Clear);
        let fail = self.faults.lock().clear;
        if fail {
            return Err(Error::Injected("clear"));
        }
        self.inner.clear().await
    }
}
