//! Persistence substrate for series snapshots.
//!
//! A store is a blocking load/store-by-key service over opaque bytes. The
//! series worker owns its store once opened and is the only caller.

pub mod codec;
pub mod file;
pub mod header;
pub mod memory;

pub use file::{FileStore, FileStoreConfig};
pub use memory::MemoryStore;

use crate::core::Result;

pub trait KeyValueStore: Send + 'static {
    /// Bytes last stored under `key`, or `None` if nothing was ever stored.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the value under `key`. Must be durable (per the store's own
    /// policy) by the time it returns.
    fn store(&self, key: &str, value: &[u8]) -> Result<()>;
}

impl<S: KeyValueStore + Sync> KeyValueStore for std::sync::Arc<S> {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).load(key)
    }

    fn store(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).store(key, value)
    }
}
