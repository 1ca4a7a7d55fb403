//! Disk-backed, time-ordered append log.
//!
//! A [`Series`] keeps timestamped records sorted ascending, answers
//! since/until range queries by binary search, and persists its whole buffer
//! through a [`storage::KeyValueStore`] on every mutation. Writes are
//! serialized through one worker thread per series; reads never wait on it.

pub mod core;
pub mod storage;

pub use crate::core::{Error, Result, Series, SeriesConfig, Snapshot, Ticket, TimeSeriesItem};
pub use crate::storage::{FileStore, FileStoreConfig, KeyValueStore, MemoryStore};
