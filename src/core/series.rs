//! Persistent, concurrent, timestamp-ordered series.
//!
//! # Design
//!
//! - **Buffer**: an immutable `Arc<[R]>`, always ascending by timestamp.
//!   Mutations build a new buffer and swap it in, so readers never see a
//!   partially applied change.
//! - **Writes**: every mutation goes through a single worker thread
//!   (see [`crate::core::worker`]) and is flushed to the store before it is
//!   published and acknowledged.
//! - **Reads**: `get*`, `count`, `first`, `last` read the published buffer
//!   directly and never wait on the worker.
//!
//! # Example
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use tslog::core::{Series, TimeSeriesItem};
//! use tslog::storage::FileStore;
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct Tick {
//!     timestamp_ns: u64,
//!     price: f64,
//! }
//!
//! impl TimeSeriesItem for Tick {
//!     fn timestamp_ns(&self) -> u64 {
//!         self.timestamp_ns
//!     }
//! }
//!
//! let store = FileStore::open("./ticks")?;
//! let series = Series::<Tick>::open("btc", store)?;
//! series.append(Tick { timestamp_ns: 1_000, price: 1.0 }).wait()?;
//! series.append(Tick { timestamp_ns: 2_000, price: 2.0 }).wait()?;
//!
//! let recent = series.get_since(1_000);
//! assert_eq!(recent.len(), 1);
//!
//! series.drop_until(1_500).wait()?;
//! assert_eq!(series.count(), 1);
//! # Ok::<(), tslog::core::Error>(())
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::item::TimeSeriesItem;
use crate::core::locator::{first_after, first_at_or_after, is_ascending};
use crate::core::snapshot::{SharedBuffer, Snapshot};
use crate::core::worker::{Notifier, Ticket, Worker};
use crate::core::{Error, Result};
use crate::storage::{codec, KeyValueStore};

const DEFAULT_KEY_PREFIX: &str = "TimeSeries";
const DEFAULT_THREAD_NAME_PREFIX: &str = "series";

#[derive(Clone, Debug)]
pub struct SeriesConfig {
    /// Persisted key is `<key_prefix>_<label>`.
    pub key_prefix: String,
    /// Worker thread is named `<thread_name_prefix>-<label>`, with control
    /// characters replaced by `_`.
    pub thread_name_prefix: String,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
        }
    }
}

impl SeriesConfig {
    pub fn key_for(&self, label: &str) -> String {
        format!("{}_{}", self.key_prefix, label)
    }

    pub fn thread_name_for(&self, label: &str) -> String {
        // Thread names may not contain NUL.
        format!("{}-{}", self.thread_name_prefix, label)
            .chars()
            .map(|c| if c.is_control() { '_' } else { c })
            .collect()
    }
}

pub(crate) enum Mutation<R> {
    Append(R),
    AppendAll(Vec<R>),
    Prepend(R),
    PrependAll(Vec<R>),
    DropUntil(u64),
    DropSince(u64),
}

impl<R: TimeSeriesItem + Clone> Mutation<R> {
    /// Validate against `current` and build the replacement buffer.
    ///
    /// `Ok(None)` is a no-op that must not be persisted. On `Err` nothing
    /// has changed.
    pub(crate) fn apply(self, current: &[R]) -> Result<Option<Vec<R>>> {
        match self {
            Mutation::Append(item) => {
                if let Some(last) = current.last() {
                    if item.timestamp_ns() < last.timestamp_ns() {
                        return Err(Error::NonAscendingOrder);
                    }
                }
                let mut next = Vec::with_capacity(current.len() + 1);
                next.extend_from_slice(current);
                next.push(item);
                Ok(Some(next))
            }
            Mutation::AppendAll(items) => {
                let Some(head) = items.first() else {
                    return Ok(None);
                };
                if !is_ascending(&items) {
                    return Err(Error::NonAscendingOrderArgument);
                }
                if let Some(last) = current.last() {
                    if head.timestamp_ns() < last.timestamp_ns() {
                        return Err(Error::NonAscendingOrder);
                    }
                }
                let mut next = Vec::with_capacity(current.len() + items.len());
                next.extend_from_slice(current);
                next.extend(items);
                Ok(Some(next))
            }
            Mutation::Prepend(item) => {
                if let Some(first) = current.first() {
                    if item.timestamp_ns() > first.timestamp_ns() {
                        return Err(Error::NonAscendingOrder);
                    }
                }
                let mut next = Vec::with_capacity(current.len() + 1);
                next.push(item);
                next.extend_from_slice(current);
                Ok(Some(next))
            }
            Mutation::PrependAll(mut items) => {
                let Some(tail) = items.last() else {
                    return Ok(None);
                };
                if !is_ascending(&items) {
                    return Err(Error::NonAscendingOrderArgument);
                }
                if let Some(first) = current.first() {
                    if tail.timestamp_ns() > first.timestamp_ns() {
                        return Err(Error::NonAscendingOrder);
                    }
                }
                items.extend_from_slice(current);
                Ok(Some(items))
            }
            Mutation::DropUntil(until_ns) => {
                let start = first_after(current, until_ns);
                Ok(Some(current[start..].to_vec()))
            }
            Mutation::DropSince(since_ns) => {
                let end = first_at_or_after(current, since_ns);
                Ok(Some(current[..end].to_vec()))
            }
        }
    }
}

/// A timestamp-ordered series persisted under one key of a [`KeyValueStore`].
///
/// Mutations are queued to a dedicated worker and return a [`Ticket`]
/// immediately; each also has a `*_with` form taking a completion callback
/// that runs on the worker thread. Dropping the series (or calling
/// [`Series::close`]) lets every queued mutation finish before the worker
/// stops.
pub struct Series<R> {
    label: String,
    key: String,
    shared: Arc<SharedBuffer<R>>,
    worker: Worker<R>,
}

impl<R> Series<R>
where
    R: TimeSeriesItem + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Open the series stored under `TimeSeries_<label>`, loading whatever
    /// was last persisted there (empty if nothing was).
    ///
    /// # Errors
    ///
    /// - `Error::Io`: Store failed to read the snapshot
    /// - `Error::Corrupt` / `Error::UnsupportedVersion`: Snapshot header or checksum invalid
    /// - `Error::Codec`: Snapshot payload does not decode as `Vec<R>`
    /// - `Error::NonAscendingOrder`: Snapshot decodes but is not sorted
    pub fn open<S: KeyValueStore>(label: &str, store: S) -> Result<Self> {
        Self::open_with_config(label, store, SeriesConfig::default())
    }

    pub fn open_with_config<S: KeyValueStore>(
        label: &str,
        store: S,
        config: SeriesConfig,
    ) -> Result<Self> {
        let key = config.key_for(label);

        // The only storage read in the life of a series.
        let initial: Vec<R> = match store.load(&key)? {
            Some(bytes) => codec::decode(&bytes)?,
            None => Vec::new(),
        };
        if !is_ascending(&initial) {
            return Err(Error::NonAscendingOrder);
        }
        log::debug!("series opened: key={key} records={}", initial.len());

        let shared = Arc::new(SharedBuffer::new(initial));
        let worker = Worker::spawn(
            config.thread_name_for(label),
            key.clone(),
            store,
            Arc::clone(&shared),
        )?;

        Ok(Self {
            label: label.to_string(),
            key,
            shared,
            worker,
        })
    }

    /// Add an item after the end of the series.
    ///
    /// Fails with `NonAscendingOrder` if it is older than the current last item.
    pub fn append(&self, item: R) -> Ticket {
        self.submit_ticket(Mutation::Append(item))
    }

    pub fn append_with(&self, item: R, on_done: impl FnOnce(Result<()>) + Send + 'static) {
        self.worker.submit(Mutation::Append(item), Box::new(on_done));
    }

    /// Add a sorted batch after the end of the series.
    ///
    /// An empty batch succeeds without touching the store. An unsorted batch
    /// fails with `NonAscendingOrderArgument` before the series is consulted.
    pub fn append_all(&self, items: Vec<R>) -> Ticket {
        self.submit_ticket(Mutation::AppendAll(items))
    }

    pub fn append_all_with(
        &self,
        items: Vec<R>,
        on_done: impl FnOnce(Result<()>) + Send + 'static,
    ) {
        self.worker.submit(Mutation::AppendAll(items), Box::new(on_done));
    }

    /// Add an item before the start of the series.
    pub fn prepend(&self, item: R) -> Ticket {
        self.submit_ticket(Mutation::Prepend(item))
    }

    pub fn prepend_with(&self, item: R, on_done: impl FnOnce(Result<()>) + Send + 'static) {
        self.worker.submit(Mutation::Prepend(item), Box::new(on_done));
    }

    /// Add a sorted batch before the start of the series.
    pub fn prepend_all(&self, items: Vec<R>) -> Ticket {
        self.submit_ticket(Mutation::PrependAll(items))
    }

    pub fn prepend_all_with(
        &self,
        items: Vec<R>,
        on_done: impl FnOnce(Result<()>) + Send + 'static,
    ) {
        self.worker.submit(Mutation::PrependAll(items), Box::new(on_done));
    }

    /// Discard every item with `timestamp <= until_ns`.
    pub fn drop_until(&self, until_ns: u64) -> Ticket {
        self.submit_ticket(Mutation::DropUntil(until_ns))
    }

    pub fn drop_until_with(
        &self,
        until_ns: u64,
        on_done: impl FnOnce(Result<()>) + Send + 'static,
    ) {
        self.worker.submit(Mutation::DropUntil(until_ns), Box::new(on_done));
    }

    /// Discard every item with `timestamp >= since_ns`.
    pub fn drop_since(&self, since_ns: u64) -> Ticket {
        self.submit_ticket(Mutation::DropSince(since_ns))
    }

    pub fn drop_since_with(
        &self,
        since_ns: u64,
        on_done: impl FnOnce(Result<()>) + Send + 'static,
    ) {
        self.worker.submit(Mutation::DropSince(since_ns), Box::new(on_done));
    }

    /// Drain queued mutations, stop the worker and release the store.
    ///
    /// # Errors
    ///
    /// - `Error::Closed`: The worker thread panicked
    pub fn close(self) -> Result<()> {
        let mut worker = self.worker;
        worker.shutdown()
    }

    fn submit_ticket(&self, mutation: Mutation<R>) -> Ticket {
        let (ticket, notifier): (Ticket, Notifier) = Ticket::channel();
        self.worker.submit(mutation, notifier);
        ticket
    }
}

impl<R> Series<R> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Key the series is persisted under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Every item, oldest first.
    pub fn get(&self) -> Snapshot<R> {
        Snapshot::whole(self.shared.load())
    }

    /// Items with `timestamp > since_ns`.
    pub fn get_since(&self, since_ns: u64) -> Snapshot<R>
    where
        R: TimeSeriesItem,
    {
        let buffer = self.shared.load();
        let len = buffer.len();
        let start = match (buffer.first(), buffer.last()) {
            (Some(_), Some(last)) if last.timestamp_ns() <= since_ns => len,
            (Some(first), Some(_)) if since_ns < first.timestamp_ns() => 0,
            (Some(_), Some(_)) => first_after(&buffer, since_ns),
            _ => len,
        };
        Snapshot::new(buffer, start..len)
    }

    /// Items with `timestamp < until_ns`.
    pub fn get_until(&self, until_ns: u64) -> Snapshot<R>
    where
        R: TimeSeriesItem,
    {
        let buffer = self.shared.load();
        let end = match buffer.first() {
            None => 0,
            Some(first) if first.timestamp_ns() >= until_ns => 0,
            Some(_) => first_at_or_after(&buffer, until_ns),
        };
        Snapshot::new(buffer, 0..end)
    }

    pub fn count(&self) -> usize {
        self.shared.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn first(&self) -> Option<R>
    where
        R: Clone,
    {
        self.shared.load().first().cloned()
    }

    pub fn last(&self) -> Option<R>
    where
        R: Clone,
    {
        self.shared.load().last().cloned()
    }
}
