//! Single-writer mutation queue.
//!
//! Each series owns one worker thread that drains an unbounded channel of
//! requests. A request is validated against the published buffer, persisted,
//! published, and only then is its notifier called. The next request is not
//! dequeued until that has happened.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core::item::TimeSeriesItem;
use crate::core::series::Mutation;
use crate::core::snapshot::SharedBuffer;
use crate::core::{Error, Result};
use crate::storage::{codec, KeyValueStore};

/// Completion callback for one mutation. Called exactly once.
pub type Notifier = Box<dyn FnOnce(Result<()>) + Send + 'static>;

pub(crate) struct Request<R> {
    mutation: Mutation<R>,
    notifier: Notifier,
}

/// Handle to the outcome of a submitted mutation.
///
/// Dropping a ticket does not cancel the mutation.
#[must_use = "a ticket carries the mutation's outcome"]
#[derive(Debug)]
pub struct Ticket {
    outcome_rx: mpsc::Receiver<Result<()>>,
}

impl Ticket {
    pub(crate) fn channel() -> (Self, Notifier) {
        let (outcome_tx, outcome_rx) = mpsc::sync_channel(1);
        let notifier: Notifier = Box::new(move |outcome| {
            let _ = outcome_tx.send(outcome);
        });
        (Self { outcome_rx }, notifier)
    }

    /// Block until the mutation has completed.
    pub fn wait(self) -> Result<()> {
        self.outcome_rx.recv().unwrap_or(Err(Error::Closed))
    }

    /// Block for at most `timeout`. `None` means the mutation is still queued
    /// or running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<()>> {
        match self.outcome_rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => Some(Err(Error::Closed)),
        }
    }

    /// Poll without blocking.
    pub fn try_outcome(&self) -> Option<Result<()>> {
        match self.outcome_rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(Error::Closed)),
        }
    }
}

pub(crate) struct Worker<R> {
    request_tx: Option<mpsc::Sender<Request<R>>>,
    handle: Option<JoinHandle<()>>,
}

impl<R> Worker<R>
where
    R: TimeSeriesItem + Clone + Serialize + Send + Sync + 'static,
{
    pub(crate) fn spawn<S: KeyValueStore>(
        thread_name: String,
        key: String,
        store: S,
        shared: Arc<SharedBuffer<R>>,
    ) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<Request<R>>();

        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                log::debug!("series worker started: key={key}");
                let mut processed: u64 = 0;
                // recv() fails only once every sender is gone and the queue is empty.
                while let Ok(Request { mutation, notifier }) = request_rx.recv() {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        execute(&key, &store, &shared, mutation)
                    }))
                    .unwrap_or_else(|payload| {
                        let reason = panic_message(payload.as_ref());
                        log::warn!("series mutation panicked: key={key} reason={reason}");
                        Err(Error::MutationPanicked(reason))
                    });
                    if panic::catch_unwind(AssertUnwindSafe(|| notifier(outcome))).is_err() {
                        log::warn!("series notifier panicked: key={key}");
                    }
                    processed += 1;
                }
                log::debug!("series worker stopped: key={key} processed={processed}");
            })
            .map_err(Error::Io)?;

        Ok(Self {
            request_tx: Some(request_tx),
            handle: Some(handle),
        })
    }
}

impl<R> Worker<R> {
    pub(crate) fn submit(&self, mutation: Mutation<R>, notifier: Notifier) {
        let Some(request_tx) = self.request_tx.as_ref() else {
            notifier(Err(Error::Closed));
            return;
        };
        if let Err(mpsc::SendError(request)) = request_tx.send(Request { mutation, notifier }) {
            (request.notifier)(Err(Error::Closed));
        }
    }

    /// Stop accepting requests, let the worker finish everything already
    /// queued, and join it.
    pub(crate) fn shutdown(&mut self) -> Result<()> {
        self.request_tx.take();
        match self.handle.take() {
            // Last handle dropped from inside a notifier: the loop exits on its own.
            Some(handle) if handle.thread().id() == thread::current().id() => Ok(()),
            Some(handle) => handle.join().map_err(|_| Error::Closed),
            None => Ok(()),
        }
    }
}

impl<R> Drop for Worker<R> {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn execute<R, S>(
    key: &str,
    store: &S,
    shared: &SharedBuffer<R>,
    mutation: Mutation<R>,
) -> Result<()>
where
    R: TimeSeriesItem + Clone + Serialize,
    S: KeyValueStore,
{
    let current = shared.load();
    let Some(next) = mutation.apply(&current)? else {
        return Ok(());
    };

    let started = Instant::now();
    let bytes = codec::encode(&next)?;
    if let Err(err) = store.store(key, &bytes) {
        log::warn!("series flush failed: key={key} err={err}");
        return Err(err);
    }
    log::trace!(
        "series flushed: key={key} records={} bytes={} elapsed={:?}",
        next.len(),
        bytes.len(),
        started.elapsed()
    );

    shared.publish(Arc::from(next));
    Ok(())
}
