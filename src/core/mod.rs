//! Time-ordered series: ordering invariant, range lookups and the
//! single-writer mutation queue.

pub mod error;
pub mod item;
pub mod locator;
pub mod series;
pub mod snapshot;
pub mod worker;

pub use error::{Error, Result};
pub use item::TimeSeriesItem;
pub use series::{Series, SeriesConfig};
pub use snapshot::Snapshot;
pub use worker::{Notifier, Ticket};
