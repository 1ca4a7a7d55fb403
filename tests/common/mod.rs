#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use tslog::{MemoryStore, Series, TimeSeriesItem};

pub const SEC: u64 = 1_000_000_000;
/// 2023-11-14T22:13:20Z
pub const T0: u64 = 1_700_000_000 * SEC;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp_ns: u64,
    pub seq: u64,
}

impl TimeSeriesItem for Tick {
    fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }
}

pub fn tick(timestamp_ns: u64) -> Tick {
    Tick { timestamp_ns, seq: 0 }
}

pub fn tick_seq(timestamp_ns: u64, seq: u64) -> Tick {
    Tick { timestamp_ns, seq }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn open_memory(label: &str) -> (MemoryStore, Series<Tick>) {
    init_logging();
    let store = MemoryStore::new();
    let series = Series::open(label, store.clone()).expect("open series");
    (store, series)
}

pub fn stamps(items: &[Tick]) -> Vec<u64> {
    items.iter().map(|item| item.timestamp_ns).collect()
}

pub fn assert_ascending(items: &[Tick]) {
    for pair in items.windows(2) {
        assert!(
            pair[0].timestamp_ns <= pair[1].timestamp_ns,
            "out of order: {} then {}",
            pair[0].timestamp_ns,
            pair[1].timestamp_ns
        );
    }
}
