mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::*;
use tempfile::tempdir;
use tslog::storage::header::SNAPSHOT_HEADER_SIZE;
use tslog::{Error, FileStore, KeyValueStore, MemoryStore, Result, Series, SeriesConfig};

#[test]
fn reopen_reloads_last_persisted_buffer() -> anyhow::Result<()> {
    init_logging();
    let dir = tempdir()?;

    let series = Series::<Tick>::open("reload", FileStore::open(dir.path())?)?;
    let _ = series.append_all((0..10).map(|i| tick(T0 + i * SEC)).collect());
    let _ = series.prepend(tick(T0 - SEC));
    let _ = series.drop_until(T0);
    series.drop_since(T0 + 8 * SEC).wait()?;
    let expected = series.get();
    series.close()?;

    assert!(dir.path().join("TimeSeries_reload.tss").exists());

    let reopened = Series::<Tick>::open("reload", FileStore::open(dir.path())?)?;
    assert_eq!(reopened.get(), expected);
    assert_eq!(stamps(&reopened.get()), (1..8).map(|i| T0 + i * SEC).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn reopen_empty_label_is_empty() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let series = Series::<Tick>::open("nothing", FileStore::open(dir.path())?)?;
    assert_eq!(series.count(), 0);
    drop(series);

    let reopened = Series::<Tick>::open("nothing", FileStore::open(dir.path())?)?;
    assert_eq!(reopened.count(), 0);
    Ok(())
}

#[test]
fn drop_flushes_queued_mutations() {
    let (store, series) = open_memory("drain_on_drop");
    for i in 0..100 {
        let _ = series.append(tick(T0 + i));
    }
    drop(series);

    let reopened = Series::<Tick>::open("drain_on_drop", store).expect("reopen");
    assert_eq!(reopened.count(), 100);
    assert_ascending(&reopened.get());
}

#[test]
fn labels_are_isolated() {
    let store = MemoryStore::new();
    let a = Series::<Tick>::open("a", store.clone()).expect("open a");
    let b = Series::<Tick>::open("b", store.clone()).expect("open b");
    a.append(tick(T0)).wait().expect("append a");
    b.append_all(vec![tick(T0), tick(T0 + SEC)]).wait().expect("append b");
    assert_eq!(a.count(), 1);
    assert_eq!(b.count(), 2);
    assert!(store.contains("TimeSeries_a"));
    assert!(store.contains("TimeSeries_b"));
}

#[test]
fn custom_key_prefix() {
    let store = MemoryStore::new();
    let config = SeriesConfig {
        key_prefix: "Ticks".to_string(),
        ..SeriesConfig::default()
    };
    let series =
        Series::<Tick>::open_with_config("btc", store.clone(), config).expect("open series");
    assert_eq!(series.key(), "Ticks_btc");
    assert_eq!(series.label(), "btc");
    series.append(tick(T0)).wait().expect("append");
    assert!(store.contains("Ticks_btc"));
    assert!(!store.contains("TimeSeries_btc"));
}

#[test]
fn corrupt_snapshot_fails_open() -> anyhow::Result<()> {
    let (store, series) = open_memory("corrupt");
    series.append(tick(T0)).wait()?;
    series.close()?;

    let mut bytes = store.load("TimeSeries_corrupt")?.expect("snapshot");
    let idx = SNAPSHOT_HEADER_SIZE + 1;
    bytes[idx] ^= 0x20;
    store.put_raw("TimeSeries_corrupt", bytes);

    match Series::<Tick>::open("corrupt", store) {
        Err(Error::Corrupt(_)) => Ok(()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("corrupt snapshot opened"),
    }
}

#[test]
fn garbage_file_fails_open() -> anyhow::Result<()> {
    let dir = tempdir()?;
    std::fs::write(dir.path().join("TimeSeries_garbage.tss"), b"not a snapshot")?;
    let result = Series::<Tick>::open("garbage", FileStore::open(dir.path())?);
    assert!(matches!(result, Err(Error::Corrupt(_))));
    Ok(())
}

#[test]
fn unsorted_snapshot_fails_open() {
    let store = MemoryStore::new();
    let bytes = tslog::storage::codec::encode(&[tick(T0 + SEC), tick(T0)]).expect("encode");
    store.put_raw("TimeSeries_unsorted", bytes);
    let result = Series::<Tick>::open("unsorted", store);
    assert!(matches!(result, Err(Error::NonAscendingOrder)));
}

#[test]
fn path_like_labels_stay_inside_the_root() -> anyhow::Result<()> {
    let dir = tempdir()?;
    for label in ["BTC/USD", "../escape", "prix-\u{e9}t\u{e9}"] {
        let series = Series::<Tick>::open(label, FileStore::open(dir.path())?)?;
        series.append(tick(T0)).wait()?;
        series.close()?;

        let reopened = Series::<Tick>::open(label, FileStore::open(dir.path())?)?;
        assert_eq!(stamps(&reopened.get()), vec![T0], "label {label:?}");
    }
    assert!(dir.path().join("TimeSeries_BTC%2FUSD.tss").exists());
    for entry in std::fs::read_dir(dir.path())? {
        assert!(entry?.file_type()?.is_file());
    }
    Ok(())
}

#[test]
fn control_characters_in_label_open_normally() {
    let store = MemoryStore::new();
    let series = Series::<Tick>::open("a\0b", store.clone()).expect("open");
    series.append(tick(T0)).wait().expect("append");
    assert!(store.contains("TimeSeries_a\0b"));
}

/// Store whose writes can be switched off to simulate disk failures.
#[derive(Clone, Default)]
struct FlakyStore {
    inner: MemoryStore,
    failing: Arc<AtomicBool>,
}

impl KeyValueStore for FlakyStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.load(key)
    }

    fn store(&self, key: &str, value: &[u8]) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.store(key, value)
    }
}

#[test]
fn store_failure_is_reported_and_memory_unchanged() {
    init_logging();
    let store = FlakyStore::default();
    let series = Series::<Tick>::open("flaky", store.clone()).expect("open");
    series.append(tick(T0)).wait().expect("append");

    store.failing.store(true, Ordering::SeqCst);
    let err = series.append(tick(T0 + SEC)).wait().expect_err("write fails");
    assert!(matches!(err, Error::Io(_)));
    assert!(!err.is_ordering());
    assert_eq!(series.count(), 1);
    let err = series.drop_until(T0 + SEC).wait().expect_err("write fails");
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(series.count(), 1);

    // No automatic retry: the caller resubmits once the store recovers.
    store.failing.store(false, Ordering::SeqCst);
    series.append(tick(T0 + SEC)).wait().expect("resubmit");
    assert_eq!(stamps(&series.get()), vec![T0, T0 + SEC]);

    drop(series);
    let reopened = Series::<Tick>::open("flaky", store).expect("reopen");
    assert_eq!(reopened.count(), 2);
}
