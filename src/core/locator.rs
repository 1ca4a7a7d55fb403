//! Binary search over a timestamp-sorted slice.
//!
//! Every function here assumes the slice is ascending by
//! [`TimeSeriesItem::timestamp_ns`]. Results are meaningless otherwise.

use crate::core::item::TimeSeriesItem;

/// Find the index `N` such that `predicate` holds for every timestamp before
/// `N` and fails for every timestamp from `N` on.
///
/// The predicate must be monotonic (true, then false) over the slice.
/// Returns `items.len()` when it holds everywhere, `0` when it holds nowhere.
pub fn locate<R, F>(items: &[R], mut predicate: F) -> usize
where
    R: TimeSeriesItem,
    F: FnMut(u64) -> bool,
{
    let mut low = 0;
    let mut high = items.len();
    while low < high {
        let mid = low + (high - low) / 2;
        if predicate(items[mid].timestamp_ns()) {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    low
}

/// Start index of the records strictly after `since_ns`.
pub fn first_after<R: TimeSeriesItem>(items: &[R], since_ns: u64) -> usize {
    locate(items, |ts| ts <= since_ns)
}

/// End index (exclusive) of the records strictly before `until_ns`.
pub fn first_at_or_after<R: TimeSeriesItem>(items: &[R], until_ns: u64) -> usize {
    locate(items, |ts| ts < until_ns)
}

/// True if timestamps never decrease. Empty and single-item slices are sorted.
pub fn is_ascending<R: TimeSeriesItem>(items: &[R]) -> bool {
    items
        .windows(2)
        .all(|pair| pair[0].timestamp_ns() <= pair[1].timestamp_ns())
}
