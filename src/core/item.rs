/// Any value indexed by a point in time.
///
/// Timestamps are nanoseconds since the UNIX epoch. The series never looks at
/// anything else on the record.
pub trait TimeSeriesItem {
    fn timestamp_ns(&self) -> u64;
}

impl<T: TimeSeriesItem + ?Sized> TimeSeriesItem for &T {
    fn timestamp_ns(&self) -> u64 {
        (**self).timestamp_ns()
    }
}

impl<T: TimeSeriesItem + ?Sized> TimeSeriesItem for Box<T> {
    fn timestamp_ns(&self) -> u64 {
        (**self).timestamp_ns()
    }
}
