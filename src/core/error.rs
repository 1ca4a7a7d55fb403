use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// An item (or an already sorted batch) would land out of order relative
    /// to the head or tail of the existing series.
    #[error("non-ascending order: item would land out of order against the series")]
    NonAscendingOrder,
    /// A batch argument is not sorted by timestamp.
    #[error("non-ascending order argument: batch is not sorted by timestamp")]
    NonAscendingOrderArgument,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("corrupt snapshot: {0}")]
    Corrupt(&'static str),
    #[error("snapshot payload too large")]
    PayloadTooLarge,
    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("series worker has shut down")]
    Closed,
    /// Record code (`Clone` or `Serialize`) panicked while the worker was
    /// applying a mutation. The series is unchanged.
    #[error("mutation panicked: {0}")]
    MutationPanicked(String),
}

impl Error {
    /// True for the two ordering-invariant violations.
    pub fn is_ordering(&self) -> bool {
        matches!(self, Error::NonAscendingOrder | Error::NonAscendingOrderArgument)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
