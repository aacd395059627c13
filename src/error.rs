/*!
 * defines the [DeltaError] and [Result] types.
*/

use thiserror::Error;

/// Delta error type
#[derive(Error, Debug)]
pub enum DeltaError {
    /// The object store failed, including lookups of absent objects.
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
    /// The log finished loading while still at version -1.
    #[error("no commits found")]
    EmptyTable,
    /// An action envelope carried a tag this crate does not recognize.
    #[error("unknown action: {0}")]
    UnknownAction(String),
    /// An action envelope carried no payload at all.
    #[error("no action found")]
    NoAction,
    /// A checkpoint row is missing a column its decoder requires.
    #[error("column {0} missing from checkpoint schema")]
    SchemaMismatch(String),
    /// The checkpoint pointer names a part that is absent from the store.
    #[error("checkpoint part {0} is missing")]
    CheckpointIncomplete(String),
    /// A commit line or checkpoint row could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// A checkpoint part could not be read as parquet.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    /// A table URI names no storage backend this crate knows.
    #[error("invalid table uri: {0}")]
    InvalidTableUri(String),
}

impl DeltaError {
    /// True when the underlying failure was an absent object. The loader
    /// recovers from these: an absent pointer means "no checkpoint" and an
    /// absent commit means the end of the log.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DeltaError::ObjectStore(object_store::Error::NotFound { .. })
        )
    }
}

impl From<serde_json::Error> for DeltaError {
    fn from(err: serde_json::Error) -> Self {
        DeltaError::Decode(err.to_string())
    }
}

/// Delta result type
pub type Result<T> = std::result::Result<T, DeltaError>;
