use thiserror::Error;

use super::backend::BackendError;
use crate::ValidationError;

/// Failure to read, decode, encode or write the persisted collection.
///
/// A failed mutation leaves both the stored unit and the store's in-memory
/// view as they were.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The backend could not read the unit.
    #[error("failed to read unit {unit:?}: {source}")]
    Read {
        /// Name of the unit.
        unit: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// The backend could not write the unit.
    #[error("failed to write unit {unit:?}: {source}")]
    Write {
        /// Name of the unit.
        unit: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// The unit does not hold a valid record collection.
    #[error("unit {unit:?} does not hold a valid record collection: {source}")]
    Decode {
        /// Name of the unit.
        unit: String,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The unit already holds the largest representable identifier, so no
    /// new record can be given a unique one.
    #[error("unit {unit:?} has no identifiers left to issue")]
    IdsExhausted {
        /// Name of the unit.
        unit: String,
    },
    /// The collection could not be encoded.
    #[error("failed to encode record collection: {0}")]
    Encode(#[source] serde_json::Error),
    /// A writer panicked while holding the store lock.
    #[error("record store lock was poisoned by a panicking writer")]
    Poisoned,
}

/// Errors from [`crate::RecordStore::update`].
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The new field value was rejected; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Persisting the update failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
