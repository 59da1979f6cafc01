//! Facade crate for the footprint journal.
//!
//! This crate re-exports the core domain types and exposes the SQLite storage
//! backend behind the `store-sqlite` feature flag.

#![forbid(unsafe_code)]

pub use footprint_core::{
    Address, CameraProvider, CaptureError, CaptureState, CaptureWorkflow, Collection,
    CollectionBackend, Coordinates, FetchOutcome, FileBackend, LocationFix, LocationProvider,
    LocationRecord, MemoryBackend, NewRecord, PhotoRef, RecordId, RecordStore, RecordUpdate,
    StorageError, UpdateError, ValidationError, WorkflowConfig,
};

#[cfg(feature = "store-sqlite")]
pub use footprint_core::{SqliteBackend, SqliteBackendError};
