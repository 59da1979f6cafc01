//! Core domain types for the footprint journal.
//!
//! A footprint is a photo tagged with the place it was taken. This crate holds
//! the persisted [`LocationRecord`] model, the [`RecordStore`] that keeps the
//! collection in a single storage unit, the device contracts
//! ([`LocationProvider`], [`CameraProvider`]) and the [`CaptureWorkflow`] state
//! machine that turns device fetches into committed records.
//!
//! Constructors return `Result` to surface invalid input early.

#![forbid(unsafe_code)]

mod location;
mod provider;
mod record;
pub mod store;
mod workflow;

#[doc(hidden)]
pub mod test_support;

pub use location::{Address, Coordinates, DEFAULT_MAP_DELTA, LocationFix};
pub use provider::{CameraProvider, Device, DeviceError, LocationProvider, Permission};
pub use record::{LocationRecord, NewRecord, PhotoRef, RecordId, RecordUpdate, ValidationError};
pub use store::{
    BackendError, Collection, CollectionBackend, DEFAULT_UNIT_NAME, FileBackend, MemoryBackend,
    RecordStore, StorageError, UpdateError,
};
#[cfg(feature = "store-sqlite")]
pub use store::{SqliteBackend, SqliteBackendError};
pub use workflow::{
    Candidate, CaptureError, CaptureState, CaptureWorkflow, DEFAULT_FETCH_TIMEOUT, FALLBACK_NAME,
    FetchOutcome, PhotoUpdate, SessionId, WorkflowConfig,
};
