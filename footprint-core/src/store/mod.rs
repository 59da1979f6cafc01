//! Durable storage for the footprint collection.
//!
//! [`RecordStore`] owns the collection of [`LocationRecord`] values and
//! persists it through a [`CollectionBackend`] as one opaque unit. The medium
//! offers no per-record writes, so every mutation reads the current unit,
//! applies the change and writes the whole collection back. A single writer
//! lock around that cycle keeps two mutations from interleaving and losing one
//! another's effect.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::debug;

use crate::{LocationRecord, NewRecord, PhotoRef, RecordId, RecordUpdate};

mod backend;
mod error;
mod file;
#[cfg(feature = "store-sqlite")]
mod sqlite;

pub use backend::{BackendError, CollectionBackend, DEFAULT_UNIT_NAME, MemoryBackend};
pub use error::{StorageError, UpdateError};
pub use file::FileBackend;
#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteBackend, SqliteBackendError};

/// Records ordered newest first.
pub type Collection = Vec<LocationRecord>;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Default)]
struct StoreState {
    /// Last collection successfully read or written.
    view: Collection,
    /// Highest identifier this store has issued.
    last_issued: Option<RecordId>,
}

/// Serialised read-modify-write access to the persisted collection.
///
/// All operations take `&self`; the store can be shared behind an `Arc` and
/// called from several threads or tasks at once. Calls are applied one at a
/// time in lock-acquisition order.
///
/// # Examples
///
/// ```rust
/// use footprint_core::{
///     Coordinates, LocationFix, MemoryBackend, NewRecord, PhotoRef, RecordStore,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = RecordStore::new(MemoryBackend::default());
/// let fix = LocationFix { coords: Coordinates::new(37.421, -122.084)?, address: None };
/// let records = store.create(NewRecord::new("Park", fix, PhotoRef::new("file:///p.jpg"))?)?;
/// assert_eq!(records.len(), 1);
///
/// let records = store.rename(records[0].id(), "Picnic")?;
/// assert_eq!(records[0].name(), "Picnic");
/// # Ok(())
/// # }
/// ```
pub struct RecordStore<B> {
    backend: B,
    clock: Clock,
    state: Mutex<StoreState>,
}

impl<B: std::fmt::Debug> std::fmt::Debug for RecordStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("backend", &self.backend)
            .field("clock", &"<fn() -> DateTime<Utc>>")
            .field("state", &self.state)
            .finish()
    }
}

impl<B: CollectionBackend> RecordStore<B> {
    /// Wrap `backend`. Nothing is read until the first call.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            clock: Box::new(Utc::now),
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Replace the clock used to stamp new records.
    #[must_use]
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    /// The underlying storage medium.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Last collection this store read or wrote successfully.
    ///
    /// Does not touch the backend. Empty until the first successful call.
    pub fn records(&self) -> Result<Collection, StorageError> {
        Ok(self.lock()?.view.clone())
    }

    /// Read the persisted collection, newest first.
    ///
    /// An absent or empty unit reads as an empty collection.
    pub fn load(&self) -> Result<Collection, StorageError> {
        let mut state = self.lock()?;
        let records = self.read_current()?;
        state.view.clone_from(&records);
        Ok(records)
    }

    /// Stamp `candidate` with a fresh identifier and the current time and
    /// prepend it to the collection.
    pub fn create(&self, candidate: NewRecord) -> Result<Collection, StorageError> {
        let mut state = self.lock()?;
        let mut records = self.read_current()?;

        let floor = records
            .iter()
            .map(LocationRecord::id)
            .chain(state.last_issued)
            .max();
        let created_at = (self.clock)();
        let id = RecordId::issue(created_at, floor)
            .ok_or_else(|| StorageError::IdsExhausted {
                unit: self.backend.unit_name().to_owned(),
            })?;
        records.insert(0, candidate.into_record(id, created_at));

        self.persist(&mut state, records)?;
        state.last_issued = Some(id);
        debug!("created record {id} in unit {}", self.backend.unit_name());
        Ok(state.view.clone())
    }

    /// Remove the record `id`. Unknown identifiers are ignored.
    pub fn delete(&self, id: RecordId) -> Result<Collection, StorageError> {
        let mut state = self.lock()?;
        let mut records = self.read_current()?;
        let before = records.len();
        records.retain(|record| record.id() != id);

        if records.len() == before {
            debug!("delete ignored unknown record {id}");
            state.view = records;
        } else {
            self.persist(&mut state, records)?;
            debug!("deleted record {id}");
        }
        Ok(state.view.clone())
    }

    /// Replace one mutable field of record `id`.
    ///
    /// The new value is validated before anything is read, so an empty name
    /// fails even for an unknown record. Unknown identifiers otherwise leave
    /// the collection unchanged.
    pub fn update(&self, id: RecordId, update: RecordUpdate) -> Result<Collection, UpdateError> {
        let update = update.validated()?;
        self.modify(id, |record| record.apply(update).map_err(UpdateError::from))
    }

    /// Rename record `id`. See [`RecordStore::update`].
    pub fn rename(&self, id: RecordId, name: &str) -> Result<Collection, UpdateError> {
        self.update(id, RecordUpdate::Name(name.to_owned()))
    }

    /// Replace the photo of record `id`. Unknown identifiers are ignored.
    pub fn replace_photo(&self, id: RecordId, photo: PhotoRef) -> Result<Collection, StorageError> {
        self.modify(id, |record| Ok(record.with_photo(photo)))
    }

    fn modify<E, F>(&self, id: RecordId, apply: F) -> Result<Collection, E>
    where
        E: From<StorageError>,
        F: FnOnce(LocationRecord) -> Result<LocationRecord, E>,
    {
        let mut state = self.lock()?;
        let mut records = self.read_current()?;

        let Some(index) = records.iter().position(|record| record.id() == id) else {
            debug!("update ignored unknown record {id}");
            state.view = records;
            return Ok(state.view.clone());
        };
        let updated = apply(records.remove(index))?;
        records.insert(index, updated);

        self.persist(&mut state, records)?;
        debug!("updated record {id}");
        Ok(state.view.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StorageError> {
        self.state.lock().map_err(|_| StorageError::Poisoned)
    }

    fn read_current(&self) -> Result<Collection, StorageError> {
        let unit = self.backend.unit_name();
        let bytes = self
            .backend
            .read()
            .map_err(|source| StorageError::Read {
                unit: unit.to_owned(),
                source,
            })?;
        match bytes {
            Some(bytes) if !bytes.trim_ascii().is_empty() => serde_json::from_slice(&bytes)
                .map_err(|source| StorageError::Decode {
                    unit: unit.to_owned(),
                    source,
                }),
            _ => Ok(Collection::new()),
        }
    }

    /// Write `records` as the whole unit, then adopt them as the view.
    fn persist(&self, state: &mut StoreState, records: Collection) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(&records).map_err(StorageError::Encode)?;
        self.backend
            .write(&bytes)
            .map_err(|source| StorageError::Write {
                unit: self.backend.unit_name().to_owned(),
                source,
            })?;
        state.view = records;
        Ok(())
    }
}
