//! Storage media holding the serialised collection as one opaque unit.

use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Name under which the collection is stored unless configured otherwise.
pub const DEFAULT_UNIT_NAME: &str = "shareListData";

/// Boxed error returned by a [`CollectionBackend`].
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// A medium that stores exactly one named blob.
///
/// There is no partial write: `write` replaces the whole unit. Implementations
/// must be safe to share between threads; [`crate::RecordStore`] serialises
/// calls so implementations need not coordinate concurrent writers themselves.
///
/// # Examples
///
/// ```rust
/// use footprint_core::{CollectionBackend, MemoryBackend};
///
/// let backend = MemoryBackend::default();
/// assert!(backend.read()?.is_none());
/// backend.write(b"[]")?;
/// assert_eq!(backend.read()?.as_deref(), Some(&b"[]"[..]));
/// # Ok::<(), footprint_core::BackendError>(())
/// ```
pub trait CollectionBackend: Send + Sync {
    /// Name of the stored unit, used in diagnostics.
    fn unit_name(&self) -> &str;

    /// Return the unit's bytes, or `None` when nothing has been stored yet.
    fn read(&self) -> Result<Option<Vec<u8>>, BackendError>;

    /// Replace the unit with `bytes`.
    fn write(&self, bytes: &[u8]) -> Result<(), BackendError>;
}

impl<B: CollectionBackend + ?Sized> CollectionBackend for Box<B> {
    fn unit_name(&self) -> &str {
        (**self).unit_name()
    }

    fn read(&self) -> Result<Option<Vec<u8>>, BackendError> {
        (**self).read()
    }

    fn write(&self, bytes: &[u8]) -> Result<(), BackendError> {
        (**self).write(bytes)
    }
}

/// In-memory [`CollectionBackend`].
///
/// Reads and writes can be made to fail on demand so callers can exercise
/// storage error paths.
#[derive(Debug)]
pub struct MemoryBackend {
    unit: String,
    bytes: Mutex<Option<Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::named(DEFAULT_UNIT_NAME)
    }
}

impl MemoryBackend {
    /// Create an empty backend storing a unit called `unit`.
    pub fn named(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            bytes: Mutex::new(None),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Create a backend whose unit already holds `bytes`.
    #[must_use]
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let backend = Self::default();
        backend.replace(Some(bytes.into()));
        backend
    }

    /// Make subsequent reads fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current unit contents, bypassing failure injection.
    #[must_use]
    pub fn contents(&self) -> Option<Vec<u8>> {
        match self.bytes.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn replace(&self, bytes: Option<Vec<u8>>) {
        match self.bytes.lock() {
            Ok(mut guard) => *guard = bytes,
            Err(poisoned) => *poisoned.into_inner() = bytes,
        }
    }
}

impl CollectionBackend for MemoryBackend {
    fn unit_name(&self) -> &str {
        &self.unit
    }

    fn read(&self) -> Result<Option<Vec<u8>>, BackendError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Box::new(io::Error::other("injected read failure")));
        }
        Ok(self.contents())
    }

    fn write(&self, bytes: &[u8]) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Box::new(io::Error::other("injected write failure")));
        }
        self.replace(Some(bytes.to_vec()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
