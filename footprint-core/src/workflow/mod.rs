//! Two-phase capture of a new footprint.
//!
//! A capture stages a candidate from two independent device fetches, the
//! position and the photo, and commits it to the [`RecordStore`] once both
//! have arrived:
//!
//! ```text
//! Idle --begin_capture--> Staging --(location and photo set)--> Ready
//! Ready --commit--> Committing --ok--> Idle
//!                              \--storage error--> Ready
//! any state but Committing --cancel--> Idle
//! ```
//!
//! Fetches run without holding the workflow lock, so they may overlap and
//! resolve in either order. Each fetch remembers the session it was started
//! for and its result is dropped if that session has since been cancelled,
//! committed or replaced.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, warn};

use crate::{
    CameraProvider, Collection, CollectionBackend, Device, LocationFix, LocationProvider,
    NewRecord, Permission, PhotoRef, RecordId, RecordStore,
};

mod error;

pub use error::CaptureError;

/// Bound applied to each provider call unless configured otherwise.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Name given to a record committed with a blank theme and no address.
pub const FALLBACK_NAME: &str = "Footprint";

/// Tunables for [`CaptureWorkflow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Upper bound on each provider call.
    pub fetch_timeout: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl WorkflowConfig {
    /// Set the provider call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

/// Phase of the capture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// No capture in progress.
    Idle,
    /// Waiting for the location, the photo, or both.
    Staging,
    /// Location and photo are staged; the capture can be committed.
    Ready,
    /// The record is being written to the store.
    Committing,
}

/// Identity of one capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Values staged so far in the current session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    /// Position and address, once fetched.
    pub location: Option<LocationFix>,
    /// Photo, once taken.
    pub photo: Option<PhotoRef>,
}

impl Candidate {
    /// Whether both location and photo are staged.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.location.is_some() && self.photo.is_some()
    }
}

/// What happened to a fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The result was staged in the current session.
    Applied,
    /// The user dismissed the camera; nothing was staged.
    Canceled,
    /// The session the fetch belonged to is gone; the result was dropped.
    Discarded,
}

/// Result of [`CaptureWorkflow::retake_photo`].
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoUpdate {
    /// The photo was replaced; holds the refreshed collection.
    Updated(Collection),
    /// The user dismissed the camera; nothing changed.
    Canceled,
}

#[derive(Debug)]
struct Session {
    id: SessionId,
    candidate: Candidate,
}

#[derive(Debug)]
struct Machine {
    state: CaptureState,
    session: Option<Session>,
    next_session: u64,
}

/// Coordinates device fetches into committed [`crate::LocationRecord`]s.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use footprint_core::{CaptureState, CaptureWorkflow, MemoryBackend, RecordStore};
/// use footprint_core::test_support::{StubCameraProvider, StubLocationProvider};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), footprint_core::CaptureError> {
/// let store = Arc::new(RecordStore::new(MemoryBackend::default()));
/// let workflow = CaptureWorkflow::new(
///     StubLocationProvider::at(37.421, -122.084),
///     StubCameraProvider::with_photo("file:///park.jpg"),
///     Arc::clone(&store),
/// );
///
/// workflow.begin_capture()?;
/// workflow.request_photo().await?;
/// workflow.request_location().await?;
/// assert_eq!(workflow.state(), CaptureState::Ready);
///
/// let records = workflow.commit("Park")?;
/// assert_eq!(records[0].name(), "Park");
/// assert_eq!(workflow.state(), CaptureState::Idle);
/// # Ok(())
/// # }
/// ```
pub struct CaptureWorkflow<L, C, B> {
    location: L,
    camera: C,
    store: Arc<RecordStore<B>>,
    config: WorkflowConfig,
    machine: Mutex<Machine>,
}

impl<L, C, B> fmt::Debug for CaptureWorkflow<L, C, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureWorkflow")
            .field("config", &self.config)
            .field("machine", &self.machine)
            .finish_non_exhaustive()
    }
}

impl<L, C, B> CaptureWorkflow<L, C, B>
where
    L: LocationProvider,
    C: CameraProvider,
    B: CollectionBackend,
{
    /// Create an idle workflow committing into `store`.
    pub fn new(location: L, camera: C, store: Arc<RecordStore<B>>) -> Self {
        Self {
            location,
            camera,
            store,
            config: WorkflowConfig::default(),
            machine: Mutex::new(Machine {
                state: CaptureState::Idle,
                session: None,
                next_session: 1,
            }),
        }
    }

    /// Replace the default configuration.
    #[must_use]
    pub const fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Store that commits are written to.
    pub fn store(&self) -> &RecordStore<B> {
        &self.store
    }

    /// Current phase.
    pub fn state(&self) -> CaptureState {
        self.lock().state
    }

    /// Identity of the active session, if any.
    pub fn session(&self) -> Option<SessionId> {
        self.lock().session.as_ref().map(|session| session.id)
    }

    /// Snapshot of the values staged in the active session.
    pub fn candidate(&self) -> Option<Candidate> {
        self.lock()
            .session
            .as_ref()
            .map(|session| session.candidate.clone())
    }

    /// Ask for location and camera access together.
    ///
    /// Fails with [`CaptureError::PermissionDenied`] naming the location
    /// first when both are refused.
    pub async fn ensure_permissions(&self) -> Result<(), CaptureError> {
        let (location, camera) = tokio::join!(
            self.location.request_permission(),
            self.camera.request_permission()
        );
        check_permission(Device::Location, location)?;
        check_permission(Device::Camera, camera)
    }

    /// Open a new session, discarding anything staged before.
    pub fn begin_capture(&self) -> Result<SessionId, CaptureError> {
        let mut machine = self.lock();
        if machine.state == CaptureState::Committing {
            return Err(CaptureError::InvalidState {
                operation: "begin a capture",
                state: machine.state,
            });
        }
        let id = SessionId(machine.next_session);
        machine.next_session = machine.next_session.saturating_add(1);
        machine.session = Some(Session {
            id,
            candidate: Candidate::default(),
        });
        machine.state = CaptureState::Staging;
        debug!("capture session {id} started");
        Ok(id)
    }

    /// Fetch the device position and stage it.
    ///
    /// A failed reverse geocode keeps the coordinates without an address. A
    /// failed position fetch leaves the candidate and state untouched.
    pub async fn request_location(&self) -> Result<FetchOutcome, CaptureError> {
        let session = self.active_session("request a location")?;
        let fix = self.fetch_location().await?;
        Ok(self.settle(session, Device::Location, |candidate| {
            candidate.location = Some(fix);
        }))
    }

    /// Take a photo and stage it. A dismissed camera stages nothing.
    pub async fn request_photo(&self) -> Result<FetchOutcome, CaptureError> {
        let session = self.active_session("request a photo")?;
        let Some(photo) = self.fetch_photo().await? else {
            debug!("photo capture dismissed for session {session}");
            return Ok(FetchOutcome::Canceled);
        };
        Ok(self.settle(session, Device::Camera, |candidate| {
            candidate.photo = Some(photo);
        }))
    }

    /// Write the staged capture as a new record named `theme`.
    ///
    /// A blank theme falls back to the address summary, then to
    /// [`FALLBACK_NAME`]. On a storage failure the workflow returns to
    /// [`CaptureState::Ready`] with the candidate intact so the commit can be
    /// retried.
    pub fn commit(&self, theme: &str) -> Result<Collection, CaptureError> {
        let (session, candidate) = {
            let mut guard = self.lock();
            let machine = &mut *guard;
            match (machine.state, machine.session.as_ref()) {
                (CaptureState::Ready, Some(session)) => {
                    machine.state = CaptureState::Committing;
                    (session.id, session.candidate.clone())
                }
                (state, _) => return Err(CaptureError::NotReady { state }),
            }
        };

        let record = match finished_record(theme, candidate) {
            Ok(record) => record,
            Err(err) => {
                self.lock().state = CaptureState::Ready;
                return Err(err);
            }
        };
        let name = record.name().to_owned();

        let result = self.store.create(record);
        let mut machine = self.lock();
        match result {
            Ok(records) => {
                machine.state = CaptureState::Idle;
                machine.session = None;
                debug!("capture session {session} committed as {name:?}");
                Ok(records)
            }
            Err(err) => {
                machine.state = CaptureState::Ready;
                warn!("commit of capture session {session} failed: {err}");
                Err(err.into())
            }
        }
    }

    /// Abandon the active session without touching the store.
    pub fn cancel(&self) -> Result<(), CaptureError> {
        let mut machine = self.lock();
        if machine.state == CaptureState::Committing {
            return Err(CaptureError::InvalidState {
                operation: "cancel",
                state: machine.state,
            });
        }
        if let Some(session) = machine.session.take() {
            debug!("capture session {} cancelled", session.id);
        }
        machine.state = CaptureState::Idle;
        Ok(())
    }

    /// Take a new photo for the existing record `id`.
    ///
    /// Independent of any capture session. Unknown identifiers are ignored by
    /// the store.
    pub async fn retake_photo(&self, id: RecordId) -> Result<PhotoUpdate, CaptureError> {
        let Some(photo) = self.fetch_photo().await? else {
            return Ok(PhotoUpdate::Canceled);
        };
        let records = self.store.replace_photo(id, photo)?;
        Ok(PhotoUpdate::Updated(records))
    }

    fn lock(&self) -> MutexGuard<'_, Machine> {
        // The machine is only mutated by plain assignments, so a poisoned
        // guard still holds a consistent value.
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active_session(&self, operation: &'static str) -> Result<SessionId, CaptureError> {
        let machine = self.lock();
        match (machine.state, machine.session.as_ref()) {
            (CaptureState::Staging | CaptureState::Ready, Some(session)) => Ok(session.id),
            (state, _) => Err(CaptureError::InvalidState { operation, state }),
        }
    }

    /// Stage a fetch result if `session` is still the active, staging session.
    fn settle(
        &self,
        session: SessionId,
        device: Device,
        stage: impl FnOnce(&mut Candidate),
    ) -> FetchOutcome {
        let mut guard = self.lock();
        let machine = &mut *guard;
        let staging = matches!(machine.state, CaptureState::Staging | CaptureState::Ready);
        match machine.session.as_mut() {
            Some(active) if staging && active.id == session => {
                stage(&mut active.candidate);
                if active.candidate.is_complete() && machine.state == CaptureState::Staging {
                    machine.state = CaptureState::Ready;
                    debug!("capture session {session} ready");
                }
                FetchOutcome::Applied
            }
            _ => {
                warn!("dropping late {device} result for capture session {session}");
                FetchOutcome::Discarded
            }
        }
    }

    async fn fetch_location(&self) -> Result<LocationFix, CaptureError> {
        check_permission(Device::Location, self.location.request_permission().await)?;
        let coords = self
            .bounded(Device::Location, self.location.current_coordinates())
            .await??;
        let address = match self
            .bounded(Device::Location, self.location.reverse_geocode(&coords))
            .await
        {
            Ok(Ok(address)) => address,
            Ok(Err(err)) => {
                warn!("reverse geocoding failed, keeping coordinates only: {err}");
                None
            }
            Err(err) => {
                warn!("reverse geocoding failed, keeping coordinates only: {err}");
                None
            }
        };
        Ok(LocationFix { coords, address })
    }

    async fn fetch_photo(&self) -> Result<Option<PhotoRef>, CaptureError> {
        check_permission(Device::Camera, self.camera.request_permission().await)?;
        Ok(self
            .bounded(Device::Camera, self.camera.capture_photo())
            .await??)
    }

    async fn bounded<T>(
        &self,
        device: Device,
        call: impl Future<Output = T>,
    ) -> Result<T, CaptureError> {
        let after = self.config.fetch_timeout;
        tokio::time::timeout(after, call)
            .await
            .map_err(|_| CaptureError::Timeout { device, after })
    }
}

fn check_permission(device: Device, permission: Permission) -> Result<(), CaptureError> {
    if permission.is_granted() {
        Ok(())
    } else {
        Err(CaptureError::PermissionDenied { device })
    }
}

fn finished_record(theme: &str, candidate: Candidate) -> Result<NewRecord, CaptureError> {
    let (Some(fix), Some(photo)) = (candidate.location, candidate.photo) else {
        return Err(CaptureError::NotReady {
            state: CaptureState::Staging,
        });
    };
    let name = if theme.trim().is_empty() {
        fix.address
            .as_ref()
            .and_then(crate::Address::summary)
            .unwrap_or_else(|| FALLBACK_NAME.to_owned())
    } else {
        theme.to_owned()
    };
    Ok(NewRecord::new(&name, fix, photo)?)
}

#[cfg(test)]
mod tests;
