//! Deterministic device doubles and fixtures used by unit and behaviour
//! tests.
//!
//! Both stubs can be gated on a [`Notify`] so a test decides when an
//! in-flight fetch resolves, which is how late arrivals are simulated.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;

use crate::{
    Address, CameraProvider, Coordinates, Device, DeviceError, LocationFix, LocationProvider,
    NewRecord, Permission, PhotoRef,
};

/// Stub `LocationProvider` returning a pre-configured fix.
#[derive(Debug)]
pub struct StubLocationProvider {
    permission: Permission,
    response: Result<LocationFix, DeviceError>,
    geocode_error: Option<DeviceError>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl StubLocationProvider {
    /// Provider reporting `fix`.
    #[must_use]
    pub fn with_fix(fix: LocationFix) -> Self {
        Self {
            permission: Permission::Granted,
            response: Ok(fix),
            geocode_error: None,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Provider reporting the given position with no address.
    ///
    /// # Panics
    ///
    /// Panics when the coordinates are out of range.
    #[must_use]
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self::with_fix(fix_at(latitude, longitude))
    }

    /// Provider whose position fetch fails with `error`.
    #[must_use]
    pub fn failing(error: DeviceError) -> Self {
        Self {
            response: Err(error),
            ..Self::at(0.0, 0.0)
        }
    }

    /// Provider whose driver reports the raw reading `latitude`, `longitude`.
    ///
    /// A reading that does not form valid [`Coordinates`] surfaces the way a
    /// driver must report it: as an unavailable fix.
    #[must_use]
    pub fn reporting(latitude: f64, longitude: f64) -> Self {
        Coordinates::new(latitude, longitude).map_or_else(
            |err| Self::failing(DeviceError::unavailable(Device::Location, err.to_string())),
            |coords| {
                Self::with_fix(LocationFix {
                    coords,
                    address: None,
                })
            },
        )
    }

    /// Provider that no fix can be obtained from.
    #[must_use]
    pub fn without_fix() -> Self {
        Self::failing(DeviceError::unavailable(Device::Location, "no fix"))
    }

    /// Provider whose permission prompt is refused.
    #[must_use]
    pub fn denied() -> Self {
        Self {
            permission: Permission::Denied,
            ..Self::at(0.0, 0.0)
        }
    }

    /// Make reverse geocoding fail with `error`.
    #[must_use]
    pub fn with_geocode_error(mut self, error: DeviceError) -> Self {
        self.geocode_error = Some(error);
        self
    }

    /// Hold each position fetch until `gate` is notified.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of position fetches started.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for StubLocationProvider {
    async fn request_permission(&self) -> Permission {
        self.permission
    }

    async fn current_coordinates(&self) -> Result<Coordinates, DeviceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.response
            .as_ref()
            .map(|fix| fix.coords)
            .map_err(|error| error.clone())
    }

    async fn reverse_geocode(&self, _coords: &Coordinates) -> Result<Option<Address>, DeviceError> {
        if let Some(error) = &self.geocode_error {
            return Err(error.clone());
        }
        Ok(self
            .response
            .as_ref()
            .ok()
            .and_then(|fix| fix.address.clone()))
    }
}

/// Stub `CameraProvider` returning a pre-configured photo.
#[derive(Debug)]
pub struct StubCameraProvider {
    permission: Permission,
    response: Result<Option<PhotoRef>, DeviceError>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl StubCameraProvider {
    /// Camera that always returns `uri`.
    #[must_use]
    pub fn with_photo(uri: &str) -> Self {
        Self {
            permission: Permission::Granted,
            response: Ok(Some(PhotoRef::new(uri))),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Camera the user always dismisses.
    #[must_use]
    pub fn canceled() -> Self {
        Self {
            response: Ok(None),
            ..Self::with_photo("")
        }
    }

    /// Camera whose capture fails with `error`.
    #[must_use]
    pub fn failing(error: DeviceError) -> Self {
        Self {
            response: Err(error),
            ..Self::with_photo("")
        }
    }

    /// Camera whose permission prompt is refused.
    #[must_use]
    pub fn denied() -> Self {
        Self {
            permission: Permission::Denied,
            ..Self::with_photo("")
        }
    }

    /// Hold each capture until `gate` is notified.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of captures started.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraProvider for StubCameraProvider {
    async fn request_permission(&self) -> Permission {
        self.permission
    }

    async fn capture_photo(&self) -> Result<Option<PhotoRef>, DeviceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.response.clone()
    }
}

/// Location fix at the given position with no address.
///
/// # Panics
///
/// Panics when the coordinates are out of range.
#[must_use]
pub fn fix_at(latitude: f64, longitude: f64) -> LocationFix {
    LocationFix {
        coords: Coordinates::new(latitude, longitude).expect("fixture coordinates are valid"),
        address: None,
    }
}

/// Candidate record named `name` at the given position.
///
/// # Panics
///
/// Panics when the name is blank or the coordinates are out of range.
#[must_use]
pub fn candidate(name: &str, latitude: f64, longitude: f64) -> NewRecord {
    let photo = PhotoRef::new(format!("file:///photos/{name}.jpg"));
    NewRecord::new(name, fix_at(latitude, longitude), photo).expect("fixture name is not blank")
}

/// Clock that always reports `millis` after the Unix epoch.
///
/// # Panics
///
/// Panics when `millis` is outside chrono's representable range.
#[must_use]
pub fn frozen_clock(millis: i64) -> impl Fn() -> DateTime<Utc> + Send + Sync + 'static {
    let instant = Utc
        .timestamp_millis_opt(millis)
        .single()
        .expect("fixture timestamp is representable");
    move || instant
}
