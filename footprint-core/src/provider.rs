//! Contracts for the device services a capture depends on.
//!
//! Location and camera drivers live outside this crate. They are reached
//! through [`LocationProvider`] and [`CameraProvider`], whose calls may take
//! arbitrarily long (a camera waits on the user) and may resolve in any order.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::{Address, Coordinates, PhotoRef};

/// Answer to a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The user allowed access.
    Granted,
    /// The user refused access.
    Denied,
}

impl Permission {
    /// Whether access was allowed.
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Device service a failure relates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    /// Positioning and reverse geocoding.
    Location,
    /// Photo capture.
    Camera,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Location => "location",
            Self::Camera => "camera",
        })
    }
}

/// Failure reported by a device provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The device could not produce a result, e.g. no position fix or no
    /// camera hardware.
    #[error("{device} unavailable: {message}")]
    Unavailable {
        /// Device that failed.
        device: Device,
        /// Driver-supplied description.
        message: String,
    },
}

impl DeviceError {
    /// Build an [`DeviceError::Unavailable`] for `device`.
    pub fn unavailable(device: Device, message: impl Into<String>) -> Self {
        Self::Unavailable {
            device,
            message: message.into(),
        }
    }
}

/// Source of the device position.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use footprint_core::{
///     Address, Coordinates, DeviceError, LocationProvider, Permission,
/// };
///
/// struct FixedPosition(Coordinates);
///
/// #[async_trait]
/// impl LocationProvider for FixedPosition {
///     async fn request_permission(&self) -> Permission {
///         Permission::Granted
///     }
///
///     async fn current_coordinates(&self) -> Result<Coordinates, DeviceError> {
///         Ok(self.0)
///     }
///
///     async fn reverse_geocode(
///         &self,
///         _coords: &Coordinates,
///     ) -> Result<Option<Address>, DeviceError> {
///         Ok(None)
///     }
/// }
/// ```
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Ask the user for foreground location access.
    async fn request_permission(&self) -> Permission;

    /// Current position.
    ///
    /// Returns [`DeviceError::Unavailable`] when no fix can be obtained.
    async fn current_coordinates(&self) -> Result<Coordinates, DeviceError>;

    /// Best-effort address lookup for `coords`.
    ///
    /// `Ok(None)` means the geocoder had no answer, which is not an error.
    async fn reverse_geocode(&self, coords: &Coordinates) -> Result<Option<Address>, DeviceError>;
}

/// Source of photos.
#[async_trait]
pub trait CameraProvider: Send + Sync {
    /// Ask the user for camera access.
    async fn request_permission(&self) -> Permission;

    /// Take a photo.
    ///
    /// `Ok(None)` means the user dismissed the camera, which is not an error.
    async fn capture_photo(&self) -> Result<Option<PhotoRef>, DeviceError>;
}

#[async_trait]
impl<P: LocationProvider + ?Sized> LocationProvider for std::sync::Arc<P> {
    async fn request_permission(&self) -> Permission {
        (**self).request_permission().await
    }

    async fn current_coordinates(&self) -> Result<Coordinates, DeviceError> {
        (**self).current_coordinates().await
    }

    async fn reverse_geocode(&self, coords: &Coordinates) -> Result<Option<Address>, DeviceError> {
        (**self).reverse_geocode(coords).await
    }
}

#[async_trait]
impl<C: CameraProvider + ?Sized> CameraProvider for std::sync::Arc<C> {
    async fn request_permission(&self) -> Permission {
        (**self).request_permission().await
    }

    async fn capture_photo(&self) -> Result<Option<PhotoRef>, DeviceError> {
        (**self).capture_photo().await
    }
}
