use std::time::Duration;

use thiserror::Error;

use super::CaptureState;
use crate::{Device, DeviceError, StorageError, ValidationError};

/// Errors surfaced by [`crate::CaptureWorkflow`].
///
/// None of these corrupt the workflow: the state and candidate are left as
/// they were (or restored) and the caller may retry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaptureError {
    /// The user refused access to a device.
    #[error("{device} permission was denied")]
    PermissionDenied {
        /// Device whose permission was refused.
        device: Device,
    },
    /// The device could not produce a result.
    #[error("{device} unavailable: {message}")]
    DeviceUnavailable {
        /// Device that failed.
        device: Device,
        /// Driver-supplied description.
        message: String,
    },
    /// The device did not answer in time.
    #[error("{device} did not respond within {after:?}")]
    Timeout {
        /// Device that timed out.
        device: Device,
        /// Configured bound.
        after: Duration,
    },
    /// The operation is not valid in the current state.
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        /// Rejected operation.
        operation: &'static str,
        /// State at the time of the call.
        state: CaptureState,
    },
    /// Commit was attempted before both location and photo were staged.
    #[error("capture is not ready to commit (state {state:?})")]
    NotReady {
        /// State at the time of the call.
        state: CaptureState,
    },
    /// A candidate value was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Persisting the record failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<DeviceError> for CaptureError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::Unavailable { device, message } => {
                Self::DeviceUnavailable { device, message }
            }
        }
    }
}
