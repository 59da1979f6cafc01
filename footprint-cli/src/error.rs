//! Error types emitted by the footprint CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use footprint_core::{CaptureError, StorageError, UpdateError, ValidationError};
use thiserror::Error;

/// Errors emitted by the footprint CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// The requested operation requires a missing compile-time feature.
    #[error("{action} requires the `{feature}` feature to be enabled")]
    MissingFeature {
        feature: &'static str,
        action: &'static str,
    },
    /// The configured unit name was blank.
    #[error("unit name must not be empty (set --{field} or {env})")]
    EmptyUnitName {
        field: &'static str,
        env: &'static str,
    },
    /// Opening the SQLite database failed.
    #[cfg(feature = "store-sqlite")]
    #[error(transparent)]
    OpenSqlite(#[from] footprint_core::SqliteBackendError),
    /// Building the async runtime for device calls failed.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Flag values did not form a valid footprint.
    #[error("invalid footprint: {0}")]
    Invalid(#[from] ValidationError),
    /// Reading or writing the collection failed.
    #[error("store {path:?}: {source}")]
    Storage {
        path: Utf8PathBuf,
        #[source]
        source: StorageError,
    },
    /// Updating a footprint failed.
    #[error(transparent)]
    Update(#[from] UpdateError),
    /// The capture workflow rejected the footprint.
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
    /// Serializing the collection failed.
    #[error("failed to serialize footprints: {0}")]
    SerializeCollection(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
