//! Store selection layered from flags, environment and configuration files.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, ValueEnum};
use footprint_core::{
    CollectionBackend, DEFAULT_FETCH_TIMEOUT, DEFAULT_UNIT_NAME, FileBackend, RecordStore,
};
use log::debug;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::CliError;

pub(crate) const ARG_STORE: &str = "store";
pub(crate) const ARG_BACKEND: &str = "backend";
pub(crate) const ARG_UNIT: &str = "unit";
pub(crate) const ARG_TIMEOUT: &str = "timeout-secs";
pub(crate) const ENV_UNIT: &str = "FOOTPRINT_CMDS_STORE_UNIT";

const SQLITE_FILE: &str = "footprint.db";

/// Store opened by every command.
pub(crate) type Store = RecordStore<Box<dyn CollectionBackend>>;

/// Storage medium holding the collection unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum BackendKind {
    /// A JSON file replaced atomically on every write.
    #[default]
    Json,
    /// One row of a SQLite key/value table.
    Sqlite,
}

// Options selecting where footprints are kept, flattened into `Cli`.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "store")]
#[ortho_config(prefix = "FOOTPRINT")]
pub(crate) struct StoreArgs {
    /// Path to the store file. Defaults to `<unit>.json` or `footprint.db`.
    #[arg(long = ARG_STORE, value_name = "path")]
    #[serde(default)]
    pub(crate) store: Option<Utf8PathBuf>,
    /// Storage medium.
    #[arg(long = ARG_BACKEND, value_enum)]
    #[serde(default)]
    pub(crate) backend: Option<BackendKind>,
    /// Name of the stored unit.
    #[arg(long = ARG_UNIT, value_name = "name")]
    #[serde(default)]
    pub(crate) unit: Option<String>,
    /// Upper bound on each device call, in seconds.
    #[arg(long = ARG_TIMEOUT, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl StoreArgs {
    pub(crate) fn into_config(self) -> Result<StoreConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        StoreConfig::try_from(merged)
    }
}

/// Resolved store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoreConfig {
    pub(crate) path: Utf8PathBuf,
    pub(crate) backend: BackendKind,
    pub(crate) unit: String,
    pub(crate) fetch_timeout: Duration,
}

impl StoreConfig {
    pub(crate) fn open(&self) -> Result<Store, CliError> {
        debug!("opening {:?} store at {}", self.backend, self.path);
        let backend: Box<dyn CollectionBackend> = match self.backend {
            BackendKind::Json => Box::new(FileBackend::new(self.path.clone())),
            BackendKind::Sqlite => open_sqlite(&self.path, &self.unit)?,
        };
        Ok(RecordStore::new(backend))
    }
}

impl TryFrom<StoreArgs> for StoreConfig {
    type Error = CliError;

    fn try_from(args: StoreArgs) -> Result<Self, Self::Error> {
        let unit = args
            .unit
            .map_or_else(|| DEFAULT_UNIT_NAME.to_owned(), |unit| unit.trim().to_owned());
        if unit.is_empty() {
            return Err(CliError::EmptyUnitName {
                field: ARG_UNIT,
                env: ENV_UNIT,
            });
        }
        let backend = args.backend.unwrap_or_default();
        let path = args.store.unwrap_or_else(|| match backend {
            BackendKind::Json => Utf8PathBuf::from(format!("{unit}.json")),
            BackendKind::Sqlite => Utf8PathBuf::from(SQLITE_FILE),
        });
        let fetch_timeout = args
            .timeout_secs
            .map_or(DEFAULT_FETCH_TIMEOUT, Duration::from_secs);
        Ok(Self {
            path,
            backend,
            unit,
            fetch_timeout,
        })
    }
}

#[cfg(feature = "store-sqlite")]
fn open_sqlite(path: &Utf8Path, unit: &str) -> Result<Box<dyn CollectionBackend>, CliError> {
    let backend = footprint_core::SqliteBackend::open_unit(path.as_std_path(), unit)?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "store-sqlite"))]
fn open_sqlite(_path: &Utf8Path, _unit: &str) -> Result<Box<dyn CollectionBackend>, CliError> {
    Err(CliError::MissingFeature {
        feature: "store-sqlite",
        action: "opening a SQLite store",
    })
}
