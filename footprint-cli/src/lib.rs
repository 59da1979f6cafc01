//! Command-line interface for the footprint journal.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};
use footprint_core::{Collection, PhotoRef, RecordId, StorageError};
use log::info;

mod capture;
mod config;
mod error;

use capture::AddArgs;
use config::{StoreArgs, StoreConfig};
pub use error::CliError;

/// Run the footprint CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let config = cli.store.into_config()?;
    let mut stdout = std::io::stdout().lock();
    run_with(cli.command, &config, &mut stdout)
}

#[derive(Debug, Parser)]
#[command(
    name = "footprint",
    about = "Keep a journal of geotagged photos",
    version
)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print stored footprints, newest first.
    List,
    /// Capture a new footprint from the given position and photo.
    Add(AddArgs),
    /// Remove a footprint. Unknown identifiers are ignored.
    Delete {
        /// Identifier of the footprint.
        id: RecordId,
    },
    /// Give a footprint a new name.
    Rename {
        /// Identifier of the footprint.
        id: RecordId,
        /// New name.
        theme: String,
    },
    /// Replace the photo of a footprint.
    SetPhoto {
        /// Identifier of the footprint.
        id: RecordId,
        /// URI of the new photo.
        photo: String,
    },
}

/// Execute `command` against the configured store and print the resulting
/// collection as pretty JSON.
fn run_with(
    command: Command,
    config: &StoreConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let records = execute(command, config)?;
    write_collection(writer, &records)
}

fn execute(command: Command, config: &StoreConfig) -> Result<Collection, CliError> {
    let store = config.open()?;
    let storage = |source: StorageError| CliError::Storage {
        path: config.path.clone(),
        source,
    };
    match command {
        Command::List => store.load().map_err(storage),
        Command::Add(args) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .map_err(CliError::Runtime)?;
            let records = runtime.block_on(capture::add(store, config, args))?;
            if let Some(record) = records.first() {
                info!("added footprint {}", record.id());
            }
            Ok(records)
        }
        Command::Delete { id } => store.delete(id).map_err(storage),
        Command::Rename { id, theme } => Ok(store.rename(id, &theme)?),
        Command::SetPhoto { id, photo } => store
            .replace_photo(id, PhotoRef::new(photo))
            .map_err(storage),
    }
}

fn write_collection(writer: &mut dyn Write, records: &Collection) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(records).map_err(CliError::SerializeCollection)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
