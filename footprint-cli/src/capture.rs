//! `add` command: run a capture with devices answered from flags.

use std::sync::Arc;

use async_trait::async_trait;
use footprint_core::{
    Address, CameraProvider, CaptureWorkflow, Collection, Coordinates, DeviceError, LocationFix,
    LocationProvider, Permission, PhotoRef, WorkflowConfig,
};

use crate::CliError;
use crate::config::{Store, StoreConfig};

/// Arguments for the `add` subcommand.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AddArgs {
    /// Latitude in decimal degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) lat: f64,
    /// Longitude in decimal degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) lon: f64,
    /// URI of the photo to attach.
    #[arg(long, value_name = "uri")]
    pub(crate) photo: String,
    /// Name of the footprint. Falls back to the address, then "Footprint".
    #[arg(long, default_value = "")]
    pub(crate) theme: String,
    /// Street used as the reverse-geocoded address.
    #[arg(long)]
    pub(crate) street: Option<String>,
    /// City used as the reverse-geocoded address.
    #[arg(long)]
    pub(crate) city: Option<String>,
}

/// Position source that reports one fix.
#[derive(Debug)]
struct FixedLocation(LocationFix);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn current_coordinates(&self) -> Result<Coordinates, DeviceError> {
        Ok(self.0.coords)
    }

    async fn reverse_geocode(&self, _coords: &Coordinates) -> Result<Option<Address>, DeviceError> {
        Ok(self.0.address.clone())
    }
}

/// Camera that returns one photo.
#[derive(Debug)]
struct FixedCamera(PhotoRef);

#[async_trait]
impl CameraProvider for FixedCamera {
    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn capture_photo(&self) -> Result<Option<PhotoRef>, DeviceError> {
        Ok(Some(self.0.clone()))
    }
}

/// Stage both fetches concurrently and commit the footprint.
pub(crate) async fn add(
    store: Store,
    config: &StoreConfig,
    args: AddArgs,
) -> Result<Collection, CliError> {
    let coords = Coordinates::new(args.lat, args.lon)?;
    let address = (args.street.is_some() || args.city.is_some()).then(|| Address {
        street: args.street,
        city: args.city,
        ..Address::default()
    });
    let workflow = CaptureWorkflow::new(
        FixedLocation(LocationFix { coords, address }),
        FixedCamera(PhotoRef::new(args.photo)),
        Arc::new(store),
    )
    .with_config(WorkflowConfig::default().with_timeout(config.fetch_timeout));

    workflow.ensure_permissions().await?;
    workflow.begin_capture()?;
    let (location, photo) = tokio::join!(workflow.request_location(), workflow.request_photo());
    location?;
    photo?;
    Ok(workflow.commit(&args.theme)?)
}
