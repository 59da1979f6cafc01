//! Geographic position and reverse-geocoded address of a footprint.
//!
//! Coordinates are WGS84 degrees. [`Coordinates::to_coord`] converts to the
//! `geo` convention of `x = longitude` and `y = latitude`.

use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Span, in degrees, of the map region shown around a single footprint.
pub const DEFAULT_MAP_DELTA: f64 = 0.01;

/// Position reported by the device.
///
/// Latitude and longitude are always within range: they are only set through
/// [`Coordinates::new`], and deserialising goes through the same check. The
/// remaining fields are kept when the device reports them.
///
/// # Examples
///
/// ```
/// use footprint_core::Coordinates;
///
/// # fn main() -> Result<(), footprint_core::ValidationError> {
/// let coords = Coordinates::new(37.421, -122.084)?;
/// assert_eq!(coords.to_coord().x, -122.084);
/// assert!(Coordinates::new(91.0, 0.0).is_err());
/// assert!(Coordinates::new(f64::NAN, 0.0).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawCoordinates")]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
    /// Metres above the WGS84 ellipsoid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Horizontal accuracy radius in metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Vertical accuracy in metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_accuracy: Option<f64>,
    /// Heading in degrees clockwise from true north.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    /// Ground speed in metres per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

/// Unchecked wire form of [`Coordinates`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCoordinates {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    altitude: Option<f64>,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default)]
    altitude_accuracy: Option<f64>,
    #[serde(default)]
    heading: Option<f64>,
    #[serde(default)]
    speed: Option<f64>,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = ValidationError;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Ok(Self {
            altitude: raw.altitude,
            accuracy: raw.accuracy,
            altitude_accuracy: raw.altitude_accuracy,
            heading: raw.heading,
            speed: raw.speed,
            ..Self::new(raw.latitude, raw.longitude)?
        })
    }
}

impl Coordinates {
    /// Validates and constructs [`Coordinates`] without device extras.
    ///
    /// NaN and values outside `[-90, 90]` and `[-180, 180]` are rejected.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
            altitude_accuracy: None,
            heading: None,
            speed: None,
        })
    }

    /// Degrees north of the equator.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Degrees east of the prime meridian.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Attach the horizontal accuracy reported alongside the fix.
    #[must_use]
    pub const fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// Position as a `geo` coordinate (`x = longitude`, `y = latitude`).
    #[must_use]
    pub const fn to_coord(&self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }

    /// Square region of `delta` degrees per side centred on this position.
    ///
    /// Map views use this as their initial viewport.
    #[must_use]
    pub fn map_region(&self, delta: f64) -> Rect<f64> {
        let half = delta.abs() / 2.0;
        let centre = self.to_coord();
        Rect::new(
            Coord {
                x: centre.x - half,
                y: centre.y - half,
            },
            Coord {
                x: centre.x + half,
                y: centre.y + half,
            },
        )
    }
}

/// Structured address returned by reverse geocoding.
///
/// Every field is optional; providers fill in what they know.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Street name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    /// House or building number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_number: Option<String>,
    /// District or neighbourhood.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    /// City or town.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// County or similar administrative subdivision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subregion: Option<String>,
    /// State, province or region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Country name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_country_code: Option<String>,
    /// Place name, when the position matches a named feature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Single-line address as formatted by the geocoder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    /// IANA timezone identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl Address {
    /// Short "street city" label, or `None` when neither is known.
    ///
    /// # Examples
    ///
    /// ```
    /// use footprint_core::Address;
    ///
    /// let address = Address {
    ///     street: Some("Amphitheatre Pkwy".into()),
    ///     city: Some("Mountain View".into()),
    ///     ..Address::default()
    /// };
    /// assert_eq!(address.summary().as_deref(), Some("Amphitheatre Pkwy Mountain View"));
    /// assert_eq!(Address::default().summary(), None);
    /// ```
    #[must_use]
    pub fn summary(&self) -> Option<String> {
        let parts: Vec<&str> = [self.street.as_deref(), self.city.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Result of a successful location fetch: where the device is, and what is
/// there if the geocoder knew.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Device position.
    pub coords: Coordinates,
    /// Reverse-geocoded address, if any.
    pub address: Option<Address>,
}
