//! Persisted footprint records and the candidate values they are built from.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Address, Coordinates, LocationFix};

/// Errors raised when a value breaks a record invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A record name was empty or whitespace only.
    #[error("record name must not be empty")]
    EmptyName,
    /// Latitude outside `[-90, 90]`.
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    /// Longitude outside `[-180, 180]`.
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

/// Identifier of a persisted record.
///
/// Identifiers are derived from the creation time in milliseconds but are
/// always issued strictly above the previous identifier, so they order records
/// by creation even when several are created within the same millisecond.
/// They persist as decimal strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RecordId(u64);

impl RecordId {
    /// Wrap a raw identifier value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Issue the identifier for a record created at `now`.
    ///
    /// The result is never below the millisecond timestamp of `now` and is
    /// always greater than `floor`. Returns `None` when `floor` is already
    /// the largest representable identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use footprint_core::RecordId;
    ///
    /// let now = Utc.timestamp_millis_opt(1_000).unwrap();
    /// let first = RecordId::issue(now, None).unwrap();
    /// let second = RecordId::issue(now, Some(first)).unwrap();
    /// assert_eq!(first.get(), 1_000);
    /// assert!(second > first);
    /// assert_eq!(RecordId::issue(now, Some(RecordId::new(u64::MAX))), None);
    /// ```
    #[must_use]
    pub fn issue(now: DateTime<Utc>, floor: Option<Self>) -> Option<Self> {
        let stamp = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        floor.map_or(Some(Self(stamp)), |previous| {
            previous.0.checked_add(1).map(|next| Self(stamp.max(next)))
        })
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl TryFrom<String> for RecordId {
    type Error = ParseIntError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.to_string()
    }
}

/// Opaque reference to a stored photo, typically a file URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoRef(String);

impl PhotoRef {
    /// Wrap a photo URI.
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// The underlying URI.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single mutable field of a [`LocationRecord`] and its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordUpdate {
    /// Replace the display name (theme).
    Name(String),
    /// Replace the photo.
    Photo(PhotoRef),
}

impl RecordUpdate {
    /// Check the new value and normalise it (names are trimmed).
    pub fn validated(self) -> Result<Self, ValidationError> {
        match self {
            Self::Name(name) => checked_name(&name).map(Self::Name),
            photo @ Self::Photo(_) => Ok(photo),
        }
    }
}

fn checked_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_owned())
}

/// A geotagged photo committed to the store.
///
/// Only the name and photo can change after creation, and only through
/// [`LocationRecord::with_name`], [`LocationRecord::with_photo`] or
/// [`LocationRecord::apply`], each of which returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    id: RecordId,
    coords: Coordinates,
    #[serde(default)]
    address: Option<Address>,
    name: String,
    photo: PhotoRef,
    #[serde(rename = "timestamp")]
    created_at: DateTime<Utc>,
}

impl LocationRecord {
    /// Unique identifier.
    #[must_use]
    pub const fn id(&self) -> RecordId {
        self.id
    }

    /// Where the photo was taken.
    #[must_use]
    pub const fn coords(&self) -> &Coordinates {
        &self.coords
    }

    /// Reverse-geocoded address captured with the record.
    #[must_use]
    pub const fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    /// Display name (theme).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Photo reference.
    #[must_use]
    pub const fn photo(&self) -> &PhotoRef {
        &self.photo
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Copy of this record with a new name. Blank names are rejected.
    pub fn with_name(self, name: &str) -> Result<Self, ValidationError> {
        let name = checked_name(name)?;
        Ok(Self { name, ..self })
    }

    /// Copy of this record with a new photo.
    #[must_use]
    pub fn with_photo(self, photo: PhotoRef) -> Self {
        Self { photo, ..self }
    }

    /// Apply a single-field update.
    pub fn apply(self, update: RecordUpdate) -> Result<Self, ValidationError> {
        match update {
            RecordUpdate::Name(name) => self.with_name(&name),
            RecordUpdate::Photo(photo) => Ok(self.with_photo(photo)),
        }
    }
}

/// A finished candidate awaiting an identifier and timestamp from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    fix: LocationFix,
    name: String,
    photo: PhotoRef,
}

impl NewRecord {
    /// Validates and constructs a [`NewRecord`]. Blank names are rejected.
    pub fn new(name: &str, fix: LocationFix, photo: PhotoRef) -> Result<Self, ValidationError> {
        Ok(Self {
            fix,
            name: checked_name(name)?,
            photo,
        })
    }

    /// Display name the record will carry.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_record(self, id: RecordId, created_at: DateTime<Utc>) -> LocationRecord {
        LocationRecord {
            id,
            coords: self.fix.coords,
            address: self.fix.address,
            name: self.name,
            photo: self.photo,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn record() -> LocationRecord {
        let fix = LocationFix {
            coords: Coordinates::new(37.421, -122.084).expect("valid coordinates"),
            address: None,
        };
        let created_at = Utc
            .timestamp_millis_opt(1_700_000_000_000)
            .single()
            .expect("valid timestamp");
        NewRecord::new("Park", fix, PhotoRef::new("file:///park.jpg"))
            .expect("valid candidate")
            .into_record(RecordId::new(7), created_at)
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn candidate_rejects_blank_name(#[case] name: &str) {
        let fix = LocationFix {
            coords: Coordinates::new(0.0, 0.0).expect("valid coordinates"),
            address: None,
        };
        let err = NewRecord::new(name, fix, PhotoRef::new("p")).expect_err("blank name");
        assert_eq!(err, ValidationError::EmptyName);
    }

    #[rstest]
    fn with_name_trims_and_keeps_other_fields(record: LocationRecord) {
        let renamed = record.clone().with_name("  Picnic ").expect("valid name");
        assert_eq!(renamed.name(), "Picnic");
        assert_eq!(renamed.photo(), record.photo());
        assert_eq!(renamed.id(), record.id());
        assert_eq!(renamed.created_at(), record.created_at());
    }

    #[rstest]
    fn apply_photo_keeps_name(record: LocationRecord) {
        let updated = record
            .apply(RecordUpdate::Photo(PhotoRef::new("file:///new.jpg")))
            .expect("photo updates always apply");
        assert_eq!(updated.name(), "Park");
        assert_eq!(updated.photo().as_str(), "file:///new.jpg");
    }

    #[rstest]
    fn apply_rejects_empty_name(record: LocationRecord) {
        let err = record
            .apply(RecordUpdate::Name(String::new()))
            .expect_err("empty name");
        assert_eq!(err, ValidationError::EmptyName);
    }

    #[rstest]
    fn issue_never_repeats_within_one_instant() {
        let now = Utc.timestamp_millis_opt(5_000).single().expect("valid timestamp");
        let first = RecordId::issue(now, None).expect("first id");
        let second = RecordId::issue(now, Some(first)).expect("second id");
        let third = RecordId::issue(now, Some(second)).expect("third id");
        assert!(first < second && second < third);
    }

    #[rstest]
    fn issue_refuses_to_wrap_past_the_largest_id() {
        let now = Utc.timestamp_millis_opt(5_000).single().expect("valid timestamp");
        let last = RecordId::new(u64::MAX);
        assert_eq!(RecordId::issue(now, Some(last)), None);
        assert_eq!(
            RecordId::issue(now, Some(RecordId::new(u64::MAX - 1))),
            Some(last)
        );
    }

    #[rstest]
    fn issue_follows_clock_when_ahead_of_floor() {
        let now = Utc.timestamp_millis_opt(9_000).single().expect("valid timestamp");
        let id = RecordId::issue(now, Some(RecordId::new(10))).expect("id");
        assert_eq!(id.get(), 9_000);
    }

    #[rstest]
    fn record_uses_storage_field_names(record: LocationRecord) {
        let json = serde_json::to_value(&record).expect("serialise");
        assert_eq!(json["id"], "7");
        assert_eq!(json["photo"], "file:///park.jpg");
        assert_eq!(json["coords"]["latitude"], 37.421);
        assert!(json["timestamp"].is_string());
    }

    #[rstest]
    fn record_reads_legacy_payload_without_address() {
        let record: LocationRecord = serde_json::from_value(serde_json::json!({
            "id": "1700000000000",
            "coords": { "latitude": 1.0, "longitude": 2.0, "accuracy": 12.5 },
            "timestamp": "2023-11-14T22:13:20.000Z",
            "name": "Old",
            "photo": "file:///old.jpg"
        }))
        .expect("deserialise");
        assert_eq!(record.id(), RecordId::new(1_700_000_000_000));
        assert_eq!(record.address(), None);
    }

    #[rstest]
    fn record_id_rejects_non_numeric_text() {
        assert!("abc".parse::<RecordId>().is_err());
    }
}
