//! Record and pending-operation model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Surrogate key for a record, assigned by the store on first persistence.
///
/// IDs auto-increment starting from 1 and are unique within a store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// Creates a record ID from a raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Surrogate key for a pending operation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct OperationId(u64);

impl OperationId {
    /// Creates an operation ID from a raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A geographic point. Latitude and longitude are always both present
/// or both absent on a record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a new point.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Opaque handle to a record's image data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum PhotoRef {
    /// No photo attached.
    #[default]
    None,
    /// A remote URL, used for records mirrored from the authority.
    Url(String),
    /// Binary image data captured while offline, held locally until the
    /// record is synced.
    Bytes {
        /// Original file name.
        file_name: String,
        /// MIME type of the data.
        content_type: String,
        /// The raw image bytes.
        data: Vec<u8>,
    },
}

impl PhotoRef {
    /// Returns true if a photo is attached.
    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, PhotoRef::None)
    }
}

/// A domain entity: one story/menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned surrogate key.
    pub id: RecordId,
    /// Display name, if any.
    pub name: Option<String>,
    /// Free-text description.
    pub description: String,
    /// Attached image, if any.
    pub photo: PhotoRef,
    /// Geographic location, if any.
    pub location: Option<GeoPoint>,
    /// Store-assigned creation time in milliseconds since the Unix epoch.
    /// Monotonic per store instance.
    pub created_at: u64,
    /// Whether the remote authority has acknowledged this record.
    pub synced: bool,
    /// Whether this record originated locally, as opposed to being a
    /// mirror of a server-fetched record.
    pub is_offline: bool,
}

/// Caller-supplied fields for a record about to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NewRecord {
    /// Display name, if any.
    pub name: Option<String>,
    /// Free-text description.
    pub description: String,
    /// Attached image, if any.
    pub photo: PhotoRef,
    /// Geographic location, if any.
    pub location: Option<GeoPoint>,
}

impl NewRecord {
    /// Creates a draft with the given description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the photo reference.
    #[must_use]
    pub fn with_photo(mut self, photo: PhotoRef) -> Self {
        self.photo = photo;
        self
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.location = Some(GeoPoint::new(lat, lon));
        self
    }
}

/// Coarse operation category, used as an index key on the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OperationTag {
    /// A record creation awaiting replay against the authority.
    Create,
    /// A record deletion recorded while offline.
    Delete,
}

/// The payload of a durable intent to mutate remote state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationKind {
    /// Replay a record creation against the authority.
    CreateRecord {
        /// The store-assigned ID of the record this operation describes.
        record_id: RecordId,
        /// The draft to submit, including any binary attachment.
        draft: NewRecord,
    },
    /// A deletion recorded while offline. Advisory: no remote delete
    /// endpoint is modeled, the drain acknowledges these locally.
    DeleteRecord {
        /// The record that was deleted.
        record_id: RecordId,
    },
}

impl OperationKind {
    /// Returns the record this operation refers to.
    #[must_use]
    pub fn record_id(&self) -> RecordId {
        match self {
            OperationKind::CreateRecord { record_id, .. }
            | OperationKind::DeleteRecord { record_id } => *record_id,
        }
    }

    /// Returns the coarse category of this operation.
    #[must_use]
    pub fn tag(&self) -> OperationTag {
        match self {
            OperationKind::CreateRecord { .. } => OperationTag::Create,
            OperationKind::DeleteRecord { .. } => OperationTag::Delete,
        }
    }
}

/// A durable intent to mutate remote state.
///
/// Created atomically alongside the record it describes; destroyed only
/// after the remote authority acknowledges the operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Store-assigned surrogate key. Enqueue order follows ID order.
    pub id: OperationId,
    /// What to replay against the authority.
    pub kind: OperationKind,
    /// When the operation was enqueued, milliseconds since the Unix epoch.
    pub enqueued_at: u64,
}
