//! Event records.
//!
//! An [`EventRecord`] is one submitted observation. Its JSON form is
//! `{ id, user_id, event_type, created_at, timestamp, data, notes,
//! admin_created, auto_saved }`, where `data` holds the fields of the
//! category's payload.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::category::Category;
use crate::error::Error;
use crate::payload::EventPayload;
use crate::resident::ResidentId;
use crate::session::SessionContext;

/// Identifier of a record: milliseconds since the Unix epoch, in decimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out strictly increasing millisecond identifiers.
///
/// Two records created within the same millisecond get consecutive values
/// instead of the same one.
#[derive(Debug, Default)]
pub struct RecordIdGenerator {
    last: AtomicI64,
}

impl RecordIdGenerator {
    /// Create a generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The next identifier for a record created at `now`.
    pub fn next(&self, now: DateTime<Utc>) -> RecordId {
        let millis = now.timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(millis.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        RecordId(millis.max(previous + 1).to_string())
    }

    /// Never hand out `id` or anything below it again.
    pub fn observe(&self, id: &RecordId) {
        if let Ok(value) = id.as_str().parse::<i64>() {
            self.last.fetch_max(value, Ordering::SeqCst);
        }
    }
}

/// One submitted observation about one resident.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawRecord")]
pub struct EventRecord {
    /// Record identifier.
    pub id: RecordId,
    /// Resident the record is about.
    pub user_id: ResidentId,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Category-specific content.
    pub payload: EventPayload,
    /// Copy of the payload's notes.
    pub notes: String,
    /// Written by an authenticated admin.
    pub admin_created: bool,
    /// Written while auto-save was on.
    pub auto_saved: bool,
    /// Name of the staff member who wrote the record, when known.
    pub author: Option<String>,
}

impl EventRecord {
    /// Build a record for `payload` about `user_id`, created at `now`.
    #[must_use]
    pub fn new(
        id: RecordId,
        user_id: ResidentId,
        payload: EventPayload,
        now: DateTime<Local>,
        session: &SessionContext,
    ) -> Self {
        let at = truncate_to_millis(now.with_timezone(&Utc));
        Self {
            id,
            user_id,
            created_at: at,
            timestamp: at,
            notes: payload.notes().to_string(),
            payload,
            admin_created: session.admin_created(),
            auto_saved: session.auto_saved(),
            author: None,
        }
    }

    /// Set the record's author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// The record's category.
    #[must_use]
    pub fn category(&self) -> Category {
        self.payload.category()
    }

    /// Local calendar date of the record's timestamp.
    #[must_use]
    pub fn local_date(&self) -> NaiveDate {
        self.timestamp.with_timezone(&Local).date_naive()
    }

    /// BLAKE3 hash over resident, category, timestamp and data.
    ///
    /// Identifies the same observation across copies whose ids differ.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded.
    pub fn content_hash(&self) -> crate::Result<String> {
        let data = serde_json::to_string(&self.payload.to_data()?)?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.user_id.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.category().id().as_bytes());
        hasher.update(b"\0");
        hasher.update(format_timestamp(&self.timestamp).as_bytes());
        hasher.update(b"\0");
        hasher.update(data.as_bytes());
        Ok(hasher.finalize().to_hex().to_string())
    }
}

/// Format a timestamp the way records store it: RFC 3339, milliseconds, `Z`.
#[must_use]
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    let nanos = at.nanosecond() / 1_000_000 * 1_000_000;
    at.with_nanosecond(nanos).unwrap_or(at)
}

/// Wire form of a record, lenient about fields older writers left out.
#[derive(Deserialize)]
struct RawRecord {
    id: RecordId,
    user_id: ResidentId,
    event_type: Category,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    timestamp: DateTime<Utc>,
    #[serde(default = "empty_object")]
    data: Value,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    admin_created: bool,
    #[serde(default)]
    auto_saved: bool,
    #[serde(default)]
    author: Option<String>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl TryFrom<RawRecord> for EventRecord {
    type Error = Error;

    fn try_from(raw: RawRecord) -> crate::Result<Self> {
        let payload = EventPayload::from_data(raw.event_type, raw.data)?;
        Ok(Self {
            id: raw.id,
            user_id: raw.user_id,
            created_at: raw.created_at.unwrap_or(raw.timestamp),
            timestamp: raw.timestamp,
            payload,
            notes: raw.notes,
            admin_created: raw.admin_created,
            auto_saved: raw.auto_saved,
            author: raw.author.filter(|a| !a.is_empty()),
        })
    }
}

#[derive(Serialize)]
struct RawRecordRef<'a> {
    id: &'a RecordId,
    user_id: &'a ResidentId,
    event_type: Category,
    created_at: String,
    timestamp: String,
    data: Value,
    notes: &'a str,
    admin_created: bool,
    auto_saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<&'a str>,
}

impl Serialize for EventRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = self
            .payload
            .to_data()
            .map_err(<S::Error as serde::ser::Error>::custom)?;
        RawRecordRef {
            id: &self.id,
            user_id: &self.user_id,
            event_type: self.category(),
            created_at: format_timestamp(&self.created_at),
            timestamp: format_timestamp(&self.timestamp),
            data,
            notes: &self.notes,
            admin_created: self.admin_created,
            auto_saved: self.auto_saved,
            author: self.author.as_deref(),
        }
        .serialize(serializer)
    }
}
