//! Browser storage bucket layout.
//!
//! Earlier versions kept records in browser storage under several keys at
//! once:
//!
//! - `dailyLogs_<residentId>`: records about one resident
//! - `<categoryId>_records_<YYYY-MM-DD>`: records of one category on one day
//! - `daily_logs`: every record
//! - `daily_logs_saved_at`: time of the last write
//! - `customEventTypes`: the edited category list
//!
//! [`export`] renders the event log into that layout and [`import`] folds a
//! dump back into the log, storing each record once.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::category::{Category, CategoryDef, CUSTOM_CATEGORIES_KEY};
use crate::error::Result;
use crate::kv::{self, KeyValueStore};
use crate::record::EventRecord;
use crate::resident::ResidentId;
use crate::storage::{Storage, SAVED_AT_KEY};

/// Key of the facility-wide bucket.
pub const FACILITY_KEY: &str = "daily_logs";

/// Prefix of per-resident bucket keys.
pub const RESIDENT_PREFIX: &str = "dailyLogs_";

/// One of the keys that hold an array of records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BucketKey {
    /// Every record.
    Facility,
    /// Records about one resident.
    Resident(ResidentId),
    /// Records of one category on one day.
    CategoryDay(Category, NaiveDate),
}

impl BucketKey {
    /// Parse a storage key. Keys that do not name a record bucket give `None`.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        if key == FACILITY_KEY {
            return Some(Self::Facility);
        }
        if let Some(id) = key.strip_prefix(RESIDENT_PREFIX) {
            return (!id.is_empty()).then(|| Self::Resident(ResidentId::from(id)));
        }

        let captures = category_day_pattern().captures(key)?;
        let category = captures[1].parse().ok()?;
        let date = NaiveDate::parse_from_str(&captures[2], "%Y-%m-%d").ok()?;
        Some(Self::CategoryDay(category, date))
    }

    /// The storage key.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::Facility => FACILITY_KEY.to_string(),
            Self::Resident(id) => format!("{RESIDENT_PREFIX}{id}"),
            Self::CategoryDay(category, date) => format!("{category}_records_{date}"),
        }
    }

    /// Import order: the facility bucket carries append order, so it goes first.
    fn rank(&self) -> u8 {
        match self {
            Self::Facility => 0,
            Self::Resident(_) => 1,
            Self::CategoryDay(..) => 2,
        }
    }
}

fn category_day_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([a-z]+)_records_(\d{4}-\d{2}-\d{2})$").expect("Invalid regex pattern")
    })
}

/// What an export wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Records in the facility bucket.
    pub records: usize,
    /// Record bucket keys written, the facility bucket included.
    pub buckets: usize,
}

/// Render the event log and settings of `storage` into `target`.
///
/// # Errors
///
/// Returns an error if the log cannot be read or `target` cannot be written.
pub fn export(storage: &Storage, target: &dyn KeyValueStore) -> Result<ExportReport> {
    let records = storage.all_events()?;

    let mut buckets: BTreeMap<String, Vec<&EventRecord>> = BTreeMap::new();
    for record in &records {
        buckets
            .entry(BucketKey::Resident(record.user_id.clone()).key())
            .or_default()
            .push(record);
        buckets
            .entry(BucketKey::CategoryDay(record.category(), record.local_date()).key())
            .or_default()
            .push(record);
    }

    kv::write_json(target, FACILITY_KEY, &records)?;
    for (key, bucket) in &buckets {
        kv::write_json(target, key, bucket)?;
    }

    for key in [SAVED_AT_KEY, CUSTOM_CATEGORIES_KEY] {
        if let Some(value) = storage.get(key)? {
            target.set(key, &value)?;
        }
    }

    let report = ExportReport {
        records: records.len(),
        buckets: buckets.len() + 1,
    };
    info!(
        "Exported {} records into {} buckets",
        report.records, report.buckets
    );
    Ok(report)
}

/// What an import did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Record buckets read.
    pub buckets: usize,
    /// Records added to the log.
    pub imported: usize,
    /// Records already in the log or seen in an earlier bucket.
    pub duplicates: usize,
    /// Entries or buckets that could not be decoded.
    pub skipped: usize,
    /// Whether the category list was taken over.
    pub categories: bool,
}

/// Fold the buckets found in `source` into the event log of `storage`.
///
/// A record that appears in several buckets, or is already in the log, is
/// stored once: it is matched by id and by content hash. Buckets and entries
/// that do not decode are logged and skipped. The new records are appended
/// in one transaction, so a failed import stores none of them.
///
/// # Errors
///
/// Returns an error if `source` cannot be read or the log cannot be written.
pub fn import(source: &dyn KeyValueStore, storage: &Storage) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    let mut keys: Vec<(BucketKey, String)> = source
        .keys()?
        .into_iter()
        .filter_map(|key| BucketKey::parse(&key).map(|bucket| (bucket, key)))
        .collect();
    keys.sort_by(|(a, ka), (b, kb)| a.rank().cmp(&b.rank()).then_with(|| ka.cmp(kb)));

    let mut seen_ids = HashSet::new();
    let mut seen_hashes = HashSet::new();
    let mut pending = Vec::new();

    for (bucket, key) in keys {
        let entries = match kv::read_json::<Vec<Value>>(source, &key) {
            Ok(Some(entries)) => entries,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping corrupt bucket {}: {}", key, e);
                report.skipped += 1;
                continue;
            }
        };
        report.buckets += 1;
        debug!("Reading {} entries from {:?}", entries.len(), bucket);

        for entry in entries {
            let record: EventRecord = match serde_json::from_value(entry) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", key, e);
                    report.skipped += 1;
                    continue;
                }
            };

            let hash = record.content_hash()?;
            if seen_ids.contains(&record.id)
                || seen_hashes.contains(&hash)
                || storage.contains_id(&record.id)?
                || storage.contains_hash(&hash)?
            {
                report.duplicates += 1;
                continue;
            }

            seen_ids.insert(record.id.clone());
            seen_hashes.insert(hash);
            pending.push(record);
        }
    }
    report.imported = storage.append_events(&pending)?;

    if let Some(saved_at) = source.get(SAVED_AT_KEY)? {
        if DateTime::parse_from_rfc3339(&saved_at).is_ok() {
            storage.set(SAVED_AT_KEY, &saved_at)?;
        } else {
            warn!("Ignoring unparseable {}: {}", SAVED_AT_KEY, saved_at);
        }
    }

    match kv::read_json::<Vec<CategoryDef>>(source, CUSTOM_CATEGORIES_KEY) {
        Ok(Some(entries)) => {
            kv::write_json(storage, CUSTOM_CATEGORIES_KEY, &entries)?;
            report.categories = true;
        }
        Ok(None) => {}
        Err(e) => warn!("Ignoring corrupt category list: {}", e),
    }

    info!(
        "Imported {} records from {} buckets ({} duplicates, {} skipped)",
        report.imported, report.buckets, report.duplicates, report.skipped
    );
    Ok(report)
}
