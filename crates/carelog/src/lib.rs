//! `carelog` - Structured daily care records for facility residents
//!
//! This library provides the core functionality for recording observations
//! about residents in ten event categories, keeping them in an append-only
//! `SQLite` event log, and counting each day's records per category.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod category;
pub mod cli;
pub mod clock;
pub mod config;
pub mod daily_log;
pub mod directory;
pub mod error;
pub mod kv;
pub mod legacy;
pub mod logging;
pub mod payload;
pub mod record;
pub mod recorder;
pub mod resident;
pub mod session;
pub mod storage;

pub use aggregate::{CategoryCounts, TodayCounts};
pub use category::{Category, CategoryCatalog, CategoryDef};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use daily_log::{DailyLog, RecorderIdentity};
pub use directory::{Directory, MemoryDirectory, SqliteDirectory};
pub use error::{Error, Result};
pub use kv::{KeyValueStore, MemoryStore};
pub use logging::init_logging;
pub use payload::EventPayload;
pub use record::{EventRecord, RecordId};
pub use recorder::{FacilityLogView, Recorder, ResidentLogRow, ResidentLogView};
pub use resident::{Resident, ResidentId, ResidentPatch};
pub use session::SessionContext;
pub use storage::{Storage, StorageStats};
