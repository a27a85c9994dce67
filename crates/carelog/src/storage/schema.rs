//! `SQLite` schema definitions for carelog.
//!
//! All statements are idempotent and run every time a database is opened.

/// SQL statement to create the event log.
///
/// `seq` preserves append order; `id` is the record's millisecond id.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS events (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    user_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    record_date TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    body TEXT NOT NULL,
    content_hash TEXT NOT NULL
)
";

/// SQL statement to create an index for per-resident views.
pub const CREATE_USER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_events_user ON events(user_id, seq)
";

/// SQL statement to create an index for per-category-per-day views.
pub const CREATE_CATEGORY_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_events_category_date ON events(event_type, record_date, seq)
";

/// SQL statement to create an index on `content_hash` for import deduplication.
pub const CREATE_HASH_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_events_hash ON events(content_hash)
";

/// SQL statement to create the resident directory table.
pub const CREATE_RESIDENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS residents (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    body TEXT NOT NULL
)
";

/// SQL statement to create the structured daily log table.
pub const CREATE_DAILY_LOGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS daily_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    record_date TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the key-value table.
pub const CREATE_KV_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_EVENTS_TABLE,
    CREATE_USER_INDEX,
    CREATE_CATEGORY_DATE_INDEX,
    CREATE_HASH_INDEX,
    CREATE_RESIDENTS_TABLE,
    CREATE_DAILY_LOGS_TABLE,
    CREATE_KV_TABLE,
];

/// Create every table and index that does not exist yet.
///
/// # Errors
///
/// Returns an error if a statement fails.
pub fn initialize(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    for stmt in SCHEMA_STATEMENTS {
        conn.execute(stmt, [])?;
    }
    Ok(())
}
