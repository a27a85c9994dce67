//! The recording page controller.
//!
//! A [`Recorder`] walks staff through choosing a resident, choosing a
//! category and submitting one observation. Each submission is handed to the
//! [`Directory`] as a [`DailyLog`] and then appended to the event log, which
//! every per-resident, per-day and facility-wide view reads from.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use crate::aggregate::{CategoryCounts, TodayCounts};
use crate::category::{Category, CategoryCatalog, CategoryDef};
use crate::clock::Clock;
use crate::daily_log::{DailyLog, RecorderIdentity};
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::kv::KeyValueStore;
use crate::payload::EventPayload;
use crate::record::{EventRecord, RecordIdGenerator};
use crate::resident::{Resident, ResidentId, ResidentPatch};
use crate::session::SessionContext;
use crate::storage::{Storage, SAVED_AT_KEY};

/// Toast shown after a successful save.
pub const SAVED_TOAST: &str = "全日誌データを保存しました";

/// Warning shown while auto-save is off outside admin mode.
pub const AUTO_SAVE_WARNING: &str = "自動保存が無効です。記録は手動で保存する必要があります。";

/// Log viewer text when the log is empty.
pub const NO_DATA: &str = "データなし";

/// Last-saved text when nothing has been saved.
pub const NOT_SAVED: &str = "未保存";

/// Log viewer text when storage cannot be read.
pub const READ_ERROR: &str = "取得エラー";

/// Author column for records written without one.
pub const NO_AUTHOR: &str = "-";

/// What the admin log viewer shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityLogView {
    /// Every record as pretty-printed JSON, or [`NO_DATA`].
    pub logs_json: String,
    /// Local time of the last save, or [`NOT_SAVED`].
    pub last_saved: String,
}

/// One row of the resident log viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidentLogRow {
    /// Local date the record was created.
    pub date: NaiveDate,
    /// Display name of the record's category.
    pub category: String,
    /// The record's data as JSON.
    pub content: String,
    /// Who wrote the record, or [`NO_AUTHOR`].
    pub author: String,
}

/// What the admin log viewer shows for the active resident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidentLogView {
    /// Resident's display name, or the id if the directory does not know it.
    pub resident_name: String,
    /// Today.
    pub date: NaiveDate,
    /// Local time of the last save, or [`NOT_SAVED`].
    pub last_saved: String,
    /// All-time record count per offered category.
    pub counts: Vec<(Category, u32)>,
    /// The resident's records, oldest first.
    pub rows: Vec<ResidentLogRow>,
}

/// Controller for one recording session.
pub struct Recorder {
    storage: Arc<Storage>,
    directory: Arc<dyn Directory>,
    session: SessionContext,
    clock: Arc<dyn Clock>,
    identity: RecorderIdentity,
    ids: RecordIdGenerator,

    residents: Vec<Resident>,
    catalog: CategoryCatalog,
    counts: TodayCounts,

    selected_resident: Option<ResidentId>,
    active_category: Option<Category>,
    toast: Option<&'static str>,
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("storage", &self.storage.path())
            .field("session", &self.session)
            .field("identity", &self.identity)
            .field("residents", &self.residents.len())
            .field("selected_resident", &self.selected_resident)
            .field("active_category", &self.active_category)
            .finish_non_exhaustive()
    }
}

impl Recorder {
    /// Create a recorder and load residents, categories and today's counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the resident list or the category list cannot be read.
    pub async fn new(
        storage: Arc<Storage>,
        directory: Arc<dyn Directory>,
        session: SessionContext,
        clock: Arc<dyn Clock>,
        identity: RecorderIdentity,
    ) -> Result<Self> {
        let today = clock.today();
        let mut recorder = Self {
            storage,
            directory,
            session,
            clock,
            identity,
            ids: RecordIdGenerator::new(),
            residents: Vec::new(),
            catalog: CategoryCatalog::default(),
            counts: TodayCounts::empty(today, &Category::ALL),
            selected_resident: None,
            active_category: None,
            toast: None,
        };
        recorder.refresh(today).await?;
        Ok(recorder)
    }

    // === Selection ===

    /// Make `id` the active resident.
    ///
    /// The selection is kept even when the directory does not know the id;
    /// the returned resident is `None` then.
    pub fn select_resident(&mut self, id: impl Into<ResidentId>) -> Option<&Resident> {
        let id = id.into();
        debug!("Selected resident {}", id);
        self.selected_resident = Some(id);
        self.selected_resident()
    }

    /// Go back to resident selection.
    pub fn clear_resident(&mut self) {
        self.selected_resident = None;
        self.active_category = None;
    }

    /// The active resident, if the directory knows it.
    #[must_use]
    pub fn selected_resident(&self) -> Option<&Resident> {
        let id = self.selected_resident.as_ref()?;
        self.residents.iter().find(|r| &r.id == id)
    }

    /// Id of the active resident.
    #[must_use]
    pub fn selected_resident_id(&self) -> Option<&ResidentId> {
        self.selected_resident.as_ref()
    }

    /// Open the form for category `id`.
    ///
    /// Returns `false` and changes nothing when `id` is not a known category
    /// or is not offered by the current catalog.
    pub fn select_category(&mut self, id: &str) -> bool {
        match id.parse::<Category>() {
            Ok(category) if self.catalog.contains(category) => {
                self.active_category = Some(category);
                true
            }
            _ => false,
        }
    }

    /// Go back to the category grid.
    pub fn clear_category(&mut self) {
        self.active_category = None;
    }

    /// The category whose form is open.
    #[must_use]
    pub fn active_category(&self) -> Option<Category> {
        self.active_category
    }

    // === Submission ===

    /// Save one observation for the active resident.
    ///
    /// Returns `Ok(None)` without touching anything when no resident or no
    /// category is selected. On success the category form closes, today's
    /// count for the category goes up by one and the saved toast is set.
    /// If the record falls on a later day than the counts, they are recounted
    /// for that day first.
    ///
    /// Takes `&mut self`, so a second submission cannot start while one is
    /// waiting on the directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CategoryMismatch`] or [`Error::InvalidPayload`] before
    /// any write. Returns the directory or storage error if saving fails; a
    /// daily log already accepted by the directory is not withdrawn.
    pub async fn submit(&mut self, payload: EventPayload) -> Result<Option<EventRecord>> {
        let (Some(user_id), Some(active)) =
            (self.selected_resident.clone(), self.active_category)
        else {
            debug!("Submit ignored: no resident or category selected");
            return Ok(None);
        };

        if payload.category() != active {
            return Err(Error::CategoryMismatch {
                selected: active.id(),
                payload: payload.category().id(),
            });
        }
        payload.validate()?;

        match self.persist(user_id, payload).await {
            Ok(record) => {
                info!(
                    "Saved {} record {} for {}",
                    record.category(),
                    record.id,
                    record.user_id
                );
                self.active_category = None;
                let date = record.local_date();
                if date == self.counts.date() {
                    self.counts.increment(active);
                } else {
                    // the new record is already in the log
                    self.after_catalog_change(date);
                }
                self.toast = Some(SAVED_TOAST);
                Ok(Some(record))
            }
            Err(e) => {
                error!("Failed to save {} record: {}", active, e);
                Err(e)
            }
        }
    }

    async fn persist(&self, user_id: ResidentId, payload: EventPayload) -> Result<EventRecord> {
        let now = self.clock.now();

        let log = DailyLog::for_event(
            user_id.clone(),
            &payload,
            now,
            self.session.admin_created(),
            &self.identity,
        )?;
        let stored = self.directory.append_log(log).await?;
        debug!("Directory accepted daily log {:?}", stored.id);

        let id = self.ids.next(now.with_timezone(&Utc));
        let mut record = EventRecord::new(id, user_id, payload, now, &self.session)
            .with_author(self.identity.recorder_name.as_str());
        self.storage
            .append_event_with_saved_at(&mut record, &self.clock.now().with_timezone(&Utc))?;
        self.ids.observe(&record.id);
        Ok(record)
    }

    /// The toast to show, if any.
    #[must_use]
    pub fn toast(&self) -> Option<&'static str> {
        self.toast
    }

    /// Hide the toast.
    pub fn dismiss_toast(&mut self) {
        self.toast = None;
    }

    // === Admin ===

    /// Rename the active resident.
    ///
    /// Returns `false` outside admin mode, with no active resident, or for a
    /// blank name.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory rejects the update.
    pub async fn rename_resident(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        if !self.session.admin_features() || name.is_empty() {
            return Ok(false);
        }
        let Some(id) = self.selected_resident.clone() else {
            return Ok(false);
        };

        let updated = self
            .directory
            .update_resident(&id, ResidentPatch::rename(name))
            .await?;
        if let Some(slot) = self.residents.iter_mut().find(|r| r.id == id) {
            *slot = updated;
        }
        info!("Renamed resident {} to {}", id, name);
        Ok(true)
    }

    /// Replace the category list.
    ///
    /// Returns `false` outside admin mode. Entries are cleaned the way
    /// [`CategoryCatalog::from_entries`] does, and an open form whose
    /// category is dropped is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be stored.
    pub fn update_catalog(&mut self, entries: Vec<CategoryDef>) -> Result<bool> {
        if !self.session.admin_features() {
            return Ok(false);
        }
        let catalog = CategoryCatalog::from_entries(entries);
        catalog.save(self.storage.as_ref())?;
        self.catalog = catalog;
        self.after_catalog_change(self.counts.date());
        Ok(true)
    }

    /// The admin log viewer: every record plus the last-saved time.
    #[must_use]
    pub fn facility_log_view(&self) -> FacilityLogView {
        match self.read_log_view() {
            Ok(view) => view,
            Err(e) => {
                warn!("Failed to read the facility log: {}", e);
                FacilityLogView {
                    logs_json: READ_ERROR.to_string(),
                    last_saved: READ_ERROR.to_string(),
                }
            }
        }
    }

    fn read_log_view(&self) -> Result<FacilityLogView> {
        let records = self.storage.all_events()?;
        let logs_json = if records.is_empty() {
            NO_DATA.to_string()
        } else {
            serde_json::to_string_pretty(&records)?
        };

        Ok(FacilityLogView {
            logs_json,
            last_saved: self.last_saved()?,
        })
    }

    fn last_saved(&self) -> Result<String> {
        let text = match self.storage.get(SAVED_AT_KEY)? {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| Error::internal(format!("bad {SAVED_AT_KEY} '{raw}': {e}")))?
                .with_timezone(&Local)
                .format("%Y/%-m/%-d %-H:%M:%S")
                .to_string(),
            None => NOT_SAVED.to_string(),
        };
        Ok(text)
    }

    /// The admin log viewer for the active resident.
    ///
    /// Returns `Ok(None)` when no resident is selected.
    ///
    /// # Errors
    ///
    /// Returns an error if the event log or the last-saved time cannot be read.
    pub fn resident_log_view(&self) -> Result<Option<ResidentLogView>> {
        let Some(id) = self.selected_resident.as_ref() else {
            return Ok(None);
        };

        let records = self.storage.events_for_resident(id)?;
        let totals = CategoryCounts::from_records(&records, None);
        let rows = records
            .iter()
            .map(|record| self.log_row(record))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(ResidentLogView {
            resident_name: self
                .selected_resident()
                .map_or_else(|| id.to_string(), |r| r.name.clone()),
            date: self.clock.today(),
            last_saved: self.last_saved()?,
            counts: self
                .catalog
                .categories()
                .into_iter()
                .map(|c| (c, totals.get(c)))
                .collect(),
            rows,
        }))
    }

    fn log_row(&self, record: &EventRecord) -> Result<ResidentLogRow> {
        Ok(ResidentLogRow {
            date: record.created_at.with_timezone(&Local).date_naive(),
            category: self.catalog.name_of(record.category()).to_string(),
            content: serde_json::to_string(&record.payload.to_data()?)?,
            author: record
                .author
                .clone()
                .unwrap_or_else(|| NO_AUTHOR.to_string()),
        })
    }

    /// Whether staff should be warned that auto-save is off.
    #[must_use]
    pub fn show_admin_warning(&self) -> bool {
        self.session.show_admin_warning()
    }

    // === Refresh ===

    /// Reload residents and categories and recount records on `date`.
    ///
    /// A failure to read the event log leaves all counts at zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the resident list or the category list cannot be read.
    pub async fn refresh(&mut self, date: NaiveDate) -> Result<()> {
        self.residents = self.directory.list_residents().await?;
        self.catalog = CategoryCatalog::load(self.storage.as_ref())?;
        self.after_catalog_change(date);
        debug!(
            "Refreshed {} residents, {} categories, {} records on {}",
            self.residents.len(),
            self.catalog.entries().len(),
            self.counts.total(),
            date
        );
        Ok(())
    }

    /// Recount if the clock has moved to another day since the counts were
    /// taken. Returns whether a recount happened.
    pub fn roll_over(&mut self) -> bool {
        let today = self.clock.today();
        if today == self.counts.date() {
            return false;
        }
        debug!("Day changed from {} to {}", self.counts.date(), today);
        self.after_catalog_change(today);
        true
    }

    fn after_catalog_change(&mut self, date: NaiveDate) {
        if let Some(active) = self.active_category {
            if !self.catalog.contains(active) {
                self.active_category = None;
            }
        }

        let categories = self.catalog.categories();
        self.counts = TodayCounts::compute(&self.storage, &self.residents, &categories, date)
            .unwrap_or_else(|e| {
                warn!("Failed to count records for {}: {}", date, e);
                TodayCounts::empty(date, &categories)
            });
    }

    // === Accessors ===

    /// Residents from the last refresh.
    #[must_use]
    pub fn residents(&self) -> &[Resident] {
        &self.residents
    }

    /// The category grid.
    #[must_use]
    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// Counts as of the last refresh or submission; see [`Recorder::roll_over`].
    #[must_use]
    pub fn counts(&self) -> &TodayCounts {
        &self.counts
    }

    /// The session flags.
    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::directory::MemoryDirectory;
    use crate::error::SAVE_FAILED_MESSAGE;
    use crate::payload::{MealPayload, OtherPayload, VitalPayload};
    use crate::record::RecordId;
    use chrono::TimeZone;

    struct Fixture {
        storage: Arc<Storage>,
        directory: Arc<MemoryDirectory>,
        clock: Arc<FixedClock>,
    }

    impl Fixture {
        fn new() -> Self {
            crate::logging::init_test_logging();
            Self {
                storage: Arc::new(Storage::open_in_memory().unwrap()),
                directory: Arc::new(MemoryDirectory::with_residents(vec![
                    Resident::new("user1", "田中"),
                    Resident::new("user2", "佐藤"),
                ])),
                clock: Arc::new(FixedClock::new(
                    Local.with_ymd_and_hms(2025, 7, 11, 10, 0, 0).unwrap(),
                )),
            }
        }

        async fn recorder(&self, session: SessionContext) -> Recorder {
            Recorder::new(
                Arc::clone(&self.storage),
                self.directory.clone(),
                session,
                self.clock.clone(),
                RecorderIdentity::default(),
            )
            .await
            .unwrap()
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 11).unwrap()
    }

    fn vital() -> EventPayload {
        EventPayload::Vital(VitalPayload {
            systolic: Some(120),
            diastolic: Some(80),
            notes: Some("安定".to_string()),
            ..VitalPayload::default()
        })
    }

    fn meal() -> EventPayload {
        EventPayload::Meal(MealPayload {
            meal_type: "昼食".to_string(),
            intake_percent: Some(80),
            ..MealPayload::default()
        })
    }

    #[derive(Debug)]
    struct OfflineDirectory;

    #[async_trait::async_trait]
    impl Directory for OfflineDirectory {
        async fn list_residents(&self) -> Result<Vec<Resident>> {
            Ok(vec![Resident::new("user1", "田中")])
        }

        async fn update_resident(&self, id: &ResidentId, _: ResidentPatch) -> Result<Resident> {
            Err(Error::UnknownResident(id.to_string()))
        }

        async fn append_log(&self, _: DailyLog) -> Result<DailyLog> {
            Err(Error::directory("offline"))
        }
    }

    #[tokio::test]
    async fn test_counts_start_at_zero() {
        let fixture = Fixture::new();
        let recorder = fixture.recorder(SessionContext::default()).await;

        for category in Category::ALL {
            assert_eq!(recorder.counts().get(category), 0);
        }
        assert_eq!(recorder.counts().date(), day());
        assert_eq!(recorder.residents().len(), 2);
    }

    #[tokio::test]
    async fn test_vital_scenario() {
        let fixture = Fixture::new();
        let mut recorder = fixture.recorder(SessionContext::default()).await;

        let resident = recorder.select_resident("user1").cloned();
        assert_eq!(resident.map(|r| r.name), Some("田中".to_string()));
        assert!(recorder.select_category("vital"));

        let record = recorder.submit(vital()).await.unwrap().unwrap();
        assert_eq!(record.user_id.as_str(), "user1");
        assert_eq!(record.category(), Category::Vital);
        assert_eq!(record.notes, "安定");
        assert!(!record.admin_created);
        assert!(record.auto_saved);

        let bucket = fixture
            .storage
            .events_for_category_on(Category::Vital, day())
            .unwrap();
        assert_eq!(bucket, vec![record.clone()]);
        assert_eq!(fixture.storage.all_events().unwrap().len(), 1);
        assert_eq!(
            fixture
                .storage
                .events_for_resident(&ResidentId::from("user1"))
                .unwrap()
                .len(),
            1
        );

        assert_eq!(recorder.counts().get(Category::Vital), 1);
        assert_eq!(recorder.counts().total(), 1);
        assert_eq!(recorder.active_category(), None);
        assert_eq!(recorder.toast(), Some(SAVED_TOAST));

        let logs = fixture.directory.logs().await;
        assert_eq!(logs.len(), 1);
        let details = logs[0].note_details();
        assert_eq!(details[0].event_type, "vital");
        assert_eq!(details[0].data["diastolic"], 80);
        assert_eq!(logs[0].record_date, day());
    }

    #[tokio::test]
    async fn test_two_submissions_in_one_category() {
        let fixture = Fixture::new();
        let mut recorder = fixture.recorder(SessionContext::default()).await;
        recorder.select_resident("user1");

        for _ in 0..2 {
            assert!(recorder.select_category("vital"));
            recorder.submit(vital()).await.unwrap().unwrap();
        }

        assert_eq!(recorder.counts().get(Category::Vital), 2);
        for category in Category::ALL.into_iter().filter(|c| *c != Category::Vital) {
            assert_eq!(recorder.counts().get(category), 0);
        }

        let ids: Vec<_> = fixture
            .storage
            .all_events()
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] != ids[1]);
    }

    #[tokio::test]
    async fn test_counts_follow_the_day() {
        let fixture = Fixture::new();
        fixture
            .clock
            .set(Local.with_ymd_and_hms(2025, 7, 11, 23, 59, 0).unwrap());
        let mut recorder = fixture.recorder(SessionContext::default()).await;
        recorder.select_resident("user1");
        recorder.select_category("vital");
        recorder.submit(vital()).await.unwrap();
        assert_eq!(recorder.counts().get(Category::Vital), 1);

        let next_day = NaiveDate::from_ymd_opt(2025, 7, 12).unwrap();
        fixture
            .clock
            .set(Local.with_ymd_and_hms(2025, 7, 12, 0, 1, 0).unwrap());
        recorder.select_category("vital");
        let record = recorder.submit(vital()).await.unwrap().unwrap();

        assert_eq!(record.local_date(), next_day);
        assert_eq!(recorder.counts().date(), next_day);
        assert_eq!(recorder.counts().get(Category::Vital), 1);
        assert_eq!(recorder.counts().total(), 1);
        for date in [day(), next_day] {
            let bucket = fixture
                .storage
                .events_for_category_on(Category::Vital, date)
                .unwrap();
            assert_eq!(bucket.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_roll_over_recounts_on_a_new_day() {
        let fixture = Fixture::new();
        let mut recorder = fixture.recorder(SessionContext::default()).await;
        recorder.select_resident("user1");
        recorder.select_category("meal");
        recorder.submit(meal()).await.unwrap();

        assert!(!recorder.roll_over());
        assert_eq!(recorder.counts().get(Category::Meal), 1);

        fixture
            .clock
            .set(Local.with_ymd_and_hms(2025, 7, 12, 8, 0, 0).unwrap());
        assert!(recorder.roll_over());
        assert_eq!(recorder.counts().date(), NaiveDate::from_ymd_opt(2025, 7, 12).unwrap());
        assert_eq!(recorder.counts().total(), 0);
        assert!(!recorder.roll_over());
    }

    #[tokio::test]
    async fn test_two_recorders_in_one_millisecond() {
        let fixture = Fixture::new();
        let mut first = fixture.recorder(SessionContext::default()).await;
        let mut second = fixture.recorder(SessionContext::default()).await;

        first.select_resident("user1");
        first.select_category("vital");
        second.select_resident("user2");
        second.select_category("vital");

        let a = first.submit(vital()).await.unwrap().unwrap();
        let b = second.submit(vital()).await.unwrap().unwrap();
        assert_ne!(a.id, b.id);
        assert!(b.id > a.id);

        first.select_category("vital");
        let c = first.submit(vital()).await.unwrap().unwrap();
        assert!(c.id > b.id);

        assert_eq!(fixture.storage.count().unwrap(), 3);
        assert_eq!(fixture.directory.logs().await.len(), 3);
    }

    #[tokio::test]
    async fn test_submit_without_resident_is_noop() {
        let fixture = Fixture::new();
        let mut recorder = fixture.recorder(SessionContext::default()).await;

        assert!(recorder.select_category("vital"));
        assert!(recorder.submit(vital()).await.unwrap().is_none());

        assert_eq!(fixture.storage.count().unwrap(), 0);
        assert!(fixture.storage.get(SAVED_AT_KEY).unwrap().is_none());
        assert!(fixture.directory.logs().await.is_empty());
        assert_eq!(recorder.counts().total(), 0);
    }

    #[tokio::test]
    async fn test_submit_without_category_is_noop() {
        let fixture = Fixture::new();
        let mut recorder = fixture.recorder(SessionContext::default()).await;
        recorder.select_resident("user1");

        assert!(recorder.submit(vital()).await.unwrap().is_none());
        assert_eq!(fixture.storage.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_counts_survive_reconstruction() {
        let fixture = Fixture::new();
        {
            let mut recorder = fixture.recorder(SessionContext::default()).await;
            recorder.select_resident("user2");
            for _ in 0..3 {
                recorder.select_category("meal");
                recorder.submit(meal()).await.unwrap();
            }
        }

        let recorder = fixture.recorder(SessionContext::default()).await;
        assert_eq!(recorder.counts().get(Category::Meal), 3);
        assert_eq!(recorder.counts().total(), 3);
    }

    #[tokio::test]
    async fn test_record_round_trips_through_storage() {
        let fixture = Fixture::new();
        let mut recorder = fixture.recorder(SessionContext::admin()).await;
        recorder.select_resident("user2");
        recorder.select_category("meal");
        let record = recorder.submit(meal()).await.unwrap().unwrap();
        assert!(record.admin_created);
        assert!(!record.auto_saved);

        let stored = fixture
            .storage
            .events_for_resident(&ResidentId::from("user2"))
            .unwrap();
        assert_eq!(stored[0].category(), Category::Meal);
        assert_eq!(stored[0].user_id, record.user_id);
        assert_eq!(stored[0].payload.to_data().unwrap(), meal().to_data().unwrap());
    }

    #[tokio::test]
    async fn test_category_mismatch() {
        let fixture = Fixture::new();
        let mut recorder = fixture.recorder(SessionContext::default()).await;
        recorder.select_resident("user1");
        recorder.select_category("vital");

        let err = recorder.submit(meal()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::CategoryMismatch {
                selected: "vital",
                payload: "meal"
            }
        ));
        assert_eq!(fixture.storage.count().unwrap(), 0);
        assert_eq!(recorder.active_category(), Some(Category::Vital));
    }

    #[tokio::test]
    async fn test_invalid_payload_writes_nothing() {
        let fixture = Fixture::new();
        let mut recorder = fixture.recorder(SessionContext::default()).await;
        recorder.select_resident("user1");
        recorder.select_category("other");

        let err = recorder
            .submit(EventPayload::Other(OtherPayload::default()))
            .await
            .unwrap_err();
        assert!(err.is_validation_error());
        assert!(fixture.directory.logs().await.is_empty());
        assert_eq!(fixture.storage.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_directory_failure() {
        let storage = Arc::new(Storage::open_in_memory().unwrap());
        let mut recorder = Recorder::new(
            Arc::clone(&storage),
            Arc::new(OfflineDirectory),
            SessionContext::default(),
            Arc::new(FixedClock::new(
                Local.with_ymd_and_hms(2025, 7, 11, 10, 0, 0).unwrap(),
            )),
            RecorderIdentity::default(),
        )
        .await
        .unwrap();
        recorder.select_resident("user1");
        recorder.select_category("vital");

        let err = recorder.submit(vital()).await.unwrap_err();
        assert_eq!(err.user_message(), SAVE_FAILED_MESSAGE);
        assert_eq!(storage.count().unwrap(), 0);
        assert_eq!(recorder.active_category(), Some(Category::Vital));
        assert_eq!(recorder.counts().get(Category::Vital), 0);
        assert!(recorder.toast().is_none());
    }

    #[tokio::test]
    async fn test_unknown_category_is_ignored() {
        let fixture = Fixture::new();
        let mut recorder = fixture.recorder(SessionContext::default()).await;
        assert!(!recorder.select_category("bath"));
        assert_eq!(recorder.active_category(), None);
    }

    #[tokio::test]
    async fn test_unknown_resident_keeps_selection() {
        let fixture = Fixture::new();
        let mut recorder = fixture.recorder(SessionContext::default()).await;
        assert!(recorder.select_resident("user9").is_none());
        assert_eq!(
            recorder.selected_resident_id(),
            Some(&ResidentId::from("user9"))
        );

        recorder.select_category("vital");
        recorder.clear_resident();
        assert!(recorder.selected_resident_id().is_none());
        assert!(recorder.active_category().is_none());
    }

    #[tokio::test]
    async fn test_rename_requires_admin() {
        let fixture = Fixture::new();
        let mut recorder = fixture.recorder(SessionContext::default()).await;
        recorder.select_resident("user1");
        assert!(!recorder.rename_resident("田中 太郎").await.unwrap());

        let mut admin = fixture.recorder(SessionContext::admin()).await;
        assert!(!admin.rename_resident("田中 太郎").await.unwrap());
        admin.select_resident("user1");
        assert!(!admin.rename_resident("   ").await.unwrap());
        assert!(admin.rename_resident("田中 太郎").await.unwrap());
        assert_eq!(
            admin.selected_resident().map(|r| r.name.as_str()),
            Some("田中 太郎")
        );
        assert_eq!(
            fixture.directory.list_residents().await.unwrap()[0].name,
            "田中 太郎"
        );
    }

    #[tokio::test]
    async fn test_update_catalog() {
        let fixture = Fixture::new();
        let mut staff = fixture.recorder(SessionContext::default()).await;
        assert!(!staff.update_catalog(Vec::new()).unwrap());

        let mut admin = fixture.recorder(SessionContext::admin()).await;
        admin.select_category("sleep");
        assert!(admin
            .update_catalog(vec![
                CategoryDef::from(Category::Vital),
                CategoryDef::from(Category::Meal),
            ])
            .unwrap());
        assert_eq!(admin.active_category(), None);
        assert!(!admin.select_category("sleep"));
        assert_eq!(admin.counts().iter().count(), 2);

        let reloaded = fixture.recorder(SessionContext::default()).await;
        assert_eq!(
            reloaded.catalog().categories(),
            vec![Category::Vital, Category::Meal]
        );
    }

    #[tokio::test]
    async fn test_corrupt_catalog_falls_back() {
        let fixture = Fixture::new();
        fixture
            .storage
            .set(crate::category::CUSTOM_CATEGORIES_KEY, "[{")
            .unwrap();
        let recorder = fixture.recorder(SessionContext::default()).await;
        assert_eq!(recorder.catalog(), &CategoryCatalog::default());
    }

    #[tokio::test]
    async fn test_facility_log_view() {
        let fixture = Fixture::new();
        let mut recorder = fixture.recorder(SessionContext::admin()).await;

        let empty = recorder.facility_log_view();
        assert_eq!(empty.logs_json, NO_DATA);
        assert_eq!(empty.last_saved, NOT_SAVED);

        recorder.select_resident("user1");
        recorder.select_category("vital");
        recorder.submit(vital()).await.unwrap();

        let view = recorder.facility_log_view();
        assert!(view.logs_json.contains("安定"));
        assert!(view.logs_json.contains("\n"));
        assert_eq!(view.last_saved, "2025/7/11 10:00:00");
    }

    #[tokio::test]
    async fn test_resident_log_view() {
        let fixture = Fixture::new();
        let mut recorder = fixture.recorder(SessionContext::admin()).await;
        assert_eq!(recorder.resident_log_view().unwrap(), None);

        recorder.select_resident("user2");
        recorder.select_category("meal");
        recorder.submit(meal()).await.unwrap();
        recorder.select_resident("user1");
        recorder.select_category("vital");
        recorder.submit(vital()).await.unwrap();
        recorder.select_category("meal");
        recorder.submit(meal()).await.unwrap();
        fixture
            .storage
            .append_event(&EventRecord::new(
                RecordId::new("1"),
                ResidentId::from("user1"),
                vital(),
                Local.with_ymd_and_hms(2025, 7, 10, 8, 0, 0).unwrap(),
                &SessionContext::default(),
            ))
            .unwrap();

        let view = recorder.resident_log_view().unwrap().unwrap();
        assert_eq!(view.resident_name, "田中");
        assert_eq!(view.date, day());
        assert_eq!(view.last_saved, "2025/7/11 10:00:00");
        assert_eq!(view.rows.len(), 3);
        assert_eq!(view.rows[0].category, "バイタル");
        assert_eq!(view.rows[0].author, "記録者");
        assert!(view.rows[0].content.contains("\"systolic\":120"));
        assert_eq!(view.rows[1].category, "食事・水分");
        assert_eq!(view.rows[2].date, NaiveDate::from_ymd_opt(2025, 7, 10).unwrap());
        assert_eq!(view.rows[2].author, NO_AUTHOR);

        let vital_total = view
            .counts
            .iter()
            .find(|(c, _)| *c == Category::Vital)
            .map(|(_, n)| *n);
        assert_eq!(vital_total, Some(2));
        assert_eq!(view.counts.len(), Category::ALL.len());
    }

    #[tokio::test]
    async fn test_facility_log_view_read_error() {
        let fixture = Fixture::new();
        let recorder = fixture.recorder(SessionContext::admin()).await;
        fixture.storage.set(SAVED_AT_KEY, "not a time").unwrap();

        let view = recorder.facility_log_view();
        assert_eq!(view.logs_json, READ_ERROR);
        assert_eq!(view.last_saved, READ_ERROR);
    }

    #[tokio::test]
    async fn test_admin_warning() {
        let fixture = Fixture::new();
        let manual = SessionContext {
            auto_save_enabled: false,
            ..SessionContext::default()
        };
        assert!(fixture.recorder(manual).await.show_admin_warning());
        assert!(!fixture
            .recorder(SessionContext::default())
            .await
            .show_admin_warning());
    }
}
