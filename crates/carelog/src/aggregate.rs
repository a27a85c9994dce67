//! Per-category record counts.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::category::Category;
use crate::error::Result;
use crate::record::EventRecord;
use crate::resident::{Resident, ResidentId};
use crate::storage::Storage;

/// How many records each offered category received on one day.
///
/// Every offered category has an entry, zero when nothing was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodayCounts {
    date: NaiveDate,
    counts: Vec<(Category, u32)>,
}

impl TodayCounts {
    /// All-zero counts for `categories` on `date`.
    #[must_use]
    pub fn empty(date: NaiveDate, categories: &[Category]) -> Self {
        let mut counts: Vec<(Category, u32)> = Vec::with_capacity(categories.len());
        for &category in categories {
            if !counts.iter().any(|(c, _)| *c == category) {
                counts.push((category, 0));
            }
        }
        Self { date, counts }
    }

    /// Count `records` dated `date` whose category is in `categories`.
    #[must_use]
    pub fn from_records<'a>(
        date: NaiveDate,
        categories: &[Category],
        records: impl IntoIterator<Item = &'a EventRecord>,
    ) -> Self {
        let mut counts = Self::empty(date, categories);
        for record in records {
            if record.local_date() == date {
                counts.increment(record.category());
            }
        }
        counts
    }

    /// Walk every resident's records in `storage` and count those on `date`.
    ///
    /// # Errors
    ///
    /// Returns an error if the event log cannot be read.
    pub fn compute(
        storage: &Storage,
        residents: &[Resident],
        categories: &[Category],
        date: NaiveDate,
    ) -> Result<Self> {
        let mut counts = Self::empty(date, categories);
        for resident in residents {
            let records = storage.events_for_resident(&resident.id)?;
            for record in records.iter().filter(|r| r.local_date() == date) {
                counts.increment(record.category());
            }
        }
        debug!("Counted {} records for {}", counts.total(), date);
        Ok(counts)
    }

    /// Add one to `category`. Categories that are not offered are ignored.
    pub fn increment(&mut self, category: Category) {
        if let Some((_, n)) = self.counts.iter_mut().find(|(c, _)| *c == category) {
            *n += 1;
        }
    }

    /// Count for `category`, zero when it is not offered.
    #[must_use]
    pub fn get(&self, category: Category) -> u32 {
        self.counts
            .iter()
            .find(|(c, _)| *c == category)
            .map_or(0, |(_, n)| *n)
    }

    /// Sum over all categories.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    /// The day counted.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Counts in grid order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        self.counts.iter().copied()
    }
}

/// All-time record counts per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    counts: BTreeMap<Category, u32>,
}

impl CategoryCounts {
    /// Count `records`, only those about `resident` when one is given.
    #[must_use]
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a EventRecord>,
        resident: Option<&ResidentId>,
    ) -> Self {
        let mut counts = BTreeMap::new();
        for record in records {
            if resident.is_some_and(|id| *id != record.user_id) {
                continue;
            }
            *counts.entry(record.category()).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Count for `category`.
    #[must_use]
    pub fn get(&self, category: Category) -> u32 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// Sum over all categories.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Non-zero counts in category order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        self.counts.iter().map(|(c, n)| (*c, *n))
    }
}
