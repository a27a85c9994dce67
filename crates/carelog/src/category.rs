//! Event categories and the admin-editable category list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::kv::{self, KeyValueStore};

/// Key under which the admin-edited category list is stored.
pub const CUSTOM_CATEGORIES_KEY: &str = "customEventTypes";

/// Icon given to edited entries that have none.
const FALLBACK_ICON: &str = "📝";

/// The ten kinds of event staff can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Seizures.
    Seizure,
    /// Facial expression and reactions.
    Expression,
    /// Vital signs.
    Vital,
    /// Meals and hydration.
    Meal,
    /// Toileting.
    Excretion,
    /// Sleep.
    Sleep,
    /// Activities.
    Activity,
    /// Personal care.
    Care,
    /// Medication.
    Medication,
    /// Anything else.
    Other,
}

impl Category {
    /// All categories in grid order.
    pub const ALL: [Category; 10] = [
        Self::Seizure,
        Self::Expression,
        Self::Vital,
        Self::Meal,
        Self::Excretion,
        Self::Sleep,
        Self::Activity,
        Self::Care,
        Self::Medication,
        Self::Other,
    ];

    /// Stable identifier used in storage keys and records.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Seizure => "seizure",
            Self::Expression => "expression",
            Self::Vital => "vital",
            Self::Meal => "meal",
            Self::Excretion => "excretion",
            Self::Sleep => "sleep",
            Self::Activity => "activity",
            Self::Care => "care",
            Self::Medication => "medication",
            Self::Other => "other",
        }
    }

    /// Default display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Seizure => "発作",
            Self::Expression => "表情・反応",
            Self::Vital => "バイタル",
            Self::Meal => "食事・水分",
            Self::Excretion => "排泄",
            Self::Sleep => "睡眠",
            Self::Activity => "活動",
            Self::Care => "ケア",
            Self::Medication => "服薬",
            Self::Other => "その他",
        }
    }

    /// Default grid icon.
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Seizure => "⚡",
            Self::Expression => "😊",
            Self::Vital => "🌡️",
            Self::Meal => "🍽️",
            Self::Excretion => "🚽",
            Self::Sleep => "😴",
            Self::Activity => "🎯",
            Self::Care => "🤲",
            Self::Medication => "💊",
            Self::Other => "📝",
        }
    }

    /// Default grid color.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Seizure => "bg-red-500",
            Self::Expression => "bg-blue-500",
            Self::Vital => "bg-green-500",
            Self::Meal => "bg-orange-500",
            Self::Excretion => "bg-purple-500",
            Self::Sleep => "bg-indigo-500",
            Self::Activity => "bg-teal-500",
            Self::Care => "bg-pink-500",
            Self::Medication => "bg-cyan-500",
            Self::Other => "bg-gray-500",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.id() == s)
            .ok_or_else(|| Error::UnknownCategory(s.to_string()))
    }
}

/// One entry of the category grid as shown to staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Category identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Grid icon.
    #[serde(default)]
    pub icon: String,
    /// Grid color.
    #[serde(default)]
    pub color: String,
}

impl From<Category> for CategoryDef {
    fn from(category: Category) -> Self {
        Self {
            id: category.id().to_string(),
            name: category.name().to_string(),
            icon: category.icon().to_string(),
            color: category.color().to_string(),
        }
    }
}

/// The category grid: which categories are offered, in which order, under which names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCatalog {
    entries: Vec<CategoryDef>,
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self {
            entries: Category::ALL.into_iter().map(CategoryDef::from).collect(),
        }
    }
}

impl CategoryCatalog {
    /// Build a catalog from edited entries.
    ///
    /// Entries with ids outside the ten known categories and repeated ids are
    /// dropped. Missing icons and colors are filled in. An empty result falls
    /// back to the default catalog.
    #[must_use]
    pub fn from_entries(entries: Vec<CategoryDef>) -> Self {
        let mut kept: Vec<CategoryDef> = Vec::with_capacity(entries.len());
        for (index, mut entry) in entries.into_iter().enumerate() {
            let Ok(category) = entry.id.parse::<Category>() else {
                warn!("Dropping category entry with unknown id '{}'", entry.id);
                continue;
            };
            if kept.iter().any(|k| k.id == entry.id) {
                continue;
            }
            if entry.name.trim().is_empty() {
                entry.name = category.name().to_string();
            }
            if entry.icon.is_empty() {
                entry.icon = FALLBACK_ICON.to_string();
            }
            if entry.color.is_empty() {
                entry.color = Category::ALL[index % Category::ALL.len()]
                    .color()
                    .to_string();
            }
            kept.push(entry);
        }

        if kept.is_empty() {
            return Self::default();
        }
        Self { entries: kept }
    }

    /// Load the catalog from `store`.
    ///
    /// A missing key yields the default catalog. A corrupt value is logged
    /// and also yields the default catalog.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store itself cannot be read.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        match kv::read_json::<Vec<CategoryDef>>(store, CUSTOM_CATEGORIES_KEY) {
            Ok(Some(entries)) => Ok(Self::from_entries(entries)),
            Ok(None) => Ok(Self::default()),
            Err(Error::Json(e)) => {
                warn!("Ignoring corrupt category list: {e}");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Persist the catalog to `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        kv::write_json(store, CUSTOM_CATEGORIES_KEY, &self.entries)
    }

    /// Grid entries in order.
    #[must_use]
    pub fn entries(&self) -> &[CategoryDef] {
        &self.entries
    }

    /// Categories offered, in grid order.
    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        self.entries
            .iter()
            .filter_map(|entry| entry.id.parse().ok())
            .collect()
    }

    /// Whether `category` is offered.
    #[must_use]
    pub fn contains(&self, category: Category) -> bool {
        self.entries.iter().any(|entry| entry.id == category.id())
    }

    /// Display name of `category`, falling back to its default name.
    #[must_use]
    pub fn name_of(&self, category: Category) -> &str {
        self.entries
            .iter()
            .find(|entry| entry.id == category.id())
            .map_or(category.name(), |entry| entry.name.as_str())
    }
}
