//! Category-specific event payloads.
//!
//! Each category has its own payload shape. [`EventPayload`] tags a payload
//! with its category so that validation and encoding are exhaustive matches.
//!
//! Decoding is lenient: missing fields take their defaults and unknown fields
//! are kept in `extra`, so records written by older forms still load. The
//! strict checks live in [`EventPayload::validate`], which runs on submission.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::category::Category;
use crate::error::{Error, Result};

/// Seizure observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeizurePayload {
    /// Kind of seizure (e.g. 強直間代, 欠神).
    pub seizure_type: String,
    /// Duration in seconds.
    pub duration_seconds: u32,
    /// Severity as noted by staff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    /// Observed symptoms.
    pub symptoms: Vec<String>,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Fields not known to this version.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Facial expression or reaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionPayload {
    /// Observed expression.
    pub expression: String,
    /// What the resident reacted to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Fields not known to this version.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Vital sign measurements. At least one measurement is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalPayload {
    /// Systolic blood pressure (mmHg).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systolic: Option<u16>,
    /// Diastolic blood pressure (mmHg).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diastolic: Option<u16>,
    /// Pulse (bpm).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse: Option<u16>,
    /// Body temperature (°C).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Oxygen saturation (%).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spo2: Option<u8>,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Fields not known to this version.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Meal and fluid intake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealPayload {
    /// Which meal (朝食, 昼食, おやつ, 夕食, 水分).
    pub meal_type: String,
    /// Share of the meal eaten, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intake_percent: Option<u8>,
    /// Fluid taken, in millilitres.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fluid_ml: Option<u32>,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Fields not known to this version.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Toileting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcretionPayload {
    /// Urine, stool, or both.
    pub kind: String,
    /// Amount as noted by staff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    /// Stool consistency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency: Option<String>,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Fields not known to this version.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Sleep period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepPayload {
    /// Time the resident fell asleep, `HH:MM`.
    pub start_time: String,
    /// Time the resident woke up, `HH:MM`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Sleep quality as noted by staff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Fields not known to this version.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Activity participation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityPayload {
    /// Name of the activity.
    pub activity: String,
    /// How the resident took part.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participation: Option<String>,
    /// Duration in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Fields not known to this version.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Personal care given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarePayload {
    /// Kinds of care given (体位変換, 吸引, 口腔ケア, ...).
    pub care_types: Vec<String>,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Fields not known to this version.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Medication administered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicationPayload {
    /// Name of the medication.
    pub medication: String,
    /// Dosage as prescribed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    /// Time given, `HH:MM`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Whether the dose was actually taken.
    pub administered: bool,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Fields not known to this version.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Anything that fits no other category. The notes are the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherPayload {
    /// Optional heading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Fields not known to this version.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A payload tagged with its category.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// See [`SeizurePayload`].
    Seizure(SeizurePayload),
    /// See [`ExpressionPayload`].
    Expression(ExpressionPayload),
    /// See [`VitalPayload`].
    Vital(VitalPayload),
    /// See [`MealPayload`].
    Meal(MealPayload),
    /// See [`ExcretionPayload`].
    Excretion(ExcretionPayload),
    /// See [`SleepPayload`].
    Sleep(SleepPayload),
    /// See [`ActivityPayload`].
    Activity(ActivityPayload),
    /// See [`CarePayload`].
    Care(CarePayload),
    /// See [`MedicationPayload`].
    Medication(MedicationPayload),
    /// See [`OtherPayload`].
    Other(OtherPayload),
}

impl EventPayload {
    /// The category this payload belongs to.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Self::Seizure(_) => Category::Seizure,
            Self::Expression(_) => Category::Expression,
            Self::Vital(_) => Category::Vital,
            Self::Meal(_) => Category::Meal,
            Self::Excretion(_) => Category::Excretion,
            Self::Sleep(_) => Category::Sleep,
            Self::Activity(_) => Category::Activity,
            Self::Care(_) => Category::Care,
            Self::Medication(_) => Category::Medication,
            Self::Other(_) => Category::Other,
        }
    }

    /// The payload's notes, or an empty string.
    #[must_use]
    pub fn notes(&self) -> &str {
        let notes = match self {
            Self::Seizure(p) => &p.notes,
            Self::Expression(p) => &p.notes,
            Self::Vital(p) => &p.notes,
            Self::Meal(p) => &p.notes,
            Self::Excretion(p) => &p.notes,
            Self::Sleep(p) => &p.notes,
            Self::Activity(p) => &p.notes,
            Self::Care(p) => &p.notes,
            Self::Medication(p) => &p.notes,
            Self::Other(p) => &p.notes,
        };
        notes.as_deref().unwrap_or_default()
    }

    /// Form-level checks for the payload's category.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPayload`] describing the first failed check.
    pub fn validate(&self) -> Result<()> {
        let category = self.category().id();
        match self {
            Self::Seizure(p) => {
                require_text(category, "seizure_type", &p.seizure_type)?;
                check_range(category, "duration_seconds", p.duration_seconds, 0, 3600)
            }
            Self::Expression(p) => require_text(category, "expression", &p.expression),
            Self::Vital(p) => validate_vital(p),
            Self::Meal(p) => {
                if let Some(percent) = p.intake_percent {
                    check_range(category, "intake_percent", percent, 0, 100)?;
                }
                if let Some(fluid) = p.fluid_ml {
                    check_range(category, "fluid_ml", fluid, 0, 5000)?;
                }
                require_text(category, "meal_type", &p.meal_type)
            }
            Self::Excretion(p) => require_text(category, "kind", &p.kind),
            Self::Sleep(p) => {
                check_time(category, "start_time", &p.start_time)?;
                if let Some(end) = &p.end_time {
                    check_time(category, "end_time", end)?;
                }
                Ok(())
            }
            Self::Activity(p) => {
                require_text(category, "activity", &p.activity)?;
                if let Some(minutes) = p.duration_minutes {
                    check_range(category, "duration_minutes", minutes, 0, 1440)?;
                }
                Ok(())
            }
            Self::Care(p) => {
                if p.care_types.iter().all(|t| t.trim().is_empty()) {
                    return Err(Error::invalid_payload(
                        category,
                        "at least one care type is required",
                    ));
                }
                Ok(())
            }
            Self::Medication(p) => {
                require_text(category, "medication", &p.medication)?;
                if let Some(time) = &p.time {
                    check_time(category, "time", time)?;
                }
                Ok(())
            }
            Self::Other(p) => require_text(category, "notes", p.notes.as_deref().unwrap_or("")),
        }
    }

    /// Encode the payload's fields as the record's `data` object.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_data(&self) -> Result<Value> {
        let value = match self {
            Self::Seizure(p) => serde_json::to_value(p)?,
            Self::Expression(p) => serde_json::to_value(p)?,
            Self::Vital(p) => serde_json::to_value(p)?,
            Self::Meal(p) => serde_json::to_value(p)?,
            Self::Excretion(p) => serde_json::to_value(p)?,
            Self::Sleep(p) => serde_json::to_value(p)?,
            Self::Activity(p) => serde_json::to_value(p)?,
            Self::Care(p) => serde_json::to_value(p)?,
            Self::Medication(p) => serde_json::to_value(p)?,
            Self::Other(p) => serde_json::to_value(p)?,
        };
        Ok(value)
    }

    /// Decode a record's `data` object as the payload of `category`.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is not an object of the category's shape.
    pub fn from_data(category: Category, data: Value) -> Result<Self> {
        let payload = match category {
            Category::Seizure => Self::Seizure(serde_json::from_value(data)?),
            Category::Expression => Self::Expression(serde_json::from_value(data)?),
            Category::Vital => Self::Vital(serde_json::from_value(data)?),
            Category::Meal => Self::Meal(serde_json::from_value(data)?),
            Category::Excretion => Self::Excretion(serde_json::from_value(data)?),
            Category::Sleep => Self::Sleep(serde_json::from_value(data)?),
            Category::Activity => Self::Activity(serde_json::from_value(data)?),
            Category::Care => Self::Care(serde_json::from_value(data)?),
            Category::Medication => Self::Medication(serde_json::from_value(data)?),
            Category::Other => Self::Other(serde_json::from_value(data)?),
        };
        Ok(payload)
    }
}

fn validate_vital(p: &VitalPayload) -> Result<()> {
    let category = Category::Vital.id();
    if p.systolic.is_none()
        && p.diastolic.is_none()
        && p.pulse.is_none()
        && p.temperature.is_none()
        && p.spo2.is_none()
    {
        return Err(Error::invalid_payload(
            category,
            "at least one measurement is required",
        ));
    }
    if let Some(systolic) = p.systolic {
        check_range(category, "systolic", systolic, 40, 300)?;
    }
    if let Some(diastolic) = p.diastolic {
        check_range(category, "diastolic", diastolic, 20, 200)?;
    }
    if let (Some(systolic), Some(diastolic)) = (p.systolic, p.diastolic) {
        if systolic <= diastolic {
            return Err(Error::invalid_payload(
                category,
                format!("systolic ({systolic}) must be greater than diastolic ({diastolic})"),
            ));
        }
    }
    if let Some(pulse) = p.pulse {
        check_range(category, "pulse", pulse, 20, 300)?;
    }
    if let Some(temperature) = p.temperature {
        if !(30.0..=45.0).contains(&temperature) {
            return Err(Error::invalid_payload(
                category,
                format!("temperature {temperature} is outside 30.0..=45.0"),
            ));
        }
    }
    if let Some(spo2) = p.spo2 {
        check_range(category, "spo2", spo2, 50, 100)?;
    }
    Ok(())
}

fn require_text(category: &'static str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_payload(
            category,
            format!("{field} must not be empty"),
        ));
    }
    Ok(())
}

fn check_range<T>(category: &'static str, field: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(Error::invalid_payload(
            category,
            format!("{field} {value} is outside {min}..={max}"),
        ));
    }
    Ok(())
}

fn check_time(category: &'static str, field: &str, value: &str) -> Result<()> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map(|_| ())
        .map_err(|_| Error::invalid_payload(category, format!("{field} '{value}' is not HH:MM")))
}
