//! The structured daily log envelope handed to the directory.
//!
//! Most fields are fixed placeholders; the observation itself travels in
//! `special_notes[0].details` as a JSON string.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::RecorderConfig;
use crate::error::Result;
use crate::payload::EventPayload;
use crate::record::format_timestamp;
use crate::resident::ResidentId;

/// Placeholder for fields the recorder does not collect.
pub const NOT_RECORDED: &str = "記録なし";

/// Who is writing the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderIdentity {
    /// Staff identifier.
    pub staff_id: String,
    /// Staff display name.
    pub recorder_name: String,
}

impl Default for RecorderIdentity {
    fn default() -> Self {
        Self::from(&RecorderConfig::default())
    }
}

impl From<&RecorderConfig> for RecorderIdentity {
    fn from(config: &RecorderConfig) -> Self {
        Self {
            staff_id: config.staff_id.clone(),
            recorder_name: config.recorder_name.clone(),
        }
    }
}

/// Meal intake summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealIntake {
    /// 朝食.
    pub breakfast: String,
    /// 昼食.
    pub lunch: String,
    /// おやつ.
    pub snack: String,
    /// 夕食.
    pub dinner: String,
}

impl Default for MealIntake {
    fn default() -> Self {
        Self {
            breakfast: NOT_RECORDED.to_string(),
            lunch: NOT_RECORDED.to_string(),
            snack: NOT_RECORDED.to_string(),
            dinner: NOT_RECORDED.to_string(),
        }
    }
}

/// Activity summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    /// Activities taken part in.
    pub participation: Vec<String>,
    /// Mood during activities.
    pub mood: String,
    /// Notes.
    pub notes: String,
}

impl Default for ActivitySummary {
    fn default() -> Self {
        Self {
            participation: vec![NOT_RECORDED.to_string()],
            mood: NOT_RECORDED.to_string(),
            notes: String::new(),
        }
    }
}

/// One special note of a daily log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialNote {
    /// Event category id, or `general`.
    pub category: String,
    /// JSON-encoded [`NoteDetails`].
    pub details: String,
}

/// The observation embedded in a special note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDetails {
    /// Event category id.
    pub event_type: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Payload fields.
    pub data: Value,
    /// Payload notes.
    pub notes: String,
    /// Written by an authenticated admin.
    pub admin_created: bool,
}

/// A structured daily log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLog {
    /// Assigned by the directory on append.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Resident.
    #[serde(rename = "userId")]
    pub user_id: ResidentId,
    /// Staff identifier.
    pub staff_id: String,
    /// Author display name.
    pub author: String,
    /// Author identifier.
    #[serde(rename = "authorId")]
    pub author_id: String,
    /// Day the log is for.
    pub record_date: NaiveDate,
    /// Recorder display name.
    pub recorder_name: String,
    /// Weather.
    pub weather: String,
    /// Mood observations.
    pub mood: Vec<String>,
    /// Meal intake.
    pub meal_intake: MealIntake,
    /// Fluid intake in millilitres.
    pub hydration: u32,
    /// Toileting entries.
    pub toileting: Vec<String>,
    /// Activity summary.
    pub activity: ActivitySummary,
    /// Special notes.
    pub special_notes: Vec<SpecialNote>,
}

impl DailyLog {
    /// Wrap one observation in a daily log envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded.
    pub fn for_event(
        user_id: ResidentId,
        payload: &EventPayload,
        now: DateTime<Local>,
        admin_created: bool,
        identity: &RecorderIdentity,
    ) -> Result<Self> {
        let category = payload.category().id();
        let details = NoteDetails {
            event_type: category.to_string(),
            timestamp: format_timestamp(&now.with_timezone(&Utc)),
            data: payload.to_data()?,
            notes: payload.notes().to_string(),
            admin_created,
        };

        Ok(Self {
            id: None,
            user_id,
            staff_id: identity.staff_id.clone(),
            author: identity.recorder_name.clone(),
            author_id: identity.staff_id.clone(),
            record_date: now.date_naive(),
            recorder_name: identity.recorder_name.clone(),
            weather: NOT_RECORDED.to_string(),
            mood: Vec::new(),
            meal_intake: MealIntake::default(),
            hydration: 0,
            toileting: Vec::new(),
            activity: ActivitySummary::default(),
            special_notes: vec![SpecialNote {
                category: category.to_string(),
                details: serde_json::to_string(&details)?,
            }],
        })
    }

    /// Decode the details of every special note that carries an observation.
    ///
    /// Notes whose details are not valid JSON are skipped.
    #[must_use]
    pub fn note_details(&self) -> Vec<NoteDetails> {
        self.special_notes
            .iter()
            .filter_map(|note| serde_json::from_str(&note.details).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{MealPayload, VitalPayload};
    use chrono::TimeZone;

    fn vital() -> EventPayload {
        EventPayload::Vital(VitalPayload {
            systolic: Some(120),
            diastolic: Some(80),
            notes: Some("安定".to_string()),
            ..VitalPayload::default()
        })
    }

    #[test]
    fn test_for_event_placeholders() {
        let now = Local.with_ymd_and_hms(2025, 7, 11, 14, 0, 0).unwrap();
        let log = DailyLog::for_event(
            ResidentId::from("user1"),
            &vital(),
            now,
            false,
            &RecorderIdentity::default(),
        )
        .unwrap();

        assert!(log.id.is_none());
        assert_eq!(log.staff_id, "current-staff");
        assert_eq!(log.author, "記録者");
        assert_eq!(log.weather, NOT_RECORDED);
        assert_eq!(log.meal_intake.dinner, NOT_RECORDED);
        assert_eq!(log.activity.participation, vec![NOT_RECORDED.to_string()]);
        assert_eq!(log.hydration, 0);
        assert_eq!(log.record_date, NaiveDate::from_ymd_opt(2025, 7, 11).unwrap());
        assert_eq!(log.special_notes.len(), 1);
        assert_eq!(log.special_notes[0].category, "vital");
    }

    #[test]
    fn test_details_embed_the_observation() {
        let now = Local.with_ymd_and_hms(2025, 7, 11, 14, 0, 0).unwrap();
        let log = DailyLog::for_event(
            ResidentId::from("user1"),
            &vital(),
            now,
            true,
            &RecorderIdentity::default(),
        )
        .unwrap();

        let details = log.note_details();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].event_type, "vital");
        assert_eq!(details[0].data["systolic"], 120);
        assert_eq!(details[0].notes, "安定");
        assert!(details[0].admin_created);
    }

    #[test]
    fn test_camel_case_keys() {
        let now = Local.with_ymd_and_hms(2025, 7, 11, 8, 0, 0).unwrap();
        let payload = EventPayload::Meal(MealPayload {
            meal_type: "朝食".to_string(),
            ..MealPayload::default()
        });
        let identity = RecorderIdentity {
            staff_id: "s-7".to_string(),
            recorder_name: "佐藤".to_string(),
        };
        let log =
            DailyLog::for_event(ResidentId::from("user3"), &payload, now, false, &identity)
                .unwrap();

        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(value["userId"], "user3");
        assert_eq!(value["authorId"], "s-7");
        assert_eq!(value["recorder_name"], "佐藤");
        assert_eq!(value["record_date"], "2025-07-11");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_note_details_skips_plain_text() {
        let now = Local.with_ymd_and_hms(2025, 7, 11, 8, 0, 0).unwrap();
        let mut log = DailyLog::for_event(
            ResidentId::from("user1"),
            &vital(),
            now,
            false,
            &RecorderIdentity::default(),
        )
        .unwrap();
        log.special_notes.push(SpecialNote {
            category: "general".to_string(),
            details: "手書きメモ".to_string(),
        });
        assert_eq!(log.note_details().len(), 1);
    }
}
