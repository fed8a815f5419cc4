//! Append-only activity telemetry records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

/// Activity types understood by the activity tracking service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ActivityType {
    Start,
    Resume,
    Pause,
    Seek,
    SpeedChange,
    QualityChange,
    Complete,
}

/// A playback-affecting action and its metadata
///
/// Serialized adjacently as `{"activityType": "...", "metadata": {...}}` so
/// it flattens straight into the service payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "activityType",
    content = "metadata",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Activity {
    Start { position: f64 },
    Resume { position: f64 },
    Pause { position: f64 },
    Seek { from_time: f64, to_time: f64 },
    SpeedChange { from_speed: f64, to_speed: f64 },
    QualityChange { from_quality: String, to_quality: String },
    Complete { duration: f64 },
}

impl Activity {
    pub fn activity_type(&self) -> ActivityType {
        match self {
            Activity::Start { .. } => ActivityType::Start,
            Activity::Resume { .. } => ActivityType::Resume,
            Activity::Pause { .. } => ActivityType::Pause,
            Activity::Seek { .. } => ActivityType::Seek,
            Activity::SpeedChange { .. } => ActivityType::SpeedChange,
            Activity::QualityChange { .. } => ActivityType::QualityChange,
            Activity::Complete { .. } => ActivityType::Complete,
        }
    }

    /// `start` for a lesson that has not been played yet, `resume` otherwise.
    /// Decided from the position at the moment play is issued.
    pub fn play_from(position: f64) -> Self {
        if position > 0.0 {
            Activity::Resume { position }
        } else {
            Activity::Start { position: 0.0 }
        }
    }
}

/// Identity of one viewing session of one lesson
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub student_id: String,
    pub session_id: Uuid,
    pub lesson_id: String,
}

impl SessionContext {
    pub fn new(student_id: impl Into<String>, lesson_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            session_id: Uuid::new_v4(),
            lesson_id: lesson_id.into(),
        }
    }
}

/// Immutable telemetry record, posted as-is to the activity service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub student_id: String,
    pub session_id: Uuid,
    pub lesson_id: String,
    #[serde(flatten)]
    pub activity: Activity,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(context: &SessionContext, activity: Activity) -> Self {
        Self {
            student_id: context.student_id.clone(),
            session_id: context.session_id,
            lesson_id: context.lesson_id.clone(),
            activity,
            timestamp: Utc::now(),
        }
    }

    pub fn activity_type(&self) -> ActivityType {
        self.activity.activity_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seek_event_payload_shape() {
        let context = SessionContext::new("student-1", "lesson-9");
        let event = ActivityEvent::new(
            &context,
            Activity::Seek {
                from_time: 50.0,
                to_time: 60.0,
            },
        );
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["studentId"], "student-1");
        assert_eq!(value["lessonId"], "lesson-9");
        assert_eq!(value["activityType"], "seek");
        assert_eq!(value["metadata"], json!({"fromTime": 50.0, "toTime": 60.0}));
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_change_metadata_uses_from_to_keys() {
        let value = serde_json::to_value(Activity::SpeedChange {
            from_speed: 1.0,
            to_speed: 1.5,
        })
        .unwrap();
        assert_eq!(value["activityType"], "speed_change");
        assert_eq!(value["metadata"], json!({"fromSpeed": 1.0, "toSpeed": 1.5}));

        let value = serde_json::to_value(Activity::QualityChange {
            from_quality: "auto".into(),
            to_quality: "720p".into(),
        })
        .unwrap();
        assert_eq!(
            value["metadata"],
            json!({"fromQuality": "auto", "toQuality": "720p"})
        );
    }

    #[test]
    fn test_start_or_resume_is_point_in_time() {
        assert_eq!(Activity::play_from(0.0).activity_type(), ActivityType::Start);
        assert_eq!(Activity::play_from(0.01).activity_type(), ActivityType::Resume);
    }

    #[test]
    fn test_activity_type_strings() {
        assert_eq!(ActivityType::SpeedChange.to_string(), "speed_change");
        assert_eq!(
            "quality_change".parse::<ActivityType>().unwrap(),
            ActivityType::QualityChange
        );
    }
}
