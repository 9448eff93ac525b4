use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user::UserSummary;

pub const STATUS_SCHEDULED: &str = "scheduled";
pub const STATUS_IN_PROGRESS: &str = "in-progress";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_RESCHEDULED: &str = "rescheduled";
pub const STATUS_NO_SHOW: &str = "no-show";

pub const STATUSES: [&str; 6] = [
    STATUS_SCHEDULED,
    STATUS_IN_PROGRESS,
    STATUS_COMPLETED,
    STATUS_CANCELLED,
    STATUS_RESCHEDULED,
    STATUS_NO_SHOW,
];

pub const TYPES: [&str; 6] = ["phone", "video", "in-person", "technical", "hr", "final"];

pub const RECOMMENDATIONS: [&str; 5] = [
    "strongly-recommend",
    "recommend",
    "neutral",
    "not-recommend",
    "strongly-not-recommend",
];

pub fn is_valid_status(status: &str) -> bool {
    STATUSES.contains(&status)
}

pub fn is_valid_type(interview_type: &str) -> bool {
    TYPES.contains(&interview_type)
}

pub fn is_valid_recommendation(recommendation: &str) -> bool {
    RECOMMENDATIONS.contains(&recommendation)
}

pub fn is_terminal(status: &str) -> bool {
    matches!(
        status,
        STATUS_COMPLETED | STATUS_CANCELLED | STATUS_NO_SHOW
    )
}

/// Join-token time gate: open when the interview is already running, or
/// when the current time is within one hour of the scheduled start.
/// Rescheduled interviews pass through the same gate as scheduled ones.
pub fn join_window_open(now: DateTime<Utc>, scheduled_date: DateTime<Utc>, status: &str) -> bool {
    if status == STATUS_IN_PROGRESS {
        return true;
    }
    scheduled_date.signed_duration_since(now) <= Duration::hours(1)
}

/// Application status mutation driven by a feedback recommendation.
/// Neutral feedback leaves the application untouched.
pub fn application_status_for(recommendation: &str) -> Option<&'static str> {
    match recommendation {
        "strongly-recommend" | "recommend" => Some("shortlisted"),
        "strongly-not-recommend" | "not-recommend" => Some("rejected"),
        _ => None,
    }
}

/// Room identifier for video interviews, generated once at creation.
pub fn room_id_for(interview_id: Uuid, created_at: DateTime<Utc>) -> String {
    format!("interview_{}_{}", interview_id, created_at.timestamp_millis())
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Interview {
    pub id: Uuid,
    pub application_id: Uuid,
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub interviewer_id: Uuid,
    pub scheduled_date: DateTime<Utc>,
    pub duration: i32,
    pub interview_type: String,
    pub status: String,
    pub room_id: Option<String>,
    pub meeting_link: Option<String>,
    pub notes: Option<String>,
    pub agenda: Option<String>,
    pub feedback: Option<JsonValue>,
    pub reminder_candidate_sent: bool,
    pub reminder_interviewer_sent: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Feedback block stored on the interview as jsonb.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: i32,
    pub technical_skills: i32,
    pub communication: i32,
    pub problem_solving: i32,
    pub culture_fit: i32,
    pub comments: Option<String>,
    pub recommendation: String,
    pub submitted_by: Uuid,
    pub submitted_at: DateTime<Utc>,
}

/// Append-only join audit record; `left_at` is never written by the
/// token path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewParticipant {
    pub id: i64,
    pub interview_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RescheduleEntry {
    pub id: i64,
    pub interview_id: Uuid,
    pub old_date: DateTime<Utc>,
    pub new_date: DateTime<Utc>,
    pub reason: Option<String>,
    pub rescheduled_by: Uuid,
    pub rescheduled_at: DateTime<Utc>,
}

/// Populated interview for read endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct InterviewView {
    #[serde(flatten)]
    pub interview: Interview,
    pub candidate: UserSummary,
    pub interviewer: UserSummary,
    pub job_title: String,
    pub application_status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(offset_minutes: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now, now + Duration::minutes(offset_minutes))
    }

    #[test]
    fn join_gate_rejects_more_than_one_hour_early() {
        let (now, scheduled) = at(61);
        assert!(!join_window_open(now, scheduled, STATUS_SCHEDULED));
    }

    #[test]
    fn join_gate_allows_fifty_nine_minutes_early() {
        let (now, scheduled) = at(59);
        assert!(join_window_open(now, scheduled, STATUS_SCHEDULED));
    }

    #[test]
    fn join_gate_allows_in_progress_regardless_of_time() {
        let (now, scheduled) = at(240);
        assert!(join_window_open(now, scheduled, STATUS_IN_PROGRESS));
    }

    #[test]
    fn join_gate_treats_rescheduled_like_scheduled() {
        let (now, soon) = at(30);
        assert!(join_window_open(now, soon, STATUS_RESCHEDULED));
        let (now, far) = at(120);
        assert!(!join_window_open(now, far, STATUS_RESCHEDULED));
    }

    #[test]
    fn join_gate_allows_past_scheduled_date() {
        let (now, past) = at(-30);
        assert!(join_window_open(now, past, STATUS_SCHEDULED));
    }

    #[test]
    fn recommendation_drives_application_status() {
        assert_eq!(application_status_for("strongly-recommend"), Some("shortlisted"));
        assert_eq!(application_status_for("recommend"), Some("shortlisted"));
        assert_eq!(application_status_for("not-recommend"), Some("rejected"));
        assert_eq!(application_status_for("strongly-not-recommend"), Some("rejected"));
        assert_eq!(application_status_for("neutral"), None);
    }

    #[test]
    fn terminal_states() {
        assert!(is_terminal(STATUS_COMPLETED));
        assert!(is_terminal(STATUS_CANCELLED));
        assert!(is_terminal(STATUS_NO_SHOW));
        assert!(!is_terminal(STATUS_SCHEDULED));
        assert!(!is_terminal(STATUS_RESCHEDULED));
        assert!(!is_terminal(STATUS_IN_PROGRESS));
    }

    #[test]
    fn room_id_embeds_interview_id_and_millis() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let room = room_id_for(id, now);
        assert!(room.starts_with("interview_"));
        assert!(room.contains(&id.to_string()));
        assert!(room.ends_with(&now.timestamp_millis().to_string()));
    }
}
