use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const COVER_LETTER_MAX_LEN: usize = 1000;

/// Settable by employer/admin in any order; no transition graph is
/// enforced on purpose.
pub const STATUSES: [&str; 6] = [
    "pending",
    "reviewing",
    "shortlisted",
    "interviewing",
    "selected",
    "rejected",
];

pub fn is_valid_status(status: &str) -> bool {
    STATUSES.contains(&status)
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub resume: String,
    pub cover_letter: Option<String>,
    pub status: String,
    pub applied_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Read-side join used by list endpoints: application plus the job and
/// applicant columns the UI shows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationWithJob {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub resume: String,
    pub cover_letter: Option<String>,
    pub status: String,
    pub applied_at: DateTime<Utc>,
    pub job_title: String,
    pub job_location: Option<String>,
    pub employer_id: Uuid,
    pub employer_name: String,
    pub applicant_name: String,
    pub applicant_email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_allow_list() {
        assert!(is_valid_status("pending"));
        assert!(is_valid_status("selected"));
        assert!(!is_valid_status("hired"));
        assert!(!is_valid_status(""));
        assert!(!is_valid_status("Pending"));
    }
}
