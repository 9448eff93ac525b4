use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::UserSummary;

pub const TYPE_TEXT: &str = "text";
pub const TYPE_FILE: &str = "file";
pub const TYPE_INTERVIEW: &str = "interview";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub message_type: String,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub interview_details: Option<JsonValue>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Message with the sender summary populated, as returned by send and
/// backlog-fetch.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub sender: UserSummary,
}

/// Structured payload carried by `interview` notice messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewDetails {
    pub date: Option<DateTime<Utc>>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
}

/// Per-type payload validation applied before a message is persisted.
pub fn validate_payload(
    message_type: &str,
    content: Option<&str>,
    file_url: Option<&str>,
    interview_details: Option<&InterviewDetails>,
) -> Result<()> {
    match message_type {
        TYPE_TEXT => {
            if content.map(|c| c.trim().is_empty()).unwrap_or(true) {
                return Err(Error::BadRequest("Message content is required".to_string()));
            }
        }
        TYPE_FILE => {
            if file_url.map(|u| u.is_empty()).unwrap_or(true) {
                return Err(Error::BadRequest(
                    "File messages require a file URL".to_string(),
                ));
            }
        }
        TYPE_INTERVIEW => {
            if interview_details.is_none() {
                return Err(Error::BadRequest(
                    "Interview messages require interview details".to_string(),
                ));
            }
        }
        other => {
            return Err(Error::BadRequest(format!("Unknown message type: {}", other)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_requires_non_empty_content() {
        assert!(validate_payload(TYPE_TEXT, Some("hi"), None, None).is_ok());
        assert!(validate_payload(TYPE_TEXT, Some("   "), None, None).is_err());
        assert!(validate_payload(TYPE_TEXT, None, None, None).is_err());
    }

    #[test]
    fn file_requires_url() {
        assert!(validate_payload(TYPE_FILE, None, Some("https://x/y.pdf"), None).is_ok());
        assert!(validate_payload(TYPE_FILE, Some("see attached"), None, None).is_err());
    }

    #[test]
    fn interview_requires_details() {
        let details = InterviewDetails {
            date: None,
            time: Some("10:00".to_string()),
            location: None,
            meeting_link: Some("https://meet/abc".to_string()),
        };
        assert!(validate_payload(TYPE_INTERVIEW, None, None, Some(&details)).is_ok());
        assert!(validate_payload(TYPE_INTERVIEW, None, None, None).is_err());
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(validate_payload("gif", Some("x"), None, None).is_err());
    }
}
