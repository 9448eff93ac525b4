use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::message::{validate_payload, Message, MessageView, TYPE_TEXT};
use crate::models::user::UserSummary;

#[derive(Debug, serde::Deserialize)]
pub struct SendMessage {
    pub conversation_id: Uuid,
    pub content: Option<String>,
    pub message_type: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub interview_details: Option<crate::models::message::InterviewDetails>,
}

#[derive(Clone)]
pub struct MessageService {
    pool: PgPool,
}

impl MessageService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a message, bump the other participants' unread counters and
    /// the conversation's last-message pointer. The unread increment is a
    /// single atomic UPDATE so concurrent senders never lose updates.
    pub async fn send(&self, sender_id: Uuid, payload: SendMessage) -> Result<MessageView> {
        let message_type = payload
            .message_type
            .clone()
            .unwrap_or_else(|| TYPE_TEXT.to_string());

        validate_payload(
            &message_type,
            payload.content.as_deref(),
            payload.file_url.as_deref(),
            payload.interview_details.as_ref(),
        )?;

        self.ensure_participant(payload.conversation_id, sender_id, "send messages in")
            .await?;

        let interview_details = match &payload.interview_details {
            Some(details) => Some(serde_json::to_value(details)?),
            None => None,
        };

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages
                (conversation_id, sender_id, content, message_type, file_url, file_name, interview_details)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(payload.conversation_id)
        .bind(sender_id)
        .bind(&payload.content)
        .bind(&message_type)
        .bind(&payload.file_url)
        .bind(&payload.file_name)
        .bind(&interview_details)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query(
            r#"
            UPDATE conversations
            SET last_message_id = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(message.id)
        .bind(payload.conversation_id)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            UPDATE conversation_participants
            SET unread_count = unread_count + 1
            WHERE conversation_id = $1 AND user_id <> $2
            "#,
        )
        .bind(payload.conversation_id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;

        let sender = self.user_summary(sender_id).await?;
        Ok(MessageView { message, sender })
    }

    /// Backlog fetch: all messages in creation order, then flip the other
    /// side's messages to read and zero the requester's unread counter.
    /// This is the only operation that clears unread state.
    pub async fn list_and_mark_read(
        &self,
        conversation_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Vec<MessageView>> {
        self.ensure_participant(conversation_id, requester_id, "access")
            .await?;

        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE, read_at = NOW()
            WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(requester_id)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            UPDATE conversation_participants
            SET unread_count = 0
            WHERE conversation_id = $1 AND user_id = $2
            "#,
        )
        .bind(conversation_id)
        .bind(requester_id)
        .execute(&self.pool)
        .await?;

        let senders = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.name, u.email, u.avatar_url
            FROM conversation_participants cp
            JOIN users u ON u.id = cp.user_id
            WHERE cp.conversation_id = $1
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        let views = messages
            .into_iter()
            .filter_map(|message| {
                senders
                    .iter()
                    .find(|u| u.id == message.sender_id)
                    .cloned()
                    .map(|sender| MessageView { message, sender })
            })
            .collect();

        Ok(views)
    }

    /// Only the original sender may delete. Deletion does not rewrite the
    /// conversation's last-message pointer or unread counters.
    pub async fn delete(&self, message_id: Uuid, requester_id: Uuid) -> Result<()> {
        let message =
            sqlx::query_as::<_, Message>(r#"SELECT * FROM messages WHERE id = $1"#)
                .bind(message_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound("Message not found".to_string()))?;

        if message.sender_id != requester_id {
            return Err(Error::Forbidden(
                "Not authorized to delete this message".to_string(),
            ));
        }

        sqlx::query(r#"DELETE FROM messages WHERE id = $1"#)
            .bind(message_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn ensure_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        action: &str,
    ) -> Result<()> {
        let exists = sqlx::query_as::<_, (i32,)>(
            r#"SELECT 1 FROM conversations WHERE id = $1"#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        if exists.is_none() {
            return Err(Error::NotFound("Conversation not found".to_string()));
        }

        let member = sqlx::query_as::<_, (i32,)>(
            r#"
            SELECT 1 FROM conversation_participants
            WHERE conversation_id = $1 AND user_id = $2
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        if member.is_none() {
            return Err(Error::Forbidden(format!(
                "Not authorized to {} this conversation",
                action
            )));
        }
        Ok(())
    }

    async fn user_summary(&self, user_id: Uuid) -> Result<UserSummary> {
        let summary = sqlx::query_as::<_, UserSummary>(
            r#"SELECT id, name, email, avatar_url FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }
}
