use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::conversation::{Conversation, ConversationView, Participant};
use crate::models::message::Message;

#[derive(Clone)]
pub struct ConversationService {
    pool: PgPool,
}

impl ConversationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get or create the conversation bound to an application. Safe under
    /// concurrent first access from both participants: the unique index on
    /// application_id plus ON CONFLICT DO NOTHING makes the losing writer
    /// fall through to the re-select.
    pub async fn get_or_create(
        &self,
        application_id: Uuid,
        requester_id: Uuid,
    ) -> Result<ConversationView> {
        let parties = sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"
            SELECT a.applicant_id, j.employer_id
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE a.id = $1
            "#,
        )
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((applicant_id, employer_id)) = parties else {
            return Err(Error::NotFound("Application not found".to_string()));
        };

        if requester_id != applicant_id && requester_id != employer_id {
            return Err(Error::Forbidden(
                "Not authorized to access this conversation".to_string(),
            ));
        }

        self.create_if_missing(application_id, applicant_id, employer_id)
            .await?;

        let conversation = sqlx::query_as::<_, Conversation>(
            r#"SELECT * FROM conversations WHERE application_id = $1"#,
        )
        .bind(application_id)
        .fetch_one(&self.pool)
        .await?;

        self.populate(conversation).await
    }

    /// Best-effort creation path shared with application submission. Never
    /// errors on a pre-existing conversation for the same application.
    pub async fn create_if_missing(
        &self,
        application_id: Uuid,
        applicant_id: Uuid,
        employer_id: Uuid,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO conversations (application_id)
            VALUES ($1)
            ON CONFLICT (application_id) DO NOTHING
            "#,
        )
        .bind(application_id)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO conversation_participants (conversation_id, user_id)
            SELECT c.id, u.user_id
            FROM conversations c
            CROSS JOIN (VALUES ($2::uuid), ($3::uuid)) AS u(user_id)
            WHERE c.application_id = $1
            ON CONFLICT (conversation_id, user_id) DO NOTHING
            "#,
        )
        .bind(application_id)
        .bind(applicant_id)
        .bind(employer_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All conversations the user participates in, most recently updated
    /// first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ConversationView>> {
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT c.*
            FROM conversations c
            JOIN conversation_participants cp ON cp.conversation_id = c.id
            WHERE cp.user_id = $1
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut views = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            views.push(self.populate(conversation).await?);
        }
        Ok(views)
    }

    pub async fn is_participant(&self, conversation_id: Uuid, user_id: Uuid) -> Result<bool> {
        let row = sqlx::query_as::<_, (i32,)>(
            r#"
            SELECT 1 FROM conversation_participants
            WHERE conversation_id = $1 AND user_id = $2
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    pub async fn participants(&self, conversation_id: Uuid) -> Result<Vec<Participant>> {
        let participants = sqlx::query_as::<_, Participant>(
            r#"
            SELECT cp.user_id, u.name, u.email, u.avatar_url, cp.unread_count
            FROM conversation_participants cp
            JOIN users u ON u.id = cp.user_id
            WHERE cp.conversation_id = $1
            ORDER BY u.name
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(participants)
    }

    async fn populate(&self, conversation: Conversation) -> Result<ConversationView> {
        let participants = self.participants(conversation.id).await?;

        let last_message = match conversation.last_message_id {
            Some(message_id) => {
                sqlx::query_as::<_, Message>(r#"SELECT * FROM messages WHERE id = $1"#)
                    .bind(message_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        let (job_title,) = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT j.title
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE a.id = $1
            "#,
        )
        .bind(conversation.application_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ConversationView {
            id: conversation.id,
            application_id: conversation.application_id,
            job_title,
            participants,
            last_message,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        })
    }
}
