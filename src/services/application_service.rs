use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::user::ROLE_ADMIN;
use crate::models::application::{is_valid_status, Application, ApplicationWithJob};
use crate::services::conversation_service::ConversationService;
use crate::services::email_service::EmailService;
use crate::utils::email_templates;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateApplication {
    pub job_id: Uuid,
    #[validate(length(min = 1, message = "Please provide resume URL"))]
    pub resume: String,
    #[validate(length(max = 1000, message = "Cover letter cannot exceed 1000 characters"))]
    pub cover_letter: Option<String>,
}

#[derive(Clone)]
pub struct ApplicationService {
    pool: PgPool,
    conversations: ConversationService,
    email: EmailService,
}

impl ApplicationService {
    pub fn new(pool: PgPool, conversations: ConversationService, email: EmailService) -> Self {
        Self {
            pool,
            conversations,
            email,
        }
    }

    /// Submit an application. The (job, applicant) pair is unique; a second
    /// submission maps the unique violation to Conflict. Conversation
    /// creation and the confirmation email are best-effort side effects
    /// that never fail the submission.
    pub async fn create(
        &self,
        applicant_id: Uuid,
        payload: CreateApplication,
    ) -> Result<Application> {
        payload.validate()?;

        let job = sqlx::query_as::<_, (Uuid, String, String, String)>(
            r#"
            SELECT j.employer_id, j.title, e.name, a.email
            FROM jobs j
            JOIN users e ON e.id = j.employer_id
            JOIN users a ON a.id = $2
            WHERE j.id = $1
            "#,
        )
        .bind(payload.job_id)
        .bind(applicant_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((employer_id, job_title, employer_name, applicant_email)) = job else {
            return Err(Error::NotFound("Job not found".to_string()));
        };

        let application = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (job_id, applicant_id, resume, cover_letter)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(payload.job_id)
        .bind(applicant_id)
        .bind(&payload.resume)
        .bind(&payload.cover_letter)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match Error::from(err) {
            Error::Conflict(_) => {
                Error::Conflict("You have already applied for this job".to_string())
            }
            other => other,
        })?;

        if let Err(e) = self
            .conversations
            .create_if_missing(application.id, applicant_id, employer_id)
            .await
        {
            tracing::error!(error = ?e, application_id = %application.id,
                "failed to create conversation for application");
        }

        let applicant_name = self.user_name(applicant_id).await.unwrap_or_default();
        self.email.send_in_background(
            applicant_email,
            "Application Submitted Successfully!".to_string(),
            email_templates::application_confirmation(&applicant_name, &job_title, &employer_name),
        );

        Ok(application)
    }

    pub async fn list_mine(&self, applicant_id: Uuid) -> Result<Vec<ApplicationWithJob>> {
        let applications = sqlx::query_as::<_, ApplicationWithJob>(
            r#"
            SELECT a.id, a.job_id, a.applicant_id, a.resume, a.cover_letter, a.status,
                   a.applied_at, j.title AS job_title, j.location AS job_location,
                   j.employer_id, e.name AS employer_name,
                   u.name AS applicant_name, u.email AS applicant_email
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            JOIN users e ON e.id = j.employer_id
            JOIN users u ON u.id = a.applicant_id
            WHERE a.applicant_id = $1
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(applicant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(applications)
    }

    pub async fn list_for_job(
        &self,
        job_id: Uuid,
        requester_id: Uuid,
        requester_role: &str,
    ) -> Result<Vec<ApplicationWithJob>> {
        let job = sqlx::query_as::<_, (Uuid,)>(r#"SELECT employer_id FROM jobs WHERE id = $1"#)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;

        if job.0 != requester_id && requester_role != ROLE_ADMIN {
            return Err(Error::Forbidden(
                "Not authorized to view these applications".to_string(),
            ));
        }

        let applications = sqlx::query_as::<_, ApplicationWithJob>(
            r#"
            SELECT a.id, a.job_id, a.applicant_id, a.resume, a.cover_letter, a.status,
                   a.applied_at, j.title AS job_title, j.location AS job_location,
                   j.employer_id, e.name AS employer_name,
                   u.name AS applicant_name, u.email AS applicant_email
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            JOIN users e ON e.id = j.employer_id
            JOIN users u ON u.id = a.applicant_id
            WHERE a.job_id = $1
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(applications)
    }

    pub async fn get(
        &self,
        id: Uuid,
        requester_id: Uuid,
        requester_role: &str,
    ) -> Result<ApplicationWithJob> {
        let application = self.fetch_with_job(id).await?;

        if application.applicant_id != requester_id
            && application.employer_id != requester_id
            && requester_role != ROLE_ADMIN
        {
            return Err(Error::Forbidden(
                "Not authorized to view this application".to_string(),
            ));
        }
        Ok(application)
    }

    /// Status updates are permissive: any valid status value may be set in
    /// any order by the employer or an admin.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: &str,
        requester_id: Uuid,
        requester_role: &str,
    ) -> Result<Application> {
        if !is_valid_status(status) {
            return Err(Error::BadRequest(format!(
                "Invalid application status: {}",
                status
            )));
        }

        let current = self.fetch_with_job(id).await?;
        if current.employer_id != requester_id && requester_role != ROLE_ADMIN {
            return Err(Error::Forbidden(
                "Not authorized to update this application".to_string(),
            ));
        }

        let application = sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        self.email.send_in_background(
            current.applicant_email,
            format!("Application Status Update: {}", current.job_title),
            email_templates::application_status_update(
                &current.applicant_name,
                &current.job_title,
                status,
                &current.employer_name,
            ),
        );

        Ok(application)
    }

    pub async fn delete(&self, id: Uuid, requester_id: Uuid, requester_role: &str) -> Result<()> {
        let application = self.fetch_with_job(id).await?;

        if application.applicant_id != requester_id && requester_role != ROLE_ADMIN {
            return Err(Error::Forbidden(
                "Not authorized to delete this application".to_string(),
            ));
        }

        sqlx::query(r#"DELETE FROM applications WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fetch_with_job(&self, id: Uuid) -> Result<ApplicationWithJob> {
        sqlx::query_as::<_, ApplicationWithJob>(
            r#"
            SELECT a.id, a.job_id, a.applicant_id, a.resume, a.cover_letter, a.status,
                   a.applied_at, j.title AS job_title, j.location AS job_location,
                   j.employer_id, e.name AS employer_name,
                   u.name AS applicant_name, u.email AS applicant_email
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            JOIN users e ON e.id = j.employer_id
            JOIN users u ON u.id = a.applicant_id
            WHERE a.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".to_string()))
    }

    async fn user_name(&self, user_id: Uuid) -> Result<String> {
        let (name,) =
            sqlx::query_as::<_, (String,)>(r#"SELECT name FROM users WHERE id = $1"#)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(resume: &str, cover_letter: Option<String>) -> CreateApplication {
        CreateApplication {
            job_id: Uuid::new_v4(),
            resume: resume.to_string(),
            cover_letter,
        }
    }

    #[test]
    fn cover_letter_at_the_cap_is_accepted() {
        let p = payload("https://cdn/resume.pdf", Some("x".repeat(1000)));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn cover_letter_over_the_cap_is_rejected() {
        let p = payload("https://cdn/resume.pdf", Some("x".repeat(1001)));
        assert!(p.validate().is_err());
    }

    #[test]
    fn cover_letter_is_optional() {
        assert!(payload("https://cdn/resume.pdf", None).validate().is_ok());
    }

    #[test]
    fn empty_resume_is_rejected() {
        assert!(payload("", None).validate().is_err());
    }
}
