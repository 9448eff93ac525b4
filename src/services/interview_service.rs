use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::interview::{
    application_status_for, is_terminal, is_valid_recommendation, is_valid_status, is_valid_type,
    join_window_open, room_id_for, Feedback, Interview, InterviewView, RescheduleEntry, STATUS_CANCELLED,
    STATUS_COMPLETED, STATUS_IN_PROGRESS, STATUS_RESCHEDULED, STATUS_SCHEDULED,
};
use crate::models::user::{UserSummary, ROLE_ADMIN, ROLE_EMPLOYER, ROLE_JOBSEEKER};
use crate::services::email_service::EmailService;
use crate::services::rtc_service::RtcService;
use crate::utils::email_templates;

#[derive(Debug, Deserialize)]
pub struct ScheduleInterview {
    pub application_id: Uuid,
    pub scheduled_date: DateTime<Utc>,
    pub duration: Option<i32>,
    #[serde(rename = "type")]
    pub interview_type: Option<String>,
    pub notes: Option<String>,
    pub agenda: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InterviewFilter {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub interview_type: Option<String>,
    pub upcoming: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitFeedback {
    pub rating: i32,
    pub technical_skills: i32,
    pub communication: i32,
    pub problem_solving: i32,
    pub culture_fit: i32,
    pub comments: Option<String>,
    pub recommendation: String,
}

#[derive(Debug, Serialize)]
pub struct JoinToken {
    pub token: String,
    pub app_id: String,
    pub room_id: String,
    pub uid: u32,
}

/// Visibility scope for interview listings. Only an explicit admin role
/// gets the unrestricted view; an empty or unknown role string from the
/// token falls back to interviews the caller is party to.
fn list_scope(role: &str) -> &'static str {
    match role {
        r if r == ROLE_ADMIN => "all",
        r if r == ROLE_JOBSEEKER => "candidate",
        r if r == ROLE_EMPLOYER => "interviewer",
        _ => "own",
    }
}

#[derive(Clone)]
pub struct InterviewService {
    pool: PgPool,
    rtc: RtcService,
    email: EmailService,
}

impl InterviewService {
    pub fn new(pool: PgPool, rtc: RtcService, email: EmailService) -> Self {
        Self { pool, rtc, email }
    }

    /// Schedule an interview from an application. Only the employer owning
    /// the application's job (or an admin) may schedule. Video interviews
    /// get a unique room identifier derived from the interview id and the
    /// creation instant.
    pub async fn schedule(
        &self,
        requester_id: Uuid,
        requester_role: &str,
        payload: ScheduleInterview,
    ) -> Result<Interview> {
        let interview_type = payload
            .interview_type
            .unwrap_or_else(|| "video".to_string());
        if !is_valid_type(&interview_type) {
            return Err(Error::BadRequest(format!(
                "Invalid interview type: {}",
                interview_type
            )));
        }

        let parties = sqlx::query_as::<_, (Uuid, Uuid, Uuid, String, String, String)>(
            r#"
            SELECT a.job_id, a.applicant_id, j.employer_id, j.title, u.name, u.email
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            JOIN users u ON u.id = a.applicant_id
            WHERE a.id = $1
            "#,
        )
        .bind(payload.application_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((job_id, candidate_id, employer_id, job_title, candidate_name, candidate_email)) =
            parties
        else {
            return Err(Error::NotFound("Application not found".to_string()));
        };

        if requester_id != employer_id && requester_role != ROLE_ADMIN {
            return Err(Error::Forbidden(
                "Not authorized to schedule interview for this application".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let room_id = if interview_type == "video" {
            Some(room_id_for(id, Utc::now()))
        } else {
            None
        };
        let duration = payload.duration.unwrap_or(60);

        let interview = sqlx::query_as::<_, Interview>(
            r#"
            INSERT INTO interviews
                (id, application_id, job_id, candidate_id, interviewer_id,
                 scheduled_date, duration, interview_type, room_id, notes, agenda)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payload.application_id)
        .bind(job_id)
        .bind(candidate_id)
        .bind(requester_id)
        .bind(payload.scheduled_date)
        .bind(duration)
        .bind(&interview_type)
        .bind(&room_id)
        .bind(&payload.notes)
        .bind(&payload.agenda)
        .fetch_one(&self.pool)
        .await?;

        self.email.send_in_background(
            candidate_email,
            format!("Interview Scheduled - {}", job_title),
            email_templates::interview_scheduled(
                &candidate_name,
                &job_title,
                interview.scheduled_date,
                interview.duration,
                &interview.interview_type,
                interview.agenda.as_deref(),
            ),
        );

        Ok(interview)
    }

    /// Interviews visible to the caller: candidates see their own,
    /// employers the ones they run, admins everything. A role the service
    /// does not recognize is scoped to interviews the caller is party to,
    /// never to the full table: the role string comes from the token, not
    /// from a trusted store. Optional status, type and upcoming filters.
    pub async fn list(
        &self,
        requester_id: Uuid,
        requester_role: &str,
        filter: InterviewFilter,
    ) -> Result<Vec<InterviewView>> {
        if let Some(status) = filter.status.as_deref() {
            if !is_valid_status(status) {
                return Err(Error::BadRequest(format!(
                    "Invalid interview status: {}",
                    status
                )));
            }
        }

        let interviews = sqlx::query_as::<_, Interview>(
            r#"
            SELECT * FROM interviews
            WHERE (CASE $1
                     WHEN 'all' THEN TRUE
                     WHEN 'candidate' THEN candidate_id = $2
                     WHEN 'interviewer' THEN interviewer_id = $2
                     ELSE candidate_id = $2 OR interviewer_id = $2
                   END)
              AND ($3 = '' OR status = $3)
              AND ($4 = '' OR interview_type = $4)
              AND (NOT $5 OR (scheduled_date >= NOW()
                              AND status IN ('scheduled', 'in-progress')))
            ORDER BY scheduled_date ASC
            "#,
        )
        .bind(list_scope(requester_role))
        .bind(requester_id)
        .bind(filter.status.unwrap_or_default())
        .bind(filter.interview_type.unwrap_or_default())
        .bind(filter.upcoming.unwrap_or(false))
        .fetch_all(&self.pool)
        .await?;

        let mut views = Vec::with_capacity(interviews.len());
        for interview in interviews {
            views.push(self.populate(interview).await?);
        }
        Ok(views)
    }

    pub async fn get(
        &self,
        id: Uuid,
        requester_id: Uuid,
        requester_role: &str,
    ) -> Result<InterviewView> {
        let interview = self.fetch(id).await?;

        if interview.candidate_id != requester_id
            && interview.interviewer_id != requester_id
            && requester_role != ROLE_ADMIN
        {
            return Err(Error::Forbidden(
                "Not authorized to view this interview".to_string(),
            ));
        }
        self.populate(interview).await
    }

    /// Issue a join token for the interview's video room. Gated on
    /// participancy, cancellation and the one-hour time window; a
    /// successful issuance moves a scheduled interview to in-progress and
    /// appends a join-audit record.
    pub async fn issue_token(&self, id: Uuid, requester_id: Uuid) -> Result<JoinToken> {
        let interview = self.fetch(id).await?;

        if interview.candidate_id != requester_id && interview.interviewer_id != requester_id {
            return Err(Error::Forbidden(
                "Not authorized to join this interview".to_string(),
            ));
        }

        if interview.status == STATUS_CANCELLED {
            return Err(Error::BadRequest(
                "Interview has been cancelled".to_string(),
            ));
        }

        if !join_window_open(Utc::now(), interview.scheduled_date, &interview.status) {
            return Err(Error::TooEarly(
                "Interview can only be joined 1 hour before scheduled time".to_string(),
            ));
        }

        let Some(room_id) = interview.room_id.clone() else {
            return Err(Error::BadRequest(
                "This interview has no video room".to_string(),
            ));
        };

        let uid: u32 = rand::thread_rng().gen_range(0..100_000);
        let token = self.rtc.build_token(&room_id, uid)?;

        if interview.status == STATUS_SCHEDULED {
            sqlx::query(
                r#"UPDATE interviews SET status = $1, updated_at = NOW() WHERE id = $2"#,
            )
            .bind(STATUS_IN_PROGRESS)
            .bind(id)
            .execute(&self.pool)
            .await?;
        }

        sqlx::query(
            r#"INSERT INTO interview_participants (interview_id, user_id, joined_at) VALUES ($1, $2, NOW())"#,
        )
        .bind(id)
        .bind(requester_id)
        .execute(&self.pool)
        .await?;

        Ok(JoinToken {
            token,
            app_id: self.rtc.app_id().to_string(),
            room_id,
            uid,
        })
    }

    /// Interviewer-only. Completes the interview and writes the
    /// recommendation-driven status onto the linked application.
    pub async fn submit_feedback(
        &self,
        id: Uuid,
        requester_id: Uuid,
        payload: SubmitFeedback,
    ) -> Result<InterviewView> {
        let interview = self.fetch(id).await?;

        if interview.interviewer_id != requester_id {
            return Err(Error::Forbidden(
                "Only the interviewer can submit feedback".to_string(),
            ));
        }

        if !is_valid_recommendation(&payload.recommendation) {
            return Err(Error::BadRequest(format!(
                "Invalid recommendation: {}",
                payload.recommendation
            )));
        }
        for rating in [
            payload.rating,
            payload.technical_skills,
            payload.communication,
            payload.problem_solving,
            payload.culture_fit,
        ] {
            if !(1..=5).contains(&rating) {
                return Err(Error::BadRequest(
                    "Ratings must be between 1 and 5".to_string(),
                ));
            }
        }

        let feedback = Feedback {
            rating: payload.rating,
            technical_skills: payload.technical_skills,
            communication: payload.communication,
            problem_solving: payload.problem_solving,
            culture_fit: payload.culture_fit,
            comments: payload.comments,
            recommendation: payload.recommendation.clone(),
            submitted_by: requester_id,
            submitted_at: Utc::now(),
        };

        let interview = sqlx::query_as::<_, Interview>(
            r#"
            UPDATE interviews
            SET feedback = $1, status = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(serde_json::to_value(&feedback)?)
        .bind(STATUS_COMPLETED)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if let Some(new_status) = application_status_for(&payload.recommendation) {
            sqlx::query(
                r#"UPDATE applications SET status = $1, updated_at = NOW() WHERE id = $2"#,
            )
            .bind(new_status)
            .bind(interview.application_id)
            .execute(&self.pool)
            .await?;
        }

        self.populate(interview).await
    }

    /// Either party may reschedule a non-terminal interview. Appends a
    /// history entry, overwrites the scheduled date and leaves the
    /// interview in the `rescheduled` status (it does not return to
    /// `scheduled`).
    pub async fn reschedule(
        &self,
        id: Uuid,
        requester_id: Uuid,
        new_date: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<InterviewView> {
        let interview = self.fetch(id).await?;

        let is_candidate = interview.candidate_id == requester_id;
        let is_interviewer = interview.interviewer_id == requester_id;
        if !is_candidate && !is_interviewer {
            return Err(Error::Forbidden(
                "Not authorized to reschedule this interview".to_string(),
            ));
        }

        if is_terminal(&interview.status) {
            return Err(Error::BadRequest(format!(
                "Cannot reschedule a {} interview",
                interview.status
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO interview_reschedules
                (interview_id, old_date, new_date, reason, rescheduled_by)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(interview.scheduled_date)
        .bind(new_date)
        .bind(&reason)
        .bind(requester_id)
        .execute(&self.pool)
        .await?;

        let interview = sqlx::query_as::<_, Interview>(
            r#"
            UPDATE interviews
            SET scheduled_date = $1, status = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(new_date)
        .bind(STATUS_RESCHEDULED)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        let view = self.populate(interview).await?;

        // Notify the party who did not initiate the change.
        let recipient = if is_candidate {
            &view.interviewer
        } else {
            &view.candidate
        };
        self.email.send_in_background(
            recipient.email.clone(),
            format!("Interview Rescheduled - {}", view.job_title),
            email_templates::interview_rescheduled(
                &recipient.name,
                &view.job_title,
                new_date,
                reason.as_deref(),
            ),
        );

        Ok(view)
    }

    /// Cancellation is a status transition, never a row deletion.
    pub async fn cancel(
        &self,
        id: Uuid,
        requester_id: Uuid,
        requester_role: &str,
        reason: Option<String>,
    ) -> Result<()> {
        let interview = self.fetch(id).await?;

        if interview.interviewer_id != requester_id && requester_role != ROLE_ADMIN {
            return Err(Error::Forbidden(
                "Not authorized to cancel this interview".to_string(),
            ));
        }

        if is_terminal(&interview.status) {
            return Err(Error::BadRequest(format!(
                "Cannot cancel a {} interview",
                interview.status
            )));
        }

        let note = format!(
            "{}\nCancelled: {}",
            interview.notes.clone().unwrap_or_default(),
            reason.clone().unwrap_or_else(|| "No reason provided".to_string())
        );

        sqlx::query(
            r#"
            UPDATE interviews
            SET status = $1, notes = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(STATUS_CANCELLED)
        .bind(note)
        .bind(id)
        .execute(&self.pool)
        .await?;

        let view = self.populate(interview).await?;
        self.email.send_in_background(
            view.candidate.email.clone(),
            format!("Interview Cancelled - {}", view.job_title),
            email_templates::interview_cancelled(
                &view.candidate.name,
                &view.job_title,
                reason.as_deref(),
            ),
        );

        Ok(())
    }

    pub async fn reschedule_history(&self, id: Uuid) -> Result<Vec<RescheduleEntry>> {
        let entries = sqlx::query_as::<_, RescheduleEntry>(
            r#"
            SELECT * FROM interview_reschedules
            WHERE interview_id = $1
            ORDER BY rescheduled_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn fetch(&self, id: Uuid) -> Result<Interview> {
        sqlx::query_as::<_, Interview>(r#"SELECT * FROM interviews WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Interview not found".to_string()))
    }

    async fn populate(&self, interview: Interview) -> Result<InterviewView> {
        let candidate = self.user_summary(interview.candidate_id).await?;
        let interviewer = self.user_summary(interview.interviewer_id).await?;

        let (job_title, application_status) = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT j.title, a.status
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE a.id = $1
            "#,
        )
        .bind(interview.application_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(InterviewView {
            interview,
            candidate,
            interviewer,
            job_title,
            application_status,
        })
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_admin_role_gets_the_unrestricted_scope() {
        assert_eq!(list_scope(ROLE_ADMIN), "all");
        assert_eq!(list_scope(ROLE_JOBSEEKER), "candidate");
        assert_eq!(list_scope(ROLE_EMPLOYER), "interviewer");
    }

    #[test]
    fn missing_or_unknown_role_is_scoped_to_own_interviews() {
        // A signed token may carry no role claim at all; that must never
        // widen visibility to the whole table.
        assert_eq!(list_scope(""), "own");
        assert_eq!(list_scope("recruiter"), "own");
        assert_eq!(list_scope("Admin"), "own");
    }
}
