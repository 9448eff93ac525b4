use chrono::{DateTime, Utc};

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%A, %e %B %Y at %H:%M UTC").to_string()
}

pub fn application_confirmation(applicant_name: &str, job_title: &str, employer_name: &str) -> String {
    format!(
        r#"<h2>Application Submitted!</h2>
<p>Dear {applicant_name},</p>
<p>Your application for <strong>{job_title}</strong> at {employer_name} has been submitted successfully.</p>
<p>The employer will review your application and get back to you.</p>"#
    )
}

pub fn application_status_update(
    applicant_name: &str,
    job_title: &str,
    status: &str,
    employer_name: &str,
) -> String {
    format!(
        r#"<h2>Application Status Update</h2>
<p>Dear {applicant_name},</p>
<p>The status of your application for <strong>{job_title}</strong> at {employer_name} is now: <strong>{status}</strong>.</p>"#
    )
}

pub fn interview_scheduled(
    candidate_name: &str,
    job_title: &str,
    scheduled_date: DateTime<Utc>,
    duration: i32,
    interview_type: &str,
    agenda: Option<&str>,
) -> String {
    let agenda_line = agenda
        .map(|a| format!("<li><strong>Agenda:</strong> {a}</li>"))
        .unwrap_or_default();
    format!(
        r#"<h2>Interview Scheduled!</h2>
<p>Dear {candidate_name},</p>
<p>Your interview has been scheduled for the position of <strong>{job_title}</strong>.</p>
<h3>Interview Details:</h3>
<ul>
  <li><strong>Date &amp; Time:</strong> {}</li>
  <li><strong>Duration:</strong> {duration} minutes</li>
  <li><strong>Type:</strong> {interview_type}</li>
  {agenda_line}
</ul>
<p>You will receive a meeting link before the interview.</p>
<p>Good luck!</p>"#,
        format_date(scheduled_date)
    )
}

pub fn interview_rescheduled(
    recipient_name: &str,
    job_title: &str,
    new_date: DateTime<Utc>,
    reason: Option<&str>,
) -> String {
    let reason_line = reason
        .map(|r| format!("<p><strong>Reason:</strong> {r}</p>"))
        .unwrap_or_default();
    format!(
        r#"<h2>Interview Rescheduled</h2>
<p>Dear {recipient_name},</p>
<p>The interview for <strong>{job_title}</strong> has been rescheduled.</p>
<p><strong>New Date &amp; Time:</strong> {}</p>
{reason_line}
<p>Please confirm your availability.</p>"#,
        format_date(new_date)
    )
}

pub fn interview_cancelled(candidate_name: &str, job_title: &str, reason: Option<&str>) -> String {
    let reason_line = reason
        .map(|r| format!("<p><strong>Reason:</strong> {r}</p>"))
        .unwrap_or_default();
    format!(
        r#"<h2>Interview Cancelled</h2>
<p>Dear {candidate_name},</p>
<p>Unfortunately, the interview for <strong>{job_title}</strong> has been cancelled.</p>
{reason_line}
<p>We apologize for any inconvenience.</p>"#
    )
}
