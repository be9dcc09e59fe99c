//! Portal notifications built on top of the dispatcher.
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::dispatcher::{BulkReport, Dispatcher, SendOutcome, SmsError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Student {
    pub username: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Application {
    pub student: Student,
    pub company: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobPosting {
    pub id: i64,
    pub company: String,
    pub title: String,
    pub package_range: Option<String>,
}

pub fn approval_message() -> String {
    "Congratulations! Your Placement Portal account has been approved. \
     You can now view and apply for job opportunities. Good luck!"
        .to_string()
}

pub fn rejection_message() -> String {
    "Unfortunately, your registration has been rejected. \
     Please contact the placement office for more information."
        .to_string()
}

pub fn application_update_message(app: &Application) -> String {
    format!(
        "Application Update: Your status for {} has been updated to '{}'. \
         Check the portal for details.",
        app.company, app.status
    )
}

pub fn job_posting_message(job: &JobPosting) -> String {
    format!(
        "New Opportunity! {} is hiring for {}. Package: {}. Apply now on the portal!",
        job.company,
        job.title,
        job.package_range.as_deref().unwrap_or("None")
    )
}

async fn notify_student(
    dispatcher: &Dispatcher,
    student: &Student,
    body: &str,
    kind: &'static str,
) -> Result<SendOutcome, SmsError> {
    match dispatcher.send(&student.phone, body).await {
        Ok(outcome) => {
            if outcome.is_demo() {
                info!(username = %student.username, kind, "[DEMO] notification");
            }
            Ok(outcome)
        }
        Err(err) => {
            error!(username = %student.username, kind, %err, "failed to notify student");
            Err(err)
        }
    }
}

pub async fn notify_student_approval(
    dispatcher: &Dispatcher,
    student: &Student,
) -> Result<SendOutcome, SmsError> {
    notify_student(dispatcher, student, &approval_message(), "approval").await
}

pub async fn notify_student_rejection(
    dispatcher: &Dispatcher,
    student: &Student,
) -> Result<SendOutcome, SmsError> {
    notify_student(dispatcher, student, &rejection_message(), "rejection").await
}

pub async fn notify_application_update(
    dispatcher: &Dispatcher,
    app: &Application,
) -> Result<SendOutcome, SmsError> {
    let body = application_update_message(app);
    notify_student(dispatcher, &app.student, &body, "status_update").await
}

/// Tell every given phone about a new posting.
pub async fn notify_new_job_posting<S: AsRef<str>>(
    dispatcher: &Dispatcher,
    job: &JobPosting,
    phones: &[S],
) -> BulkReport {
    let report = dispatcher.send_bulk(phones, &job_posting_message(job)).await;
    if !report.failed.is_empty() {
        error!(job_id = job.id, failed = report.failed.len(), "job posting notification incomplete");
    }
    report
}

/// What a handler shows staff after a state change has been saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Warning(String),
}

/// Turn a notification result into a user-facing notice. The state change
/// is already committed, so a failed SMS only ever downgrades to a warning.
pub fn notice(
    action: &str,
    result: &Result<SendOutcome, SmsError>,
) -> Notice {
    match result {
        Ok(outcome) if outcome.success() => match outcome.recipient() {
            Some(to) => Notice::Success(format!("{action} and SMS sent to {to}")),
            None => Notice::Success(format!("{action} and SMS sent")),
        },
        Ok(outcome) => Notice::Warning(format!(
            "{action} successfully, but SMS notification failed: {}",
            outcome.error().unwrap_or_default()
        )),
        Err(err) => Notice::Warning(format!(
            "{action} successfully, but SMS notification failed: {err}"
        )),
    }
}
