//! Exams published by accredited testing centers, candidate registrations, and results.

mod repository;
mod router;
mod service;

pub use repository::ExamRepository;
pub use router::routes;
pub use service::ExamService;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::certificates::Certificate;
use super::filters::Filterable;
use super::ids::{CertificateId, ExamId, RegistrationId, UserId};
use super::status::{Badge, ExamResult, ExamStatus, RegistrationStatus, WorkflowStatus};

fn visible_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ExamForm {
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    /// Theory, practical, or any label the center uses.
    #[validate(length(min = 2, max = 100))]
    pub exam_type: String,
    pub exam_date: NaiveDate,
    #[validate(length(min = 2, max = 200))]
    pub location: String,
    #[validate(range(min = 1, max = 1000))]
    pub capacity: u32,
    #[serde(default = "visible_by_default")]
    pub is_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub testing_center_id: UserId,
    #[serde(flatten)]
    pub form: ExamForm,
    /// Maintained by the repository alongside registrations.
    pub registered_candidates: u32,
    pub status: ExamStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Filterable for Exam {
    fn status_label(&self) -> &str {
        self.status.label()
    }

    fn search_text(&self) -> Vec<&str> {
        vec![
            self.form.title.as_str(),
            self.form.exam_type.as_str(),
            self.form.location.as_str(),
        ]
    }

    fn center(&self) -> Option<&str> {
        Some(self.testing_center_id.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExamPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub exam_type: Option<String>,
    pub exam_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub is_visible: Option<bool>,
    pub status: Option<ExamStatus>,
}

impl ExamPatch {
    pub(crate) fn touches_details(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.exam_type.is_some()
            || self.exam_date.is_some()
            || self.location.is_some()
            || self.capacity.is_some()
    }

    pub(crate) fn apply_to(&self, form: &mut ExamForm) {
        if let Some(title) = &self.title {
            form.title = title.clone();
        }
        if let Some(description) = &self.description {
            form.description = description.clone();
        }
        if let Some(exam_type) = &self.exam_type {
            form.exam_type = exam_type.clone();
        }
        if let Some(exam_date) = self.exam_date {
            form.exam_date = exam_date;
        }
        if let Some(location) = &self.location {
            form.location = location.clone();
        }
        if let Some(capacity) = self.capacity {
            form.capacity = capacity;
        }
        if let Some(is_visible) = self.is_visible {
            form.is_visible = is_visible;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamView {
    #[serde(flatten)]
    pub exam: Exam,
    pub seats_left: u32,
    pub can_register: bool,
    pub badge: Badge,
}

impl From<Exam> for ExamView {
    fn from(exam: Exam) -> Self {
        let seats_left = exam.form.capacity.saturating_sub(exam.registered_candidates);
        Self {
            can_register: exam.form.is_visible
                && exam.status == ExamStatus::Scheduled
                && seats_left > 0,
            badge: exam.status.badge(),
            seats_left,
            exam,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamRegistration {
    pub id: RegistrationId,
    pub exam_id: ExamId,
    pub student_id: UserId,
    pub status: RegistrationStatus,
    pub result: Option<ExamResult>,
    pub notes: Option<String>,
    pub certificate_id: Option<CertificateId>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationView {
    #[serde(flatten)]
    pub registration: ExamRegistration,
    pub exam_title: String,
    pub exam_date: NaiveDate,
    pub badge: Badge,
    pub result_badge: Option<Badge>,
    pub certificate: Option<Certificate>,
}

/// Attendance and/or result for one candidate. Recording a result marks the candidate as
/// attended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResultUpdate {
    pub result: Option<ExamResult>,
    pub status: Option<RegistrationStatus>,
    pub notes: Option<String>,
}
