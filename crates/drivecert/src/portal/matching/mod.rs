//! Matching a student's external certificate against the portal's course equivalents.

mod router;
mod service;

pub use router::routes;
pub use service::MatchingService;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::RepositoryError;
use super::filters::Filterable;
use super::ids::{CourseId, MatchingId, UserId};
use super::status::{Badge, MatchingStatus, StatusChange, WorkflowStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MatchingForm {
    #[validate(length(min = 2, max = 200))]
    pub student_name: String,
    #[validate(length(min = 2, max = 200))]
    pub institution: String,
    #[validate(length(min = 2, max = 200))]
    pub certificate_title: String,
    pub issued_on: NaiveDate,
    /// Uploaded scan of the external certificate.
    #[validate(length(min = 1, max = 255))]
    pub certificate_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingRecord {
    pub id: MatchingId,
    pub student_id: UserId,
    #[serde(flatten)]
    pub form: MatchingForm,
    pub status: MatchingStatus,
    pub equivalent_course: Option<CourseId>,
    pub review_notes: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<StatusChange<MatchingStatus>>,
}

impl MatchingRecord {
    pub fn view(self) -> MatchingView {
        MatchingView {
            badge: self.status.badge(),
            can_edit: self.status.allows_edit(),
            record: self,
        }
    }
}

impl Filterable for MatchingRecord {
    fn status_label(&self) -> &str {
        self.status.label()
    }

    fn search_text(&self) -> Vec<&str> {
        vec![
            self.form.student_name.as_str(),
            self.form.institution.as_str(),
            self.form.certificate_title.as_str(),
        ]
    }

    fn student(&self) -> Option<&str> {
        Some(self.student_id.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchingView {
    #[serde(flatten)]
    pub record: MatchingRecord,
    pub badge: Badge,
    pub can_edit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MatchingDecision {
    pub status: MatchingStatus,
    #[serde(default)]
    pub review_notes: Option<String>,
    #[serde(default)]
    pub equivalent_course: Option<CourseId>,
}

pub trait MatchingRepository: Send + Sync {
    fn insert(&self, record: MatchingRecord) -> Result<MatchingRecord, RepositoryError>;
    /// Compare-and-set on the status: `Stale` when the stored status is no longer `expected`.
    fn update(
        &self,
        record: MatchingRecord,
        expected: MatchingStatus,
    ) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &MatchingId) -> Result<Option<MatchingRecord>, RepositoryError>;
    fn list(&self) -> Result<Vec<MatchingRecord>, RepositoryError>;
}
