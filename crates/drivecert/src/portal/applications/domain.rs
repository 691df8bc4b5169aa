use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::portal::access::Role;
use crate::portal::filters::Filterable;
use crate::portal::ids::{ApplicationId, CertificateId, UserId};
use crate::portal::status::{Badge, ReviewStatus, StatusChange, WorkflowStatus};

/// Which accreditation an application asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CenterKind {
    TrainingCenter,
    TestingCenter,
}

impl CenterKind {
    /// Role an account must hold to apply for this accreditation.
    pub const fn role(self) -> Role {
        match self {
            CenterKind::TrainingCenter => Role::TrainingCenter,
            CenterKind::TestingCenter => Role::TestingCenter,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            CenterKind::TrainingCenter => "training_center",
            CenterKind::TestingCenter => "testing_center",
        }
    }

    pub(crate) const fn certificate_title(self) -> &'static str {
        match self {
            CenterKind::TrainingCenter => "اعتماد مركز تدريب",
            CenterKind::TestingCenter => "اعتماد مركز اختبار",
        }
    }
}

/// Form fields a center fills in when applying or resubmitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ApplicationForm {
    #[validate(length(min = 2, max = 200))]
    pub center_name: String,
    #[validate(length(min = 2, max = 100))]
    pub region: String,
    #[validate(length(min = 2, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 64))]
    pub commercial_registration: String,
    #[validate(email)]
    pub contact_email: String,
    #[validate(length(min = 7, max = 20))]
    pub contact_phone: String,
    /// Uploaded file names served under `/api/uploads/`.
    #[serde(default)]
    pub documents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub kind: CenterKind,
    pub center_id: UserId,
    #[serde(flatten)]
    pub form: ApplicationForm,
    pub status: ReviewStatus,
    pub review_notes: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub certificate_id: Option<CertificateId>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<StatusChange<ReviewStatus>>,
}

impl ApplicationRecord {
    pub fn view(self) -> ApplicationView {
        ApplicationView {
            badge: self.status.badge(),
            can_edit: self.status.allows_edit(),
            record: self,
        }
    }
}

impl Filterable for ApplicationRecord {
    fn status_label(&self) -> &str {
        self.status.label()
    }

    fn search_text(&self) -> Vec<&str> {
        vec![
            self.form.center_name.as_str(),
            self.form.city.as_str(),
            self.form.contact_email.as_str(),
        ]
    }

    fn region(&self) -> Option<&str> {
        Some(self.form.region.as_str())
    }

    fn center(&self) -> Option<&str> {
        Some(self.center_id.as_str())
    }
}

/// Application as returned to the portal, with its badge and edit affordance.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub record: ApplicationRecord,
    pub badge: Badge,
    pub can_edit: bool,
}

/// Reviewer decision payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusUpdate {
    pub status: ReviewStatus,
    #[serde(default)]
    pub review_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationStats {
    pub kind: CenterKind,
    pub total: usize,
    pub by_status: BTreeMap<&'static str, usize>,
}

impl ApplicationStats {
    pub(crate) fn tally(kind: CenterKind, records: &[ApplicationRecord]) -> Self {
        let mut by_status: BTreeMap<&'static str, usize> = ReviewStatus::ALL
            .iter()
            .map(|status| (status.label(), 0))
            .collect();
        for record in records {
            *by_status.entry(record.status.label()).or_default() += 1;
        }

        Self {
            kind,
            total: records.len(),
            by_status,
        }
    }
}

/// Public listing entry for an accredited center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CenterSummary {
    pub center_id: UserId,
    pub kind: CenterKind,
    pub center_name: String,
    pub region: String,
    pub city: String,
    pub application_id: ApplicationId,
    pub certificate_id: Option<CertificateId>,
}

impl From<&ApplicationRecord> for CenterSummary {
    fn from(record: &ApplicationRecord) -> Self {
        Self {
            center_id: record.center_id.clone(),
            kind: record.kind,
            center_name: record.form.center_name.clone(),
            region: record.form.region.clone(),
            city: record.form.city.clone(),
            application_id: record.id.clone(),
            certificate_id: record.certificate_id.clone(),
        }
    }
}

impl Filterable for CenterSummary {
    fn status_label(&self) -> &str {
        ReviewStatus::Accepted.label()
    }

    fn search_text(&self) -> Vec<&str> {
        vec![self.center_name.as_str(), self.city.as_str()]
    }

    fn region(&self) -> Option<&str> {
        Some(self.region.as_str())
    }

    fn center(&self) -> Option<&str> {
        Some(self.center_id.as_str())
    }
}
