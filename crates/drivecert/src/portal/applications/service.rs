use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use validator::Validate;

use super::domain::{
    ApplicationForm, ApplicationRecord, ApplicationStats, CenterKind, CenterSummary, StatusUpdate,
};
use super::repository::ApplicationRepository;
use crate::portal::access::{AccessError, Actor};
use crate::portal::certificates::{Certificate, CertificateOwner, CertificateService};
use crate::portal::error::{PortalError, RepositoryError};
use crate::portal::filters::ListFilter;
use crate::portal::ids::{ApplicationId, Sequence, UserId};
use crate::portal::status::{transition, ReviewStatus, StatusChange, WorkflowStatus};
use crate::portal::uploads::validate_file_name;

/// Answers whether a center may publish courses or exams.
pub trait ApprovalGate: Send + Sync {
    fn is_approved(&self, kind: CenterKind, center_id: &UserId) -> Result<bool, PortalError>;
}

/// Service composing the application repository and certificate issuance.
pub struct ApplicationService {
    repository: Arc<dyn ApplicationRepository>,
    certificates: Arc<CertificateService>,
    training_ids: Sequence,
    testing_ids: Sequence,
}

impl ApplicationService {
    pub fn new(
        repository: Arc<dyn ApplicationRepository>,
        certificates: Arc<CertificateService>,
    ) -> Self {
        Self {
            repository,
            certificates,
            training_ids: Sequence::new("tca"),
            testing_ids: Sequence::new("tsa"),
        }
    }

    fn next_id(&self, kind: CenterKind) -> ApplicationId {
        match kind {
            CenterKind::TrainingCenter => self.training_ids.next_id(),
            CenterKind::TestingCenter => self.testing_ids.next_id(),
        }
    }

    /// Submit a new application. A center holds at most one application per kind; a rejected
    /// one is resubmitted through `edit`.
    pub fn submit(
        &self,
        kind: CenterKind,
        actor: &Actor,
        form: ApplicationForm,
    ) -> Result<ApplicationRecord, PortalError> {
        actor.require_role(kind.role())?;
        validate_form(&form)?;

        let now = Utc::now();
        let record = ApplicationRecord {
            id: self.next_id(kind),
            kind,
            center_id: actor.id.clone(),
            form,
            status: ReviewStatus::UnderReview,
            review_notes: None,
            reviewed_by: None,
            certificate_id: None,
            submitted_at: now,
            updated_at: now,
            history: vec![StatusChange {
                from: None,
                to: ReviewStatus::UnderReview,
                actor: actor.id.clone(),
                notes: None,
                at: now,
            }],
        };

        let stored = self.repository.insert(record).map_err(|err| match err {
            RepositoryError::Conflict => PortalError::Conflict(format!(
                "center '{}' already has a {} application; edit it instead",
                actor.id,
                kind.label()
            )),
            other => other.into(),
        })?;
        info!(
            application_id = %stored.id,
            kind = kind.label(),
            center = %stored.center_id,
            "application submitted"
        );
        Ok(stored)
    }

    /// Reviewers see every application; centers see their own.
    pub fn list(
        &self,
        kind: CenterKind,
        actor: &Actor,
        filter: &ListFilter,
    ) -> Result<Vec<ApplicationRecord>, PortalError> {
        let mut records = self.repository.list(kind)?;
        if !actor.is_reviewer() {
            actor.require_role(kind.role())?;
            records.retain(|record| record.center_id == actor.id);
        }
        Ok(filter.apply(records))
    }

    pub fn get(
        &self,
        kind: CenterKind,
        actor: &Actor,
        id: &ApplicationId,
    ) -> Result<ApplicationRecord, PortalError> {
        let record = self.fetch(kind, id)?;
        actor.require_owner_or_reviewer(&record.center_id)?;
        Ok(record)
    }

    /// Edit the form while under review, or resubmit after a rejection.
    pub fn edit(
        &self,
        kind: CenterKind,
        actor: &Actor,
        id: &ApplicationId,
        form: ApplicationForm,
    ) -> Result<ApplicationRecord, PortalError> {
        let mut record = self.fetch(kind, id)?;
        if record.center_id != actor.id {
            return Err(AccessError::Forbidden(
                "only the applying center may edit its application".to_string(),
            )
            .into());
        }
        if !record.status.allows_edit() {
            return Err(PortalError::NotEditable {
                status: record.status.label(),
            });
        }
        validate_form(&form)?;

        let previous = record.status;
        let now = Utc::now();
        if previous == ReviewStatus::Rejected {
            record.history.push(StatusChange {
                from: Some(ReviewStatus::Rejected),
                to: ReviewStatus::UnderReview,
                actor: actor.id.clone(),
                notes: Some("resubmitted".to_string()),
                at: now,
            });
            record.status = ReviewStatus::UnderReview;
            record.review_notes = None;
            record.reviewed_by = None;
            info!(application_id = %record.id, "rejected application resubmitted");
        }
        record.form = form;
        record.updated_at = now;

        self.repository.update(record.clone(), previous)?;
        Ok(record)
    }

    /// Apply a reviewer decision. Acceptance issues the accreditation certificate.
    pub fn update_status(
        &self,
        kind: CenterKind,
        actor: &Actor,
        id: &ApplicationId,
        update: StatusUpdate,
    ) -> Result<ApplicationRecord, PortalError> {
        actor.require_reviewer()?;
        let mut record = self.fetch(kind, id)?;
        let previous = record.status;
        let next = transition(previous, update.status)?;

        let notes = update
            .review_notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());
        if next == ReviewStatus::Rejected && notes.is_none() {
            return Err(PortalError::Validation(
                "review notes are required when rejecting an application".to_string(),
            ));
        }

        let now = Utc::now();
        record.history.push(StatusChange {
            from: Some(previous),
            to: next,
            actor: actor.id.clone(),
            notes: notes.clone(),
            at: now,
        });
        record.status = next;
        if notes.is_some() {
            record.review_notes = notes;
        }
        record.reviewed_by = Some(actor.id.clone());
        record.updated_at = now;

        // Claim the status first; only the winning decision issues a certificate.
        self.repository.update(record.clone(), previous)?;

        if next == ReviewStatus::Accepted {
            let title = format!("{}: {}", kind.certificate_title(), record.form.center_name);
            let certificate = self.certificates.issue(
                CertificateOwner::Application(record.id.clone()),
                record.center_id.clone(),
                title,
            )?;
            record.certificate_id = Some(certificate.id);
            self.repository.update(record.clone(), next)?;
        }

        info!(
            application_id = %record.id,
            from = previous.label(),
            to = next.label(),
            reviewer = %actor.id,
            "application status changed"
        );
        Ok(record)
    }

    /// Certificate linked to an accepted application.
    pub fn certificate(
        &self,
        kind: CenterKind,
        actor: &Actor,
        id: &ApplicationId,
    ) -> Result<Certificate, PortalError> {
        let record = self.get(kind, actor, id)?;
        let certificate_id = record
            .certificate_id
            .ok_or_else(|| PortalError::not_found("certificate", id.as_str()))?;
        self.certificates.get(&certificate_id)
    }

    pub fn stats(&self, kind: CenterKind, actor: &Actor) -> Result<ApplicationStats, PortalError> {
        actor.require_reviewer()?;
        let records = self.repository.list(kind)?;
        Ok(ApplicationStats::tally(kind, &records))
    }

    /// Accredited centers, for the public directory pages.
    pub fn centers(
        &self,
        kind: CenterKind,
        filter: &ListFilter,
    ) -> Result<Vec<CenterSummary>, PortalError> {
        let centers = self
            .repository
            .list(kind)?
            .iter()
            .filter(|record| record.status == ReviewStatus::Accepted)
            .map(CenterSummary::from)
            .collect();
        Ok(filter.apply(centers))
    }

    fn fetch(&self, kind: CenterKind, id: &ApplicationId) -> Result<ApplicationRecord, PortalError> {
        self.repository
            .fetch(id)?
            .filter(|record| record.kind == kind)
            .ok_or_else(|| PortalError::not_found("application", id.as_str()))
    }
}

impl ApprovalGate for ApplicationService {
    fn is_approved(&self, kind: CenterKind, center_id: &UserId) -> Result<bool, PortalError> {
        let approved = self
            .repository
            .list(kind)?
            .iter()
            .any(|record| &record.center_id == center_id && record.status == ReviewStatus::Accepted);
        Ok(approved)
    }
}

fn validate_form(form: &ApplicationForm) -> Result<(), PortalError> {
    form.validate()?;
    for document in &form.documents {
        validate_file_name(document)?;
    }
    Ok(())
}
