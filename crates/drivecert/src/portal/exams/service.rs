use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use validator::Validate;

use super::repository::ExamRepository;
use super::{
    Exam, ExamForm, ExamPatch, ExamRegistration, ExamView, RegistrationView, ResultUpdate,
};
use crate::portal::access::{Actor, Role};
use crate::portal::applications::{ApprovalGate, CenterKind};
use crate::portal::certificates::{CertificateOwner, CertificateService};
use crate::portal::error::PortalError;
use crate::portal::filters::ListFilter;
use crate::portal::ids::{ExamId, RegistrationId, Sequence, UserId};
use crate::portal::status::{
    transition, ExamResult, ExamStatus, RegistrationStatus, WorkflowStatus,
};

pub struct ExamService {
    repository: Arc<dyn ExamRepository>,
    gate: Arc<dyn ApprovalGate>,
    certificates: Arc<CertificateService>,
    exam_ids: Sequence,
    registration_ids: Sequence,
}

impl ExamService {
    pub fn new(
        repository: Arc<dyn ExamRepository>,
        gate: Arc<dyn ApprovalGate>,
        certificates: Arc<CertificateService>,
    ) -> Self {
        Self {
            repository,
            gate,
            certificates,
            exam_ids: Sequence::new("exm"),
            registration_ids: Sequence::new("reg"),
        }
    }

    /// Schedule an exam. Only testing centers with an accepted application may do so.
    pub fn create(&self, actor: &Actor, form: ExamForm) -> Result<ExamView, PortalError> {
        actor.require_role(Role::TestingCenter)?;
        if !self.gate.is_approved(CenterKind::TestingCenter, &actor.id)? {
            return Err(PortalError::NotApproved {
                center_id: actor.id.to_string(),
            });
        }
        form.validate()?;

        let now = Utc::now();
        let exam = Exam {
            id: self.exam_ids.next_id(),
            testing_center_id: actor.id.clone(),
            form,
            registered_candidates: 0,
            status: ExamStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert_exam(exam)?;
        info!(exam_id = %stored.id, center = %stored.testing_center_id, "exam scheduled");
        Ok(stored.into())
    }

    /// Hidden exams are listed only for reviewers and the center that owns them.
    pub fn list(
        &self,
        actor: Option<&Actor>,
        filter: &ListFilter,
    ) -> Result<Vec<ExamView>, PortalError> {
        let mut exams = self.repository.list_exams()?;
        exams.retain(|exam| can_see(actor, exam));
        Ok(filter.apply(exams).into_iter().map(ExamView::from).collect())
    }

    pub fn get(&self, actor: Option<&Actor>, id: &ExamId) -> Result<ExamView, PortalError> {
        let exam = self.fetch_exam(id)?;
        if !can_see(actor, &exam) {
            return Err(PortalError::not_found("exam", id.as_str()));
        }
        Ok(exam.into())
    }

    /// Edit details, toggle visibility, or move the exam status. Details are frozen once the
    /// exam is finished or cancelled.
    pub fn update(
        &self,
        actor: &Actor,
        id: &ExamId,
        patch: ExamPatch,
    ) -> Result<ExamView, PortalError> {
        let mut exam = self.fetch_exam(id)?;
        actor.require_owner_or_reviewer(&exam.testing_center_id)?;
        let expected = exam.status;

        if patch.touches_details() && exam.status.is_terminal() {
            return Err(PortalError::NotEditable {
                status: exam.status.label(),
            });
        }
        let mut form = exam.form.clone();
        patch.apply_to(&mut form);
        form.validate()?;
        exam.form = form;

        if let Some(next) = patch.status {
            let previous = exam.status;
            exam.status = transition(previous, next)?;
            info!(
                exam_id = %exam.id,
                from = previous.label(),
                to = next.label(),
                "exam status changed"
            );
        }

        exam.updated_at = Utc::now();
        let stored = self.repository.update_exam(exam, expected)?;
        Ok(stored.into())
    }

    /// Register the calling student for a visible, scheduled exam with a free seat.
    pub fn register(
        &self,
        actor: &Actor,
        exam_id: &ExamId,
    ) -> Result<RegistrationView, PortalError> {
        actor.require_role(Role::Student)?;
        let exam = self.fetch_exam(exam_id)?;
        if !exam.form.is_visible {
            return Err(PortalError::not_found("exam", exam_id.as_str()));
        }
        ensure_scheduled(&exam)?;

        let now = Utc::now();
        let registration = ExamRegistration {
            id: self.registration_ids.next_id(),
            exam_id: exam.id.clone(),
            student_id: actor.id.clone(),
            status: RegistrationStatus::Registered,
            result: None,
            notes: None,
            certificate_id: None,
            registered_at: now,
            updated_at: now,
        };

        let stored = self.repository.register(registration)?;
        info!(
            registration_id = %stored.id,
            exam_id = %exam.id,
            student = %stored.student_id,
            "candidate registered"
        );
        self.registration_view(stored, &exam)
    }

    /// Cancel the calling student's registration while the exam is still scheduled.
    pub fn unregister(&self, actor: &Actor, exam_id: &ExamId) -> Result<(), PortalError> {
        actor.require_role(Role::Student)?;
        let exam = self.fetch_exam(exam_id)?;
        ensure_scheduled(&exam)?;

        let registration = self
            .repository
            .registrations_for_exam(exam_id)?
            .into_iter()
            .find(|registration| registration.student_id == actor.id)
            .ok_or_else(|| PortalError::not_found("exam registration", actor.id.as_str()))?;
        if registration.result.is_some() {
            return Err(PortalError::Conflict(
                "a result has already been recorded for this registration".to_string(),
            ));
        }

        let removed = self.repository.unregister(exam_id, &actor.id)?;
        info!(registration_id = %removed.id, exam_id = %exam_id, "candidate unregistered");
        Ok(())
    }

    pub fn candidates(
        &self,
        actor: &Actor,
        exam_id: &ExamId,
    ) -> Result<Vec<RegistrationView>, PortalError> {
        let exam = self.fetch_exam(exam_id)?;
        actor.require_owner_or_reviewer(&exam.testing_center_id)?;

        self.repository
            .registrations_for_exam(exam_id)?
            .into_iter()
            .map(|registration| self.registration_view(registration, &exam))
            .collect()
    }

    /// Record attendance and/or the result. A pass issues the exam certificate, after which the
    /// registration no longer changes.
    pub fn record_result(
        &self,
        actor: &Actor,
        id: &RegistrationId,
        update: ResultUpdate,
    ) -> Result<RegistrationView, PortalError> {
        let stored = self
            .repository
            .fetch_registration(id)?
            .ok_or_else(|| PortalError::not_found("exam registration", id.as_str()))?;
        let exam = self.fetch_exam(&stored.exam_id)?;
        actor.require_owner_or_reviewer(&exam.testing_center_id)?;

        if stored.certificate_id.is_some() || stored.result == Some(ExamResult::Passed) {
            return Err(PortalError::Conflict(format!(
                "registration '{}' already passed; its result is final",
                stored.id
            )));
        }
        if exam.status == ExamStatus::Cancelled {
            return Err(PortalError::Conflict(format!(
                "exam '{}' was cancelled",
                exam.id
            )));
        }
        if update.result.is_none() && update.status.is_none() {
            return Err(PortalError::Validation(
                "a result or an attendance status is required".to_string(),
            ));
        }

        let mut registration = stored.clone();
        let mut next = update.status.unwrap_or(registration.status);
        if update.result.is_some() {
            if next == RegistrationStatus::Absent {
                return Err(PortalError::Validation(
                    "an absent candidate cannot receive a result".to_string(),
                ));
            }
            next = RegistrationStatus::Attended;
        }
        if next != registration.status {
            registration.status = transition(registration.status, next)?;
        }

        if let Some(result) = update.result {
            registration.result = Some(result);
        }
        if let Some(notes) = update
            .notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty())
        {
            registration.notes = Some(notes);
        }

        registration.updated_at = Utc::now();
        self.repository.update_registration(registration.clone(), &stored)?;

        if registration.result == Some(ExamResult::Passed) {
            let claimed = registration.clone();
            let certificate = self.certificates.issue(
                CertificateOwner::ExamRegistration(registration.id.clone()),
                registration.student_id.clone(),
                format!("{} ({})", exam.form.title, exam.form.exam_type),
            )?;
            registration.certificate_id = Some(certificate.id);
            self.repository.update_registration(registration.clone(), &claimed)?;
        }
        info!(
            registration_id = %registration.id,
            status = registration.status.label(),
            result = registration.result.map(ExamResult::label),
            "exam result recorded"
        );
        self.registration_view(registration, &exam)
    }

    pub fn student_registrations(
        &self,
        actor: &Actor,
        student_id: &UserId,
    ) -> Result<Vec<RegistrationView>, PortalError> {
        actor.require_owner_or_reviewer(student_id)?;

        self.repository
            .registrations_for_student(student_id)?
            .into_iter()
            .map(|registration| {
                let exam = self.fetch_exam(&registration.exam_id)?;
                self.registration_view(registration, &exam)
            })
            .collect()
    }

    fn fetch_exam(&self, id: &ExamId) -> Result<Exam, PortalError> {
        self.repository
            .fetch_exam(id)?
            .ok_or_else(|| PortalError::not_found("exam", id.as_str()))
    }

    fn registration_view(
        &self,
        registration: ExamRegistration,
        exam: &Exam,
    ) -> Result<RegistrationView, PortalError> {
        let certificate = match &registration.certificate_id {
            Some(certificate_id) => Some(self.certificates.get(certificate_id)?),
            None => None,
        };
        Ok(RegistrationView {
            badge: registration.status.badge(),
            result_badge: registration.result.map(ExamResult::badge),
            exam_title: exam.form.title.clone(),
            exam_date: exam.form.exam_date,
            certificate,
            registration,
        })
    }
}

fn can_see(actor: Option<&Actor>, exam: &Exam) -> bool {
    exam.form.is_visible
        || actor.is_some_and(|actor| actor.is_reviewer() || actor.id == exam.testing_center_id)
}

fn ensure_scheduled(exam: &Exam) -> Result<(), PortalError> {
    if exam.status != ExamStatus::Scheduled {
        return Err(PortalError::Conflict(format!(
            "exam '{}' is not open for registration (status '{}')",
            exam.id,
            exam.status.label()
        )));
    }
    Ok(())
}
