use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use validator::Validate;

use super::{MatchingDecision, MatchingForm, MatchingRecord, MatchingRepository};
use crate::portal::access::{AccessError, Actor, Role};
use crate::portal::error::PortalError;
use crate::portal::filters::ListFilter;
use crate::portal::ids::{MatchingId, Sequence};
use crate::portal::status::{transition, MatchingStatus, StatusChange, WorkflowStatus};
use crate::portal::uploads::validate_file_name;

pub struct MatchingService {
    repository: Arc<dyn MatchingRepository>,
    ids: Sequence,
}

impl MatchingService {
    pub fn new(repository: Arc<dyn MatchingRepository>) -> Self {
        Self {
            repository,
            ids: Sequence::new("mtc"),
        }
    }

    pub fn submit(&self, actor: &Actor, form: MatchingForm) -> Result<MatchingRecord, PortalError> {
        actor.require_role(Role::Student)?;
        validate_form(&form)?;

        let now = Utc::now();
        let record = MatchingRecord {
            id: self.ids.next_id(),
            student_id: actor.id.clone(),
            form,
            status: MatchingStatus::Submitted,
            equivalent_course: None,
            review_notes: None,
            reviewed_by: None,
            submitted_at: now,
            updated_at: now,
            history: vec![StatusChange {
                from: None,
                to: MatchingStatus::Submitted,
                actor: actor.id.clone(),
                notes: None,
                at: now,
            }],
        };

        let stored = self.repository.insert(record)?;
        info!(matching_id = %stored.id, student = %stored.student_id, "matching request submitted");
        Ok(stored)
    }

    /// Students only ever see their own requests.
    pub fn list(
        &self,
        actor: &Actor,
        filter: &ListFilter,
    ) -> Result<Vec<MatchingRecord>, PortalError> {
        let mut records = self.repository.list()?;
        if !actor.is_reviewer() {
            actor.require_role(Role::Student)?;
            records.retain(|record| record.student_id == actor.id);
        }
        Ok(filter.apply(records))
    }

    pub fn get(&self, actor: &Actor, id: &MatchingId) -> Result<MatchingRecord, PortalError> {
        let record = self.fetch(id)?;
        actor.require_owner_or_reviewer(&record.student_id)?;
        Ok(record)
    }

    pub fn edit(
        &self,
        actor: &Actor,
        id: &MatchingId,
        form: MatchingForm,
    ) -> Result<MatchingRecord, PortalError> {
        let mut record = self.fetch(id)?;
        if record.student_id != actor.id {
            return Err(AccessError::Forbidden(
                "only the requesting student may edit the request".to_string(),
            )
            .into());
        }
        if !record.status.allows_edit() {
            return Err(PortalError::NotEditable {
                status: record.status.label(),
            });
        }
        validate_form(&form)?;

        record.form = form;
        record.updated_at = Utc::now();
        self.repository.update(record.clone(), record.status)?;
        Ok(record)
    }

    pub fn update_status(
        &self,
        actor: &Actor,
        id: &MatchingId,
        decision: MatchingDecision,
    ) -> Result<MatchingRecord, PortalError> {
        actor.require_reviewer()?;
        let mut record = self.fetch(id)?;
        let previous = record.status;
        let next = transition(previous, decision.status)?;

        let notes = decision
            .review_notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());
        if next == MatchingStatus::NotMatched && notes.is_none() {
            return Err(PortalError::Validation(
                "review notes are required when a certificate does not match".to_string(),
            ));
        }
        if next == MatchingStatus::Matched {
            record.equivalent_course = decision.equivalent_course.or(record.equivalent_course);
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

        self.repository.update(record.clone(), previous)?;
        info!(
            matching_id = %record.id,
            from = previous.label(),
            to = next.label(),
            "matching request status changed"
        );
        Ok(record)
    }

    fn fetch(&self, id: &MatchingId) -> Result<MatchingRecord, PortalError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| PortalError::not_found("matching request", id.as_str()))
    }
}

fn validate_form(form: &MatchingForm) -> Result<(), PortalError> {
    form.validate()?;
    validate_file_name(&form.certificate_file)
}
