use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use validator::Validate;

use super::repository::CourseRepository;
use super::{
    Course, CourseForm, CoursePatch, CourseView, Enrollment, EnrollmentUpdate, EnrollmentView,
};
use crate::portal::access::{Actor, Role};
use crate::portal::applications::{ApprovalGate, CenterKind};
use crate::portal::certificates::{CertificateOwner, CertificateService};
use crate::portal::error::PortalError;
use crate::portal::filters::ListFilter;
use crate::portal::ids::{CourseId, EnrollmentId, Sequence, UserId};
use crate::portal::status::{transition, CourseStatus, EnrollmentStatus, WorkflowStatus};

pub struct CourseService {
    repository: Arc<dyn CourseRepository>,
    gate: Arc<dyn ApprovalGate>,
    certificates: Arc<CertificateService>,
    course_ids: Sequence,
    enrollment_ids: Sequence,
}

impl CourseService {
    pub fn new(
        repository: Arc<dyn CourseRepository>,
        gate: Arc<dyn ApprovalGate>,
        certificates: Arc<CertificateService>,
    ) -> Self {
        Self {
            repository,
            gate,
            certificates,
            course_ids: Sequence::new("crs"),
            enrollment_ids: Sequence::new("enr"),
        }
    }

    /// Publish a course. Only training centers with an accepted application may do so.
    pub fn create(&self, actor: &Actor, form: CourseForm) -> Result<CourseView, PortalError> {
        actor.require_role(Role::TrainingCenter)?;
        if !self.gate.is_approved(CenterKind::TrainingCenter, &actor.id)? {
            return Err(PortalError::NotApproved {
                center_id: actor.id.to_string(),
            });
        }
        validate_form(&form)?;

        let now = Utc::now();
        let course = Course {
            id: self.course_ids.next_id(),
            training_center_id: actor.id.clone(),
            form,
            status: CourseStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert_course(course)?;
        info!(course_id = %stored.id, center = %stored.training_center_id, "course created");
        Ok(CourseView::new(stored, 0))
    }

    pub fn list(&self, filter: &ListFilter) -> Result<Vec<CourseView>, PortalError> {
        filter
            .apply(self.repository.list_courses()?)
            .into_iter()
            .map(|course| self.view(course))
            .collect()
    }

    pub fn get(&self, id: &CourseId) -> Result<CourseView, PortalError> {
        let course = self.fetch_course(id)?;
        self.view(course)
    }

    /// Edit course details or move its status. Details are frozen once the course is
    /// completed or cancelled.
    pub fn update(
        &self,
        actor: &Actor,
        id: &CourseId,
        patch: CoursePatch,
    ) -> Result<CourseView, PortalError> {
        let mut course = self.fetch_course(id)?;
        actor.require_owner_or_reviewer(&course.training_center_id)?;
        let expected = course.status;

        if patch.touches_details() {
            if course.status.is_terminal() {
                return Err(PortalError::NotEditable {
                    status: course.status.label(),
                });
            }
            let mut form = course.form.clone();
            patch.clone().apply_to(&mut form);
            validate_form(&form)?;
            course.form = form;
        }

        if let Some(next) = patch.status {
            let previous = course.status;
            course.status = transition(previous, next)?;
            info!(
                course_id = %course.id,
                from = previous.label(),
                to = next.label(),
                "course status changed"
            );
        }

        course.updated_at = Utc::now();
        self.repository.update_course(course.clone(), expected)?;
        self.view(course)
    }

    pub fn delete(&self, actor: &Actor, id: &CourseId) -> Result<(), PortalError> {
        let course = self.fetch_course(id)?;
        actor.require_owner_or_reviewer(&course.training_center_id)?;

        let dropped = self.repository.delete_course(id)?;
        info!(course_id = %id, dropped_enrollments = dropped, "course deleted");
        Ok(())
    }

    /// Enroll the calling student. Only scheduled courses with free seats accept students.
    pub fn register(
        &self,
        actor: &Actor,
        course_id: &CourseId,
    ) -> Result<EnrollmentView, PortalError> {
        actor.require_role(Role::Student)?;
        let course = self.fetch_course(course_id)?;
        if course.status != CourseStatus::Scheduled {
            return Err(PortalError::Conflict(format!(
                "course '{}' is not open for registration (status '{}')",
                course.id,
                course.status.label()
            )));
        }

        let now = Utc::now();
        let enrollment = Enrollment {
            id: self.enrollment_ids.next_id(),
            course_id: course.id.clone(),
            student_id: actor.id.clone(),
            status: EnrollmentStatus::Registered,
            enrollment_date: now,
            certificate_id: None,
            updated_at: now,
        };

        let stored = self.repository.enroll(enrollment)?;
        info!(
            enrollment_id = %stored.id,
            course_id = %course.id,
            student = %stored.student_id,
            "student enrolled"
        );
        self.enrollment_view(stored, &course)
    }

    pub fn enrollments(
        &self,
        actor: &Actor,
        course_id: &CourseId,
    ) -> Result<Vec<EnrollmentView>, PortalError> {
        let course = self.fetch_course(course_id)?;
        actor.require_owner_or_reviewer(&course.training_center_id)?;

        self.repository
            .enrollments_for_course(course_id)?
            .into_iter()
            .map(|enrollment| self.enrollment_view(enrollment, &course))
            .collect()
    }

    pub fn student_enrollments(
        &self,
        actor: &Actor,
        student_id: &UserId,
    ) -> Result<Vec<EnrollmentView>, PortalError> {
        actor.require_owner_or_reviewer(student_id)?;

        self.repository
            .enrollments_for_student(student_id)?
            .into_iter()
            .map(|enrollment| {
                let course = self.fetch_course(&enrollment.course_id)?;
                self.enrollment_view(enrollment, &course)
            })
            .collect()
    }

    /// Complete or withdraw an enrollment. Completion issues the course certificate; students
    /// may only withdraw themselves.
    pub fn update_enrollment(
        &self,
        actor: &Actor,
        id: &EnrollmentId,
        update: EnrollmentUpdate,
    ) -> Result<EnrollmentView, PortalError> {
        let mut enrollment = self
            .repository
            .fetch_enrollment(id)?
            .ok_or_else(|| PortalError::not_found("enrollment", id.as_str()))?;
        let course = self.fetch_course(&enrollment.course_id)?;

        let self_withdrawal =
            update.status == EnrollmentStatus::Withdrawn && actor.id == enrollment.student_id;
        if !self_withdrawal {
            actor.require_owner_or_reviewer(&course.training_center_id)?;
        }

        let previous = enrollment.status;
        let next = transition(previous, update.status)?;

        if next == EnrollmentStatus::Completed && course.status == CourseStatus::Cancelled {
            return Err(PortalError::Conflict(format!(
                "course '{}' was cancelled",
                course.id
            )));
        }

        enrollment.status = next;
        enrollment.updated_at = Utc::now();
        self.repository.update_enrollment(enrollment.clone(), previous)?;

        if next == EnrollmentStatus::Completed {
            let certificate = self.certificates.issue(
                CertificateOwner::Enrollment(enrollment.id.clone()),
                enrollment.student_id.clone(),
                course.form.title.clone(),
            )?;
            enrollment.certificate_id = Some(certificate.id);
            self.repository.update_enrollment(enrollment.clone(), next)?;
        }
        info!(
            enrollment_id = %enrollment.id,
            from = previous.label(),
            to = next.label(),
            "enrollment status changed"
        );
        self.enrollment_view(enrollment, &course)
    }

    fn fetch_course(&self, id: &CourseId) -> Result<Course, PortalError> {
        self.repository
            .fetch_course(id)?
            .ok_or_else(|| PortalError::not_found("course", id.as_str()))
    }

    fn view(&self, course: Course) -> Result<CourseView, PortalError> {
        let taken = self.repository.seats_taken(&course.id)?;
        Ok(CourseView::new(course, taken))
    }

    fn enrollment_view(
        &self,
        enrollment: Enrollment,
        course: &Course,
    ) -> Result<EnrollmentView, PortalError> {
        let certificate = match &enrollment.certificate_id {
            Some(certificate_id) => Some(self.certificates.get(certificate_id)?),
            None => None,
        };
        Ok(EnrollmentView {
            badge: enrollment.status.badge(),
            course_title: course.form.title.clone(),
            certificate,
            enrollment,
        })
    }
}

fn validate_form(form: &CourseForm) -> Result<(), PortalError> {
    form.validate()?;
    if form.end_date < form.start_date {
        return Err(PortalError::Validation(
            "end_date must not be before start_date".to_string(),
        ));
    }
    Ok(())
}
