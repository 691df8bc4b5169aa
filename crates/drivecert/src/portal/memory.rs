//! Mutex-backed repositories used by the server binary and the test suites.
//!
//! Maps are keyed by sequence ids, whose ordering is length-first, so iteration order is
//! creation order even once a sequence outgrows its zero padding.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::applications::{ApplicationRecord, ApplicationRepository, CenterKind};
use super::certificates::{Certificate, CertificateOwner, CertificateRepository};
use super::courses::{Course, CourseRepository, Enrollment};
use super::error::RepositoryError;
use super::exams::{Exam, ExamRegistration, ExamRepository};
use super::ids::{
    ApplicationId, CertificateId, CourseId, EnrollmentId, ExamId, MatchingId, RegistrationId,
    UserId,
};
use super::matching::{MatchingRecord, MatchingRepository};
use super::status::{
    CourseStatus, EnrollmentStatus, ExamStatus, MatchingStatus, ReviewStatus, WorkflowStatus,
};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
}

#[derive(Default, Clone)]
pub struct InMemoryApplicationRepository {
    records: Arc<Mutex<BTreeMap<ApplicationId, ApplicationRecord>>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = lock(&self.records)?;
        let taken = guard.contains_key(&record.id)
            || guard.values().any(|existing| {
                existing.kind == record.kind && existing.center_id == record.center_id
            });
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(
        &self,
        record: ApplicationRecord,
        expected: ReviewStatus,
    ) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
        let slot = guard.get_mut(&record.id).ok_or(RepositoryError::NotFound)?;
        if slot.status != expected {
            return Err(RepositoryError::Stale);
        }
        *slot = record;
        Ok(())
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(lock(&self.records)?.get(id).cloned())
    }

    fn list(&self, kind: CenterKind) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Ok(lock(&self.records)?
            .values()
            .filter(|record| record.kind == kind)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryMatchingRepository {
    records: Arc<Mutex<BTreeMap<MatchingId, MatchingRecord>>>,
}

impl MatchingRepository for InMemoryMatchingRepository {
    fn insert(&self, record: MatchingRecord) -> Result<MatchingRecord, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(
        &self,
        record: MatchingRecord,
        expected: MatchingStatus,
    ) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
        let slot = guard.get_mut(&record.id).ok_or(RepositoryError::NotFound)?;
        if slot.status != expected {
            return Err(RepositoryError::Stale);
        }
        *slot = record;
        Ok(())
    }

    fn fetch(&self, id: &MatchingId) -> Result<Option<MatchingRecord>, RepositoryError> {
        Ok(lock(&self.records)?.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<MatchingRecord>, RepositoryError> {
        Ok(lock(&self.records)?.values().cloned().collect())
    }
}

#[derive(Default)]
struct CourseTables {
    courses: BTreeMap<CourseId, Course>,
    enrollments: BTreeMap<EnrollmentId, Enrollment>,
}

impl CourseTables {
    fn seats_taken(&self, course_id: &CourseId) -> u32 {
        let taken = self
            .enrollments
            .values()
            .filter(|enrollment| &enrollment.course_id == course_id && enrollment.status.holds_seat())
            .count();
        u32::try_from(taken).unwrap_or(u32::MAX)
    }
}

/// Courses and enrollments share one lock so seat checks and claims are atomic.
#[derive(Default, Clone)]
pub struct InMemoryCourseRepository {
    tables: Arc<Mutex<CourseTables>>,
}

impl CourseRepository for InMemoryCourseRepository {
    fn insert_course(&self, course: Course) -> Result<Course, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        if tables.courses.contains_key(&course.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.courses.insert(course.id.clone(), course.clone());
        Ok(course)
    }

    fn update_course(
        &self,
        course: Course,
        expected: CourseStatus,
    ) -> Result<(), RepositoryError> {
        let mut tables = lock(&self.tables)?;
        let stored = tables.courses.get(&course.id).ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::Stale);
        }
        let in_use = tables.seats_taken(&course.id);
        if course.form.capacity < in_use {
            return Err(RepositoryError::CapacityBelowUsage {
                capacity: course.form.capacity,
                in_use,
            });
        }
        tables.courses.insert(course.id.clone(), course);
        Ok(())
    }

    fn fetch_course(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError> {
        Ok(lock(&self.tables)?.courses.get(id).cloned())
    }

    fn list_courses(&self) -> Result<Vec<Course>, RepositoryError> {
        Ok(lock(&self.tables)?.courses.values().cloned().collect())
    }

    fn delete_course(&self, id: &CourseId) -> Result<usize, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        if tables.courses.remove(id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        let before = tables.enrollments.len();
        tables
            .enrollments
            .retain(|_, enrollment| &enrollment.course_id != id);
        Ok(before - tables.enrollments.len())
    }

    fn enroll(&self, enrollment: Enrollment) -> Result<Enrollment, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        let course = tables
            .courses
            .get(&enrollment.course_id)
            .ok_or(RepositoryError::NotFound)?;
        if course.status != CourseStatus::Scheduled {
            return Err(RepositoryError::RegistrationClosed {
                status: course.status.label(),
            });
        }
        let capacity = course.form.capacity;

        let duplicate = tables.enrollments.values().any(|existing| {
            existing.course_id == enrollment.course_id
                && existing.student_id == enrollment.student_id
                && existing.status.holds_seat()
        });
        if duplicate {
            return Err(RepositoryError::AlreadyRegistered);
        }
        if tables.seats_taken(&enrollment.course_id) >= capacity {
            return Err(RepositoryError::CapacityReached { capacity });
        }

        tables
            .enrollments
            .insert(enrollment.id.clone(), enrollment.clone());
        Ok(enrollment)
    }

    fn fetch_enrollment(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, RepositoryError> {
        Ok(lock(&self.tables)?.enrollments.get(id).cloned())
    }

    fn update_enrollment(
        &self,
        enrollment: Enrollment,
        expected: EnrollmentStatus,
    ) -> Result<(), RepositoryError> {
        let mut tables = lock(&self.tables)?;
        let slot = tables
            .enrollments
            .get_mut(&enrollment.id)
            .ok_or(RepositoryError::NotFound)?;
        if slot.status != expected {
            return Err(RepositoryError::Stale);
        }
        *slot = enrollment;
        Ok(())
    }

    fn enrollments_for_course(&self, id: &CourseId) -> Result<Vec<Enrollment>, RepositoryError> {
        Ok(lock(&self.tables)?
            .enrollments
            .values()
            .filter(|enrollment| &enrollment.course_id == id)
            .cloned()
            .collect())
    }

    fn enrollments_for_student(&self, id: &UserId) -> Result<Vec<Enrollment>, RepositoryError> {
        Ok(lock(&self.tables)?
            .enrollments
            .values()
            .filter(|enrollment| &enrollment.student_id == id)
            .cloned()
            .collect())
    }

    fn seats_taken(&self, id: &CourseId) -> Result<u32, RepositoryError> {
        Ok(lock(&self.tables)?.seats_taken(id))
    }
}

#[derive(Default)]
struct ExamTables {
    exams: BTreeMap<ExamId, Exam>,
    registrations: BTreeMap<RegistrationId, ExamRegistration>,
}

/// Exams and registrations share one lock; `registered_candidates` moves with each seat.
#[derive(Default, Clone)]
pub struct InMemoryExamRepository {
    tables: Arc<Mutex<ExamTables>>,
}

impl ExamRepository for InMemoryExamRepository {
    fn insert_exam(&self, exam: Exam) -> Result<Exam, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        if tables.exams.contains_key(&exam.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.exams.insert(exam.id.clone(), exam.clone());
        Ok(exam)
    }

    fn update_exam(&self, mut exam: Exam, expected: ExamStatus) -> Result<Exam, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        let stored = tables.exams.get_mut(&exam.id).ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::Stale);
        }
        if exam.form.capacity < stored.registered_candidates {
            return Err(RepositoryError::CapacityBelowUsage {
                capacity: exam.form.capacity,
                in_use: stored.registered_candidates,
            });
        }
        exam.registered_candidates = stored.registered_candidates;
        *stored = exam.clone();
        Ok(exam)
    }

    fn fetch_exam(&self, id: &ExamId) -> Result<Option<Exam>, RepositoryError> {
        Ok(lock(&self.tables)?.exams.get(id).cloned())
    }

    fn list_exams(&self) -> Result<Vec<Exam>, RepositoryError> {
        Ok(lock(&self.tables)?.exams.values().cloned().collect())
    }

    fn register(&self, registration: ExamRegistration) -> Result<ExamRegistration, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        let duplicate = tables.registrations.values().any(|existing| {
            existing.exam_id == registration.exam_id
                && existing.student_id == registration.student_id
        });
        let exam = tables
            .exams
            .get_mut(&registration.exam_id)
            .filter(|exam| exam.form.is_visible)
            .ok_or(RepositoryError::NotFound)?;
        if exam.status != ExamStatus::Scheduled {
            return Err(RepositoryError::RegistrationClosed {
                status: exam.status.label(),
            });
        }
        if duplicate {
            return Err(RepositoryError::AlreadyRegistered);
        }
        if exam.registered_candidates >= exam.form.capacity {
            return Err(RepositoryError::CapacityReached {
                capacity: exam.form.capacity,
            });
        }
        exam.registered_candidates += 1;

        tables
            .registrations
            .insert(registration.id.clone(), registration.clone());
        Ok(registration)
    }

    fn unregister(
        &self,
        exam_id: &ExamId,
        student_id: &UserId,
    ) -> Result<ExamRegistration, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        let status = tables
            .exams
            .get(exam_id)
            .map(|exam| exam.status)
            .ok_or(RepositoryError::NotFound)?;
        if status != ExamStatus::Scheduled {
            return Err(RepositoryError::RegistrationClosed {
                status: status.label(),
            });
        }
        let registration = tables
            .registrations
            .values()
            .find(|registration| {
                &registration.exam_id == exam_id && &registration.student_id == student_id
            })
            .ok_or(RepositoryError::NotFound)?;
        if registration.result.is_some() {
            return Err(RepositoryError::Conflict);
        }
        let id = registration.id.clone();
        let removed = tables
            .registrations
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        if let Some(exam) = tables.exams.get_mut(exam_id) {
            exam.registered_candidates = exam.registered_candidates.saturating_sub(1);
        }
        Ok(removed)
    }

    fn fetch_registration(
        &self,
        id: &RegistrationId,
    ) -> Result<Option<ExamRegistration>, RepositoryError> {
        Ok(lock(&self.tables)?.registrations.get(id).cloned())
    }

    fn update_registration(
        &self,
        registration: ExamRegistration,
        expected: &ExamRegistration,
    ) -> Result<(), RepositoryError> {
        let mut tables = lock(&self.tables)?;
        let slot = tables
            .registrations
            .get_mut(&registration.id)
            .ok_or(RepositoryError::NotFound)?;
        let unchanged = slot.status == expected.status
            && slot.result == expected.result
            && slot.certificate_id == expected.certificate_id;
        if !unchanged {
            return Err(RepositoryError::Stale);
        }
        *slot = registration;
        Ok(())
    }

    fn registrations_for_exam(
        &self,
        id: &ExamId,
    ) -> Result<Vec<ExamRegistration>, RepositoryError> {
        Ok(lock(&self.tables)?
            .registrations
            .values()
            .filter(|registration| &registration.exam_id == id)
            .cloned()
            .collect())
    }

    fn registrations_for_student(
        &self,
        id: &UserId,
    ) -> Result<Vec<ExamRegistration>, RepositoryError> {
        Ok(lock(&self.tables)?
            .registrations
            .values()
            .filter(|registration| &registration.student_id == id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCertificateRepository {
    certificates: Arc<Mutex<BTreeMap<CertificateId, Certificate>>>,
}

impl CertificateRepository for InMemoryCertificateRepository {
    fn insert(&self, certificate: Certificate) -> Result<Certificate, RepositoryError> {
        let mut guard = lock(&self.certificates)?;
        let taken = guard.contains_key(&certificate.id)
            || guard
                .values()
                .any(|existing| existing.owner == certificate.owner);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(certificate.id.clone(), certificate.clone());
        Ok(certificate)
    }

    fn fetch(&self, id: &CertificateId) -> Result<Option<Certificate>, RepositoryError> {
        Ok(lock(&self.certificates)?.get(id).cloned())
    }

    fn by_owner(&self, owner: &CertificateOwner) -> Result<Option<Certificate>, RepositoryError> {
        Ok(lock(&self.certificates)?
            .values()
            .find(|certificate| &certificate.owner == owner)
            .cloned())
    }

    fn list(&self) -> Result<Vec<Certificate>, RepositoryError> {
        Ok(lock(&self.certificates)?.values().cloned().collect())
    }
}
