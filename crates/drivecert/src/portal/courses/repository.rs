use super::{Course, Enrollment};
use crate::portal::error::RepositoryError;
use crate::portal::ids::{CourseId, EnrollmentId, UserId};
use crate::portal::status::{CourseStatus, EnrollmentStatus};

/// Course and enrollment storage. Seat accounting lives here so it can be done atomically.
pub trait CourseRepository: Send + Sync {
    fn insert_course(&self, course: Course) -> Result<Course, RepositoryError>;
    /// Replace a course whose stored status is still `expected`, rejecting a capacity below
    /// the seats already taken.
    fn update_course(
        &self,
        course: Course,
        expected: CourseStatus,
    ) -> Result<(), RepositoryError>;
    fn fetch_course(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError>;
    fn list_courses(&self) -> Result<Vec<Course>, RepositoryError>;
    /// Remove a course with its enrollments, returning how many enrollments were dropped.
    fn delete_course(&self, id: &CourseId) -> Result<usize, RepositoryError>;

    /// Claim a seat. Fails with `RegistrationClosed` unless the course is scheduled, with
    /// `AlreadyRegistered` when the student holds a seat on the course and with
    /// `CapacityReached` when every seat is taken.
    fn enroll(&self, enrollment: Enrollment) -> Result<Enrollment, RepositoryError>;
    fn fetch_enrollment(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, RepositoryError>;
    /// Compare-and-set on the enrollment status.
    fn update_enrollment(
        &self,
        enrollment: Enrollment,
        expected: EnrollmentStatus,
    ) -> Result<(), RepositoryError>;
    fn enrollments_for_course(&self, id: &CourseId) -> Result<Vec<Enrollment>, RepositoryError>;
    fn enrollments_for_student(&self, id: &UserId) -> Result<Vec<Enrollment>, RepositoryError>;
    fn seats_taken(&self, id: &CourseId) -> Result<u32, RepositoryError>;
}
