use super::{Exam, ExamRegistration};
use crate::portal::error::RepositoryError;
use crate::portal::ids::{ExamId, RegistrationId, UserId};
use crate::portal::status::ExamStatus;

/// Exam and registration storage. `registered_candidates` is only ever changed here, under the
/// same guard as the registrations themselves.
pub trait ExamRepository: Send + Sync {
    fn insert_exam(&self, exam: Exam) -> Result<Exam, RepositoryError>;
    /// Replace an exam whose stored status is still `expected`. The stored candidate count is
    /// kept, and a capacity below it is rejected.
    fn update_exam(&self, exam: Exam, expected: ExamStatus) -> Result<Exam, RepositoryError>;
    fn fetch_exam(&self, id: &ExamId) -> Result<Option<Exam>, RepositoryError>;
    fn list_exams(&self) -> Result<Vec<Exam>, RepositoryError>;

    /// Claim a seat on a visible, scheduled exam and bump the candidate count.
    fn register(&self, registration: ExamRegistration) -> Result<ExamRegistration, RepositoryError>;
    /// Drop a student's registration and release the seat. Only while the exam is scheduled
    /// and no result has been recorded.
    fn unregister(
        &self,
        exam_id: &ExamId,
        student_id: &UserId,
    ) -> Result<ExamRegistration, RepositoryError>;
    fn fetch_registration(
        &self,
        id: &RegistrationId,
    ) -> Result<Option<ExamRegistration>, RepositoryError>;
    /// Replace a registration whose stored status, result and certificate still match
    /// `expected`; `Stale` otherwise.
    fn update_registration(
        &self,
        registration: ExamRegistration,
        expected: &ExamRegistration,
    ) -> Result<(), RepositoryError>;
    fn registrations_for_exam(&self, id: &ExamId)
        -> Result<Vec<ExamRegistration>, RepositoryError>;
    fn registrations_for_student(
        &self,
        id: &UserId,
    ) -> Result<Vec<ExamRegistration>, RepositoryError>;
}
