use super::domain::{ApplicationRecord, CenterKind};
use crate::portal::error::RepositoryError;
use crate::portal::ids::ApplicationId;
use crate::portal::status::ReviewStatus;

/// Storage abstraction so the service can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    /// Store a new application; `Conflict` when the center already has one of the same kind.
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    /// Replace the stored record only while its status is still `expected`, otherwise `Stale`.
    fn update(
        &self,
        record: ApplicationRecord,
        expected: ReviewStatus,
    ) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
    /// All applications of one kind, oldest first.
    fn list(&self, kind: CenterKind) -> Result<Vec<ApplicationRecord>, RepositoryError>;
}
