//! The driver-training portal: accreditation applications, certificate matching, courses,
//! exams, and the certificates those workflows issue.

pub mod access;
pub mod applications;
pub mod certificates;
pub mod courses;
pub mod error;
pub mod exams;
pub mod extract;
pub mod filters;
pub mod ids;
pub mod matching;
pub mod memory;
pub mod status;
pub mod uploads;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::FromRef;
use axum::Router;

pub use access::{AccessError, Actor, Role};
pub use error::{PortalError, RepositoryError};
pub use filters::ListFilter;

use applications::{ApplicationRepository, ApplicationService, ApprovalGate};
use certificates::{CertificateRepository, CertificateService};
use courses::{CourseRepository, CourseService};
use exams::{ExamRepository, ExamService};
use matching::{MatchingRepository, MatchingService};
use memory::{
    InMemoryApplicationRepository, InMemoryCertificateRepository, InMemoryCourseRepository,
    InMemoryExamRepository, InMemoryMatchingRepository,
};
use uploads::UploadStore;

/// Services shared by every portal handler.
#[derive(Clone)]
pub struct PortalState {
    pub applications: Arc<ApplicationService>,
    pub matching: Arc<MatchingService>,
    pub courses: Arc<CourseService>,
    pub exams: Arc<ExamService>,
    pub certificates: Arc<CertificateService>,
    pub uploads: Arc<UploadStore>,
}

/// Storage backends the portal is assembled from.
pub struct PortalRepositories {
    pub applications: Arc<dyn ApplicationRepository>,
    pub matching: Arc<dyn MatchingRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub exams: Arc<dyn ExamRepository>,
    pub certificates: Arc<dyn CertificateRepository>,
}

impl PortalRepositories {
    pub fn in_memory() -> Self {
        Self {
            applications: Arc::new(InMemoryApplicationRepository::default()),
            matching: Arc::new(InMemoryMatchingRepository::default()),
            courses: Arc::new(InMemoryCourseRepository::default()),
            exams: Arc::new(InMemoryExamRepository::default()),
            certificates: Arc::new(InMemoryCertificateRepository::default()),
        }
    }
}

impl PortalState {
    /// Wire the services together. Course and exam creation consult the application service
    /// for the approval gate.
    pub fn new(repositories: PortalRepositories, upload_dir: impl Into<PathBuf>) -> Self {
        let certificates = Arc::new(CertificateService::new(repositories.certificates));
        let applications = Arc::new(ApplicationService::new(
            repositories.applications,
            certificates.clone(),
        ));
        let gate: Arc<dyn ApprovalGate> = applications.clone();

        Self {
            matching: Arc::new(MatchingService::new(repositories.matching)),
            courses: Arc::new(CourseService::new(
                repositories.courses,
                gate.clone(),
                certificates.clone(),
            )),
            exams: Arc::new(ExamService::new(
                repositories.exams,
                gate,
                certificates.clone(),
            )),
            uploads: Arc::new(UploadStore::new(upload_dir)),
            applications,
            certificates,
        }
    }

    pub fn in_memory(upload_dir: impl Into<PathBuf>) -> Self {
        Self::new(PortalRepositories::in_memory(), upload_dir)
    }
}

impl FromRef<PortalState> for Arc<ApplicationService> {
    fn from_ref(state: &PortalState) -> Self {
        state.applications.clone()
    }
}

impl FromRef<PortalState> for Arc<MatchingService> {
    fn from_ref(state: &PortalState) -> Self {
        state.matching.clone()
    }
}

impl FromRef<PortalState> for Arc<CourseService> {
    fn from_ref(state: &PortalState) -> Self {
        state.courses.clone()
    }
}

impl FromRef<PortalState> for Arc<ExamService> {
    fn from_ref(state: &PortalState) -> Self {
        state.exams.clone()
    }
}

impl FromRef<PortalState> for Arc<CertificateService> {
    fn from_ref(state: &PortalState) -> Self {
        state.certificates.clone()
    }
}

impl FromRef<PortalState> for Arc<UploadStore> {
    fn from_ref(state: &PortalState) -> Self {
        state.uploads.clone()
    }
}

/// Every portal endpoint, ready to be merged into the server router.
pub fn router(state: PortalState) -> Router {
    Router::new()
        .merge(applications::routes())
        .merge(matching::routes())
        .merge(courses::routes())
        .merge(exams::routes())
        .merge(certificates::routes())
        .merge(uploads::routes())
        .with_state(state)
}
