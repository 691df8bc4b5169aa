use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::portal::access::{Actor, Role, USER_ID_HEADER, USER_ROLE_HEADER};
use crate::portal::applications::repository::ApplicationRepository;
use crate::portal::applications::{
    ApplicationForm, ApplicationRecord, ApplicationService, CenterKind, StatusUpdate,
};
use crate::portal::certificates::CertificateService;
use crate::portal::error::{PortalError, RepositoryError};
use crate::portal::ids::ApplicationId;
use crate::portal::memory::{InMemoryApplicationRepository, InMemoryCertificateRepository};
use crate::portal::status::ReviewStatus;

pub(super) fn form(center_name: &str, region: &str) -> ApplicationForm {
    ApplicationForm {
        center_name: center_name.to_string(),
        region: region.to_string(),
        city: "Riyadh".to_string(),
        commercial_registration: "1010123456".to_string(),
        contact_email: "info@center.example".to_string(),
        contact_phone: "+966500000000".to_string(),
        documents: vec!["license.pdf".to_string()],
    }
}

pub(super) fn trainer(id: &str) -> Actor {
    Actor::new(id, Role::TrainingCenter)
}

pub(super) fn tester(id: &str) -> Actor {
    Actor::new(id, Role::TestingCenter)
}

pub(super) fn admin() -> Actor {
    Actor::new("admin-1", Role::Admin)
}

pub(super) fn build_service() -> (
    ApplicationService,
    InMemoryApplicationRepository,
    Arc<CertificateService>,
) {
    let repository = InMemoryApplicationRepository::default();
    let certificates = Arc::new(CertificateService::new(Arc::new(
        InMemoryCertificateRepository::default(),
    )));
    let service = ApplicationService::new(Arc::new(repository.clone()), certificates.clone());
    (service, repository, certificates)
}

pub(super) fn decide(status: ReviewStatus, notes: Option<&str>) -> StatusUpdate {
    StatusUpdate {
        status,
        review_notes: notes.map(str::to_string),
    }
}

/// Walk an application through review to acceptance.
pub(super) fn accept(
    service: &ApplicationService,
    kind: CenterKind,
    id: &ApplicationId,
) -> ApplicationRecord {
    service
        .update_status(kind, &admin(), id, decide(ReviewStatus::FieldVisit, None))
        .expect("field visit");
    service
        .update_status(kind, &admin(), id, decide(ReviewStatus::UnderEvaluation, None))
        .expect("evaluation");
    service
        .update_status(kind, &admin(), id, decide(ReviewStatus::Accepted, Some("approved")))
        .expect("accepted")
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(
        &self,
        _record: ApplicationRecord,
        _expected: ReviewStatus,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _kind: CenterKind) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn assert_not_editable(result: Result<ApplicationRecord, PortalError>) {
    match result {
        Err(PortalError::NotEditable { .. }) => {}
        other => panic!("expected not editable, got {other:?}"),
    }
}

pub(super) fn request(
    method: &str,
    uri: &str,
    actor: Option<&Actor>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header(USER_ID_HEADER, actor.id.as_str())
            .header(USER_ROLE_HEADER, actor.role.label());
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value).expect("serialize body"))
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
