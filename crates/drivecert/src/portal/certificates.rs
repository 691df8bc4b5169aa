//! Certificates issued when an application, enrollment, or exam seat reaches its accepted
//! terminal state.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::access::Actor;
use super::error::{PortalError, RepositoryError};
use super::extract::QueryParams;
use super::ids::{ApplicationId, CertificateId, EnrollmentId, RegistrationId, Sequence, UserId};
use super::PortalState;
use crate::error::AppError;

/// Record a certificate was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CertificateOwner {
    Application(ApplicationId),
    Enrollment(EnrollmentId),
    ExamRegistration(RegistrationId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    pub certificate_number: String,
    pub issued_at: DateTime<Utc>,
    pub holder_id: UserId,
    pub owner: CertificateOwner,
    pub title: String,
}

/// Storage for issued certificates. `insert` must reject a second certificate for the same
/// owner with `RepositoryError::Conflict`.
pub trait CertificateRepository: Send + Sync {
    fn insert(&self, certificate: Certificate) -> Result<Certificate, RepositoryError>;
    fn fetch(&self, id: &CertificateId) -> Result<Option<Certificate>, RepositoryError>;
    fn by_owner(&self, owner: &CertificateOwner) -> Result<Option<Certificate>, RepositoryError>;
    fn list(&self) -> Result<Vec<Certificate>, RepositoryError>;
}

pub struct CertificateService {
    repository: Arc<dyn CertificateRepository>,
    ids: Sequence,
    numbers: Sequence,
}

impl CertificateService {
    pub fn new(repository: Arc<dyn CertificateRepository>) -> Self {
        Self {
            repository,
            ids: Sequence::new("cert"),
            numbers: Sequence::new("DC"),
        }
    }

    /// Issue a certificate for `owner`. Issuing twice returns the existing certificate.
    pub fn issue(
        &self,
        owner: CertificateOwner,
        holder_id: UserId,
        title: impl Into<String>,
    ) -> Result<Certificate, PortalError> {
        if let Some(existing) = self.repository.by_owner(&owner)? {
            return Ok(existing);
        }

        let issued_at = Utc::now();
        let certificate = Certificate {
            id: self.ids.next_id(),
            certificate_number: format!("DC-{}-{:06}", issued_at.year(), self.numbers.next_value()),
            issued_at,
            holder_id,
            owner: owner.clone(),
            title: title.into(),
        };

        match self.repository.insert(certificate) {
            Ok(stored) => {
                info!(
                    certificate_id = %stored.id,
                    number = %stored.certificate_number,
                    holder = %stored.holder_id,
                    "certificate issued"
                );
                Ok(stored)
            }
            Err(RepositoryError::Conflict) => self
                .repository
                .by_owner(&owner)?
                .ok_or(PortalError::Repository(RepositoryError::Conflict)),
            Err(other) => Err(other.into()),
        }
    }

    pub fn get(&self, id: &CertificateId) -> Result<Certificate, PortalError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| PortalError::not_found("certificate", id.as_str()))
    }

    pub fn by_owner(&self, owner: &CertificateOwner) -> Result<Option<Certificate>, PortalError> {
        Ok(self.repository.by_owner(owner)?)
    }

    /// Students and centers see their own certificates; reviewers may list any holder.
    pub fn list(
        &self,
        actor: &Actor,
        holder: Option<UserId>,
    ) -> Result<Vec<Certificate>, PortalError> {
        let holder = match holder {
            Some(holder) => {
                actor.require_owner_or_reviewer(&holder)?;
                Some(holder)
            }
            None if actor.is_reviewer() => None,
            None => Some(actor.id.clone()),
        };

        let mut certificates = self.repository.list()?;
        if let Some(holder) = holder {
            certificates.retain(|certificate| certificate.holder_id == holder);
        }
        certificates.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(certificates)
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CertificateQuery {
    #[serde(default)]
    holder: Option<String>,
}

pub(crate) fn routes() -> Router<PortalState> {
    Router::new()
        .route("/api/certificates", get(list_handler))
        .route("/api/certificates/:certificate_id", get(get_handler))
}

async fn list_handler(
    State(service): State<Arc<CertificateService>>,
    actor: Actor,
    QueryParams(query): QueryParams<CertificateQuery>,
) -> Result<Json<Vec<Certificate>>, AppError> {
    let holder = query
        .holder
        .filter(|holder| !holder.trim().is_empty())
        .map(UserId::from);
    Ok(Json(service.list(&actor, holder)?))
}

async fn get_handler(
    State(service): State<Arc<CertificateService>>,
    Path(certificate_id): Path<String>,
) -> Result<Json<Certificate>, AppError> {
    Ok(Json(service.get(&CertificateId(certificate_id))?))
}
