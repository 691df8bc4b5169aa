//! Caller identity and role checks.
//!
//! Authentication happens upstream; the gateway forwards the account id and role in the
//! `x-user-id` and `x-user-role` headers.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use super::ids::UserId;
use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    TrainingCenter,
    TestingCenter,
    Student,
    Admin,
    SuperAdmin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::TrainingCenter => "training_center",
            Role::TestingCenter => "testing_center",
            Role::Student => "student",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "training_center" => Some(Role::TrainingCenter),
            "testing_center" => Some(Role::TestingCenter),
            "student" => Some(Role::Student),
            "admin" => Some(Role::Admin),
            "super_admin" | "superadmin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("missing caller identity headers")]
    MissingIdentity,
    #[error("unknown role '{0}'")]
    UnknownRole(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AccessError> {
        let id = headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AccessError::MissingIdentity)?;
        let raw_role = headers
            .get(USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(AccessError::MissingIdentity)?;
        let role =
            Role::parse(raw_role).ok_or_else(|| AccessError::UnknownRole(raw_role.to_string()))?;

        Ok(Self::new(id, role))
    }

    pub fn is_reviewer(&self) -> bool {
        matches!(self.role, Role::Admin | Role::SuperAdmin)
    }

    pub fn require_reviewer(&self) -> Result<(), AccessError> {
        if self.is_reviewer() {
            Ok(())
        } else {
            Err(AccessError::Forbidden(
                "admin or super admin access required".to_string(),
            ))
        }
    }

    pub fn require_role(&self, role: Role) -> Result<(), AccessError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AccessError::Forbidden(format!(
                "{} access required",
                role.label()
            )))
        }
    }

    /// Owners and reviewers may act on a record.
    pub fn require_owner_or_reviewer(&self, owner: &UserId) -> Result<(), AccessError> {
        if self.is_reviewer() || &self.id == owner {
            Ok(())
        } else {
            Err(AccessError::Forbidden(
                "record belongs to another account".to_string(),
            ))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Actor::from_headers(&parts.headers).map_err(AppError::from)
    }
}
