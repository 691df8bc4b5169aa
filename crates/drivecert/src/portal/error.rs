use validator::ValidationErrors;

use super::access::AccessError;

/// Storage failures surfaced by the repository traits.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("student is already registered")]
    AlreadyRegistered,
    #[error("capacity of {capacity} seats is exhausted")]
    CapacityReached { capacity: u32 },
    #[error("capacity {capacity} is below the {in_use} seats already taken")]
    CapacityBelowUsage { capacity: u32, in_use: u32 },
    #[error("record changed while the request was processed; reload and retry")]
    Stale,
    #[error("registration is closed while the status is '{status}'")]
    RegistrationClosed { status: &'static str },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Domain failure raised by the portal services.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("status cannot move from '{from}' to '{to}'")]
    InvalidTransition { from: &'static str, to: &'static str },
    #[error("record cannot be edited while its status is '{status}'")]
    NotEditable { status: &'static str },
    #[error("{0}")]
    Conflict(String),
    #[error("center '{center_id}' has no accepted accreditation application")]
    NotApproved { center_id: String },
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl PortalError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<ValidationErrors> for PortalError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, _)| field.to_string())
            .collect();
        fields.sort();
        Self::Validation(format!("invalid fields: {}", fields.join(", ")))
    }
}
