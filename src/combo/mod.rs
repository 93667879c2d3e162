use serde::Serialize;

pub mod ledger;

pub use ledger::ComboLedger;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ComboError {
    #[error("No session found for this package and service")]
    SessionNotFound,
    #[error("No sessions left for this service in the package")]
    InsufficientCredit,
    #[error("This package has expired")]
    ExpiredPackage,
    #[error("Package not found")]
    NotFound,
}

impl ComboError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "SessionNotFound",
            Self::InsufficientCredit => "InsufficientCredit",
            Self::ExpiredPackage => "ExpiredPackage",
            Self::NotFound => "NotFound",
        }
    }
}

/// Collaborator fields carried into an appointment on a service swap.
#[derive(Debug, Clone, Serialize)]
pub struct CollaboratorInfo {
    pub id: uuid::Uuid,
    pub name: String,
}
