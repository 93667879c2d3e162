use crate::combo::ComboError;

pub mod availability;
pub mod conflict;
pub mod lifecycle;

pub use availability::is_collaborator_available;
pub use conflict::{overlaps, ConflictDetector};
pub use lifecycle::AppointmentService;

/// Outcomes a booking caller is expected to handle. Messages are safe
/// to show to end users; `code()` is the stable discriminator.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("You are not allowed to modify this appointment")]
    NotAuthorized,
    #[error("Editing appointments requires an active paid plan")]
    PendingBasicPlan,
    #[error("Calendar not found")]
    CalendarNotFound,
    #[error("Appointment not found")]
    NotFound,
    #[error("The collaborator is not working at the requested time")]
    SlotUnavailable,
    #[error("The requested time conflicts with an existing appointment")]
    ConflictingAppointment,
    #[error("The appointment must start before it ends")]
    InvalidWindow,
    #[error("No session found for this package and service")]
    SessionNotFound,
    #[error("No sessions left for this service in the package")]
    InsufficientCredit,
    #[error("This package has expired")]
    ExpiredPackage,
    #[error("The operation could not be completed")]
    Internal,
}

impl SchedulingError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAuthorized => "NotAuthorized",
            Self::PendingBasicPlan => "PendingBasicPlan",
            Self::CalendarNotFound => "CalendarNotFound",
            Self::NotFound => "NotFound",
            Self::SlotUnavailable => "SlotUnavailable",
            Self::ConflictingAppointment => "ConflictingAppointment",
            Self::InvalidWindow => "InvalidWindow",
            Self::SessionNotFound => "SessionNotFound",
            Self::InsufficientCredit => "InsufficientCredit",
            Self::ExpiredPackage => "ExpiredPackage",
            Self::Internal => "Internal",
        }
    }
}

impl From<ComboError> for SchedulingError {
    fn from(err: ComboError) -> Self {
        match err {
            ComboError::SessionNotFound => Self::SessionNotFound,
            ComboError::InsufficientCredit => Self::InsufficientCredit,
            ComboError::ExpiredPackage => Self::ExpiredPackage,
            ComboError::NotFound => Self::NotFound,
        }
    }
}
