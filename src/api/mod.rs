//! HTTP surface.
//!
//! Handlers stay thin: extract, authenticate, delegate to a service,
//! map the typed error to a status code plus a stable error body.

use crate::auth::CallerIdentity;
use crate::billing::BillingError;
use crate::scheduling::SchedulingError;
use crate::shared::state::AppState;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod appointments;
pub mod combos;
pub mod credits;
pub mod services;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/plans", get(credits::list_plans))
        .route("/api/appointments", post(appointments::create))
        .route("/api/appointments/combo", post(appointments::create_combo))
        .route("/api/appointments/:id", put(appointments::update))
        .route("/api/appointments/:id/cancel", post(appointments::cancel))
        .route(
            "/api/calendars/:id/appointments",
            get(appointments::list_for_calendar),
        )
        .route(
            "/api/calendars/:id/conflicts",
            get(appointments::check_conflict),
        )
        .route(
            "/api/services/:id/collaborators",
            get(services::collaborators),
        )
        .route("/api/credits/consume", post(credits::consume))
        .route("/api/credits/balance", get(credits::balance))
        .route("/api/credits/packs", post(credits::grant_pack))
        .route("/api/combos", post(combos::create_template))
        .route("/api/combos/:id/purchase", post(combos::purchase))
        .route("/api/client-combos/:id/consume", post(combos::consume))
        .route("/api/client-combos/:id/detach", post(combos::detach))
        .route("/api/client-combos/:id/sessions", get(combos::sessions))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error body shared by every endpoint. `code` is the stable
/// machine-readable discriminator; `message` is safe to show to users.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: String) -> Self {
        Self {
            status,
            body: ErrorBody { code, message },
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "A valid bearer token is required".to_string(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<SchedulingError> for ApiError {
    fn from(err: SchedulingError) -> Self {
        let status = match err {
            SchedulingError::NotAuthorized | SchedulingError::PendingBasicPlan => {
                StatusCode::FORBIDDEN
            }
            SchedulingError::CalendarNotFound
            | SchedulingError::NotFound
            | SchedulingError::SessionNotFound => StatusCode::NOT_FOUND,
            SchedulingError::SlotUnavailable
            | SchedulingError::ConflictingAppointment
            | SchedulingError::InsufficientCredit
            | SchedulingError::ExpiredPackage => StatusCode::CONFLICT,
            SchedulingError::InvalidWindow => StatusCode::BAD_REQUEST,
            SchedulingError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<crate::combo::ComboError> for ApiError {
    fn from(err: crate::combo::ComboError) -> Self {
        SchedulingError::from(err).into()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        let status = match err {
            BillingError::PlanNotFound(_) => StatusCode::NOT_FOUND,
            BillingError::NoCreditsAvailable => StatusCode::PAYMENT_REQUIRED,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

/// Resolves the bearer token, if any, to a verified caller. A missing
/// or unknown token is an anonymous (public-link) request, not an
/// error; endpoints that require authentication reject `None`.
pub async fn caller(state: &AppState, headers: &HeaderMap) -> Option<CallerIdentity> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    state.identity.caller_identity(token).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduling_error_status_mapping() {
        let conflict = ApiError::from(SchedulingError::ConflictingAppointment);
        assert_eq!(conflict.status, StatusCode::CONFLICT);
        assert_eq!(conflict.body.code, "ConflictingAppointment");

        let missing = ApiError::from(SchedulingError::NotFound);
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let forbidden = ApiError::from(SchedulingError::PendingBasicPlan);
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_billing_error_status_mapping() {
        let refused = ApiError::from(BillingError::NoCreditsAvailable);
        assert_eq!(refused.status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(refused.body.code, "NoCreditsAvailable");
    }
}
