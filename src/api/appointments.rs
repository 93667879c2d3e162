//! Appointment endpoints.

use crate::api::{caller, ApiError};
use crate::scheduling::lifecycle::{
    AppointmentPatch, NewAppointment, NewComboAppointment, RequestContext,
};
use crate::shared::models::Appointment;
use crate::shared::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<NewAppointment>,
) -> Result<Json<Appointment>, ApiError> {
    let caller = caller(&state, &headers).await;
    let appointment = state.appointments.create(input, caller.as_ref()).await?;
    Ok(Json(appointment))
}

pub async fn create_combo(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<NewComboAppointment>,
) -> Result<Json<Appointment>, ApiError> {
    let caller = caller(&state, &headers).await;
    let appointment = state
        .appointments
        .create_combo_appointment(input, caller.as_ref())
        .await?;
    Ok(Json(appointment))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(patch): Json<AppointmentPatch>,
) -> Result<Json<Appointment>, ApiError> {
    let context = match caller(&state, &headers).await {
        Some(identity) => RequestContext::Authenticated(identity),
        None => RequestContext::Public,
    };
    let appointment = state.appointments.update(id, patch, context).await?;
    Ok(Json(appointment))
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Appointment>, ApiError> {
    let context = match caller(&state, &headers).await {
        Some(identity) => RequestContext::Authenticated(identity),
        None => RequestContext::Public,
    };
    let appointment = state.appointments.cancel(id, context).await?;
    Ok(Json(appointment))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub day: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ConflictParams {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub exclude: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ConflictCheck {
    pub conflict: bool,
}

/// Read-only check for the booking UI: would this window collide?
/// Advisory only, the create path re-checks under its own guard.
pub async fn check_conflict(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<ConflictParams>,
) -> Json<ConflictCheck> {
    let conflict = state
        .conflicts
        .has_conflict(id, params.start_time, params.end_time, params.exclude)
        .await;
    Json(ConflictCheck { conflict })
}

pub async fn list_for_calendar(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Json<Vec<Appointment>> {
    Json(state.appointments.list_for_calendar(id, params.day).await)
}
