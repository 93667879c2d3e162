//! Combo template and package endpoints.

use crate::api::{caller, ApiError};
use crate::combo::ComboError;
use crate::shared::models::{ClientCombo, ClientComboSession, Combo, ComboItem, DiscountPolicy};
use crate::shared::state::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct NewComboTemplate {
    pub name: String,
    pub items: Vec<ComboItem>,
    pub discount: DiscountPolicy,
}

pub async fn create_template(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<NewComboTemplate>,
) -> Result<Json<Combo>, ApiError> {
    let identity = caller(&state, &headers).await.ok_or_else(ApiError::unauthorized)?;
    let combo = state
        .combos
        .create_template(identity.id, &input.name, input.items, input.discount)
        .await;
    Ok(Json(combo))
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub client_id: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
}

pub async fn purchase(
    State(state): State<Arc<AppState>>,
    Path(combo_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<PurchaseRequest>,
) -> Result<Json<ClientCombo>, ApiError> {
    let identity = caller(&state, &headers).await.ok_or_else(ApiError::unauthorized)?;
    // Templates of other tenants are indistinguishable from missing.
    {
        let tables = state.store.read().await;
        match tables.combos.get(&combo_id) {
            Some(template) if template.tenant_id == identity.id => {}
            _ => return Err(ComboError::NotFound.into()),
        }
    }
    let client_combo = state
        .combos
        .purchase(request.client_id, combo_id, request.expires_at)
        .await?;
    Ok(Json(client_combo))
}

/// Looks up a client combo and enforces that it belongs to the caller.
async fn owned_client_combo(
    state: &AppState,
    headers: &HeaderMap,
    client_combo_id: Uuid,
) -> Result<(), ApiError> {
    let identity = caller(state, headers).await.ok_or_else(ApiError::unauthorized)?;
    let tables = state.store.read().await;
    match tables.client_combos.get(&client_combo_id) {
        Some(combo) if combo.tenant_id == identity.id => Ok(()),
        _ => Err(ComboError::NotFound.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ConsumeSessionRequest {
    pub service_id: Uuid,
}

pub async fn consume(
    State(state): State<Arc<AppState>>,
    Path(client_combo_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<ConsumeSessionRequest>,
) -> Result<Json<ClientComboSession>, ApiError> {
    owned_client_combo(&state, &headers, client_combo_id).await?;
    let session = state.combos.consume(client_combo_id, request.service_id).await?;
    Ok(Json(session))
}

pub async fn detach(
    State(state): State<Arc<AppState>>,
    Path(client_combo_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ClientCombo>, ApiError> {
    owned_client_combo(&state, &headers, client_combo_id).await?;
    let client_combo = state.combos.detach(client_combo_id).await?;
    Ok(Json(client_combo))
}

pub async fn sessions(
    State(state): State<Arc<AppState>>,
    Path(client_combo_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Vec<ClientComboSession>>, ApiError> {
    owned_client_combo(&state, &headers, client_combo_id).await?;
    Ok(Json(state.combos.sessions(client_combo_id).await?))
}
