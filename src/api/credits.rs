//! Plan and AI credit endpoints.

use crate::api::{caller, ApiError};
use crate::billing::credits::{CreditBalance, CreditConsumption};
use crate::billing::PlanConfig;
use crate::shared::models::AdditionalAiCredit;
use crate::shared::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct PlanEntry {
    pub id: String,
    #[serde(flatten)]
    pub plan: PlanConfig,
}

pub async fn list_plans(State(state): State<Arc<AppState>>) -> Json<Vec<PlanEntry>> {
    let mut plans: Vec<PlanEntry> = state
        .subscriptions
        .list_plans()
        .into_iter()
        .map(|(id, plan)| PlanEntry {
            id: id.clone(),
            plan: plan.clone(),
        })
        .collect();
    plans.sort_by(|a, b| a.id.cmp(&b.id));
    Json(plans)
}

#[derive(Debug, Deserialize)]
pub struct ConsumeRequest {
    pub client_phone: String,
    pub conversation_id: String,
    pub service_type: String,
    pub source: String,
}

pub async fn consume(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ConsumeRequest>,
) -> Result<Json<CreditConsumption>, ApiError> {
    let identity = caller(&state, &headers).await.ok_or_else(ApiError::unauthorized)?;
    let consumption = state
        .credits
        .consume_credit(
            identity.id,
            &request.client_phone,
            &request.conversation_id,
            &request.service_type,
            &request.source,
        )
        .await?;
    Ok(Json(consumption))
}

pub async fn balance(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CreditBalance>, ApiError> {
    let identity = caller(&state, &headers).await.ok_or_else(ApiError::unauthorized)?;
    Ok(Json(state.credits.remaining_credits(identity.id).await))
}

#[derive(Debug, Deserialize)]
pub struct GrantPackRequest {
    pub quantity: u32,
}

pub async fn grant_pack(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<GrantPackRequest>,
) -> Result<Json<AdditionalAiCredit>, ApiError> {
    let identity = caller(&state, &headers).await.ok_or_else(ApiError::unauthorized)?;
    Ok(Json(state.credits.grant_pack(identity.id, request.quantity).await))
}
