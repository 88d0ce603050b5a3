// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use receta_core::{CrearRecetaRequest, CrearRecetaResponse};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

/// Message of a successful create-and-send.
pub const CREATED_MESSAGE: &str = "Receta creada y enviada exitosamente";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// All routes, with permissive CORS and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/crear-y-enviar-receta", post(crear_y_enviar_receta))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// `POST /api/crear-y-enviar-receta`
async fn crear_y_enviar_receta(
    State(state): State<AppState>,
    payload: Result<Json<CrearRecetaRequest>, JsonRejection>,
) -> Result<Json<CrearRecetaResponse>, ApiError> {
    let Json(request) = payload?;
    let receta_id = state.service.crear_y_enviar(request).await?;
    Ok(Json(CrearRecetaResponse {
        message: CREATED_MESSAGE.to_owned(),
        receta_id,
    }))
}
