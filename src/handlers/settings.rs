// src/handlers/settings.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::settings::{BudgetSettings, UpdateBudgetSettingsRequest},
};

// GET /api/settings/budget
#[utoipa::path(
    get,
    path = "/api/settings/budget",
    tag = "Settings",
    responses(
        (status = 200, description = "Parâmetros do orçamentista (padrões se nunca gravados)", body = BudgetSettings)
    )
)]
pub async fn get_settings(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let settings = app_state
        .settings_repo
        .current()
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(settings)))
}

// PUT /api/settings/budget
#[utoipa::path(
    put,
    path = "/api/settings/budget",
    tag = "Settings",
    request_body = UpdateBudgetSettingsRequest,
    responses(
        (status = 200, description = "Parâmetros atualizados", body = BudgetSettings),
        (status = 400, description = "Valores fora do intervalo")
    )
)]
pub async fn update_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<UpdateBudgetSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let updated = app_state
        .settings_repo
        .update_settings(&app_state.db_pool, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    tracing::info!("Configurações do orçamentista atualizadas");

    Ok((StatusCode::OK, Json(updated)))
}
