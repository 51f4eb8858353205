// src/handlers/projects.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::not_negative,
    },
    config::AppState,
    middleware::i18n::Locale,
    models::{
        finance::{CashMovement, MovementType, NewCashMovement},
        project::{ApplyOutcome, ProjectDetail, ProjectProgress},
    },
};

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub enum LaborKind {
    #[serde(rename = "mano_obra")]
    ManoObra,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyLaborBody {
    pub rubro_id: i64,
    #[serde(rename = "type")]
    pub kind: LaborKind,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyMaterialBody {
    pub material_id: i64,
    #[schema(example = "5")]
    pub cantidad: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRubroBody {
    pub rubro_id: i64,
    #[schema(example = "12.5")]
    pub cantidad_aplicada: Decimal,
}

/// Corpo do POST /apply. A forma do JSON decide a operação:
/// `{ rubroId, type: "mano_obra" }`, `{ materialId, cantidad }` ou `{ rubroId, cantidadAplicada }`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ApplyProgressPayload {
    Labor(ApplyLaborBody),
    Material(ApplyMaterialBody),
    Rubro(ApplyRubroBody),
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCashMovementPayload {
    pub movement_type: MovementType,

    #[validate(custom(function = "not_negative"))]
    #[schema(example = "12000")]
    pub amount: Decimal,

    #[validate(length(min = 1, message = "A categoria é obrigatória."))]
    #[schema(example = "Ajuste")]
    pub category: String,

    pub note: Option<String>,
}

// GET /api/projects/{id}
#[utoipa::path(
    get,
    path = "/api/projects/{id}",
    tag = "Projects",
    params(("id" = i64, Path, description = "ID da obra")),
    responses(
        (status = 200, description = "Obra com rubros e materiais", body = ProjectDetail),
        (status = 404, description = "Não encontrada")
    )
)]
pub async fn get_project(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(project_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .project_service
        .get_detail(project_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// GET /api/projects/{id}/progress
#[utoipa::path(
    get,
    path = "/api/projects/{id}/progress",
    tag = "Projects",
    params(("id" = i64, Path, description = "ID da obra")),
    responses(
        (status = 200, description = "Avanço por rubro e material", body = ProjectProgress)
    )
)]
pub async fn get_progress(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(project_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let progress = app_state
        .project_service
        .get_progress(project_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(progress)))
}

// POST /api/projects/{id}/apply
#[utoipa::path(
    post,
    path = "/api/projects/{id}/apply",
    tag = "Projects",
    request_body = ApplyProgressPayload,
    params(("id" = i64, Path, description = "ID da obra")),
    responses(
        (status = 200, description = "Avanço aplicado", body = ApplyOutcome),
        (status = 400, description = "Quantidade inválida"),
        (status = 404, description = "Rubro ou material não pertence à obra"),
        (status = 409, description = "Excede o restante ou mão de obra já aplicada")
    )
)]
pub async fn apply_progress(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(project_id): Path<i64>,
    Json(payload): Json<ApplyProgressPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let service = &app_state.progress_service;

    let outcome = match payload {
        ApplyProgressPayload::Labor(ApplyLaborBody { rubro_id, kind: LaborKind::ManoObra }) => {
            service.apply_labor(project_id, rubro_id).await
        }
        ApplyProgressPayload::Material(body) => {
            service.apply_material(project_id, body.material_id, body.cantidad).await
        }
        ApplyProgressPayload::Rubro(body) => {
            service.apply_rubro_progress(project_id, body.rubro_id, body.cantidad_aplicada).await
        }
    }
    .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(outcome)))
}

// GET /api/projects/{id}/cash-movements
#[utoipa::path(
    get,
    path = "/api/projects/{id}/cash-movements",
    tag = "Projects",
    params(("id" = i64, Path, description = "ID da obra")),
    responses(
        (status = 200, description = "Lançamentos da obra em ordem cronológica", body = Vec<CashMovement>)
    )
)]
pub async fn list_cash_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(project_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let movements = app_state
        .finance_service
        .list_project_movements(project_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(movements)))
}

// POST /api/projects/{id}/cash-movements
#[utoipa::path(
    post,
    path = "/api/projects/{id}/cash-movements",
    tag = "Projects",
    request_body = CreateCashMovementPayload,
    params(("id" = i64, Path, description = "ID da obra")),
    responses(
        (status = 201, description = "Lançamento manual registrado", body = CashMovement)
    )
)]
pub async fn create_cash_movement(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(project_id): Path<i64>,
    Json(payload): Json<CreateCashMovementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let movement = NewCashMovement {
        project_id: Some(project_id),
        movement_type: payload.movement_type,
        amount: payload.amount,
        category: payload.category,
        note: payload.note,
    };

    let created = app_state
        .finance_service
        .create_manual_movement(movement)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn material_body_selects_material_application() {
        let payload: ApplyProgressPayload =
            serde_json::from_str(r#"{ "materialId": 7, "cantidad": 5 }"#).unwrap();

        assert!(matches!(
            payload,
            ApplyProgressPayload::Material(ApplyMaterialBody { material_id: 7, cantidad }) if cantidad == dec!(5)
        ));
    }

    #[test]
    fn labor_body_selects_labor_application() {
        let payload: ApplyProgressPayload =
            serde_json::from_str(r#"{ "rubroId": 2, "type": "mano_obra" }"#).unwrap();

        assert!(matches!(payload, ApplyProgressPayload::Labor(ApplyLaborBody { rubro_id: 2, .. })));
    }

    #[test]
    fn rubro_body_selects_rubro_progress() {
        let payload: ApplyProgressPayload =
            serde_json::from_str(r#"{ "rubroId": 2, "cantidadAplicada": 12.5 }"#).unwrap();

        assert!(matches!(
            payload,
            ApplyProgressPayload::Rubro(ApplyRubroBody { rubro_id: 2, cantidad_aplicada })
                if cantidad_aplicada == dec!(12.5)
        ));
    }

    #[test]
    fn unknown_labor_kind_is_rejected() {
        let result = serde_json::from_str::<ApplyProgressPayload>(r#"{ "rubroId": 2, "type": "otro" }"#);
        assert!(result.is_err());
    }
}
