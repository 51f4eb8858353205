// src/handlers/catalog.rs

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
        validation::{not_negative, percent},
    },
    config::AppState,
    middleware::i18n::Locale,
    models::{
        budget::EstimateResult,
        catalog::{Material, ServiceType, ServiceTypeDetail, ServiceTypeMaterialInput},
    },
};

// =============================================================================
//  MATERIAIS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Cemento 50kg")]
    pub name: String,

    #[validate(length(min = 1, message = "A unidade é obrigatória."))]
    #[schema(example = "bolsa")]
    pub unit: String,

    #[validate(custom(function = "not_negative"))]
    #[schema(example = "9800")]
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePricePayload {
    #[validate(custom(function = "not_negative"))]
    #[schema(example = "10500")]
    pub unit_price: Decimal,
}

// POST /api/materials
#[utoipa::path(
    post,
    path = "/api/materials",
    tag = "Catalog",
    request_body = CreateMaterialPayload,
    responses(
        (status = 201, description = "Material cadastrado", body = Material),
        (status = 400, description = "Payload inválido")
    )
)]
pub async fn create_material(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateMaterialPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let material = app_state
        .catalog_service
        .create_material(&payload.name, &payload.unit, payload.unit_price)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(material)))
}

// GET /api/materials
#[utoipa::path(
    get,
    path = "/api/materials",
    tag = "Catalog",
    responses(
        (status = 200, description = "Catálogo de materiais", body = Vec<Material>)
    )
)]
pub async fn list_materials(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let materials = app_state
        .catalog_service
        .list_materials()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(materials)))
}

// PUT /api/materials/{id}/price
#[utoipa::path(
    put,
    path = "/api/materials/{id}/price",
    tag = "Catalog",
    request_body = UpdatePricePayload,
    params(("id" = i64, Path, description = "ID do material")),
    responses(
        (status = 200, description = "Preço atualizado", body = Material),
        (status = 404, description = "Material não encontrado")
    )
)]
pub async fn update_material_price(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(material_id): Path<i64>,
    Json(payload): Json<UpdatePricePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let material = app_state
        .catalog_service
        .update_material_price(material_id, payload.unit_price)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(material)))
}

// =============================================================================
//  TIPOS DE SERVIÇO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTypePayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Mampostería 12cm")]
    pub name: String,

    #[validate(length(min = 1, message = "A unidade é obrigatória."))]
    #[schema(example = "m2")]
    pub unit: String,

    #[validate(custom(function = "not_negative"))]
    #[schema(example = "8")]
    pub productivity_rate: Option<Decimal>,

    #[validate(custom(function = "not_negative"))]
    #[schema(example = "95000")]
    pub labor_cost_per_day: Option<Decimal>,

    #[validate(custom(function = "percent"))]
    #[serde(default)]
    pub social_charges_percent: Decimal,

    #[serde(default)]
    pub includes_social_charges: bool,

    #[validate(nested)]
    #[serde(default)]
    pub materials: Vec<ServiceTypeMaterialInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimatePayload {
    #[schema(example = "20")]
    pub quantity: Decimal,
}

// POST /api/service-types
#[utoipa::path(
    post,
    path = "/api/service-types",
    tag = "Catalog",
    request_body = ServiceTypePayload,
    responses(
        (status = 201, description = "Tipo de serviço criado com os materiais", body = ServiceTypeDetail),
        (status = 404, description = "Material do template não existe")
    )
)]
pub async fn create_service_type(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<ServiceTypePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .catalog_service
        .create_service_type(
            &payload.name,
            &payload.unit,
            payload.productivity_rate,
            payload.labor_cost_per_day,
            payload.social_charges_percent,
            payload.includes_social_charges,
            &payload.materials,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/service-types
#[utoipa::path(
    get,
    path = "/api/service-types",
    tag = "Catalog",
    responses(
        (status = 200, description = "Tipos de serviço", body = Vec<ServiceType>)
    )
)]
pub async fn list_service_types(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let types = app_state
        .catalog_service
        .list_service_types()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(types)))
}

// GET /api/service-types/{id}
#[utoipa::path(
    get,
    path = "/api/service-types/{id}",
    tag = "Catalog",
    params(("id" = i64, Path, description = "ID do tipo de serviço")),
    responses(
        (status = 200, description = "Tipo de serviço com materiais", body = ServiceTypeDetail),
        (status = 404, description = "Não encontrado")
    )
)]
pub async fn get_service_type(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(service_type_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .catalog_service
        .get_service_type(service_type_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// PUT /api/service-types/{id}
#[utoipa::path(
    put,
    path = "/api/service-types/{id}",
    tag = "Catalog",
    request_body = ServiceTypePayload,
    params(("id" = i64, Path, description = "ID do tipo de serviço")),
    responses(
        (status = 200, description = "Template atualizado (lista de materiais substituída)", body = ServiceTypeDetail),
        (status = 404, description = "Tipo de serviço ou material não encontrado")
    )
)]
pub async fn update_service_type(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(service_type_id): Path<i64>,
    Json(payload): Json<ServiceTypePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .catalog_service
        .update_service_type(
            service_type_id,
            &payload.name,
            &payload.unit,
            payload.productivity_rate,
            payload.labor_cost_per_day,
            payload.social_charges_percent,
            payload.includes_social_charges,
            &payload.materials,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// DELETE /api/service-types/{id}
#[utoipa::path(
    delete,
    path = "/api/service-types/{id}",
    tag = "Catalog",
    params(("id" = i64, Path, description = "ID do tipo de serviço")),
    responses(
        (status = 204, description = "Removido (rubros e itens existentes não mudam)"),
        (status = 404, description = "Não encontrado")
    )
)]
pub async fn delete_service_type(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(service_type_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .catalog_service
        .delete_service_type(service_type_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/service-types/{id}/estimate
#[utoipa::path(
    post,
    path = "/api/service-types/{id}/estimate",
    tag = "Catalog",
    request_body = EstimatePayload,
    params(("id" = i64, Path, description = "ID do tipo de serviço")),
    responses(
        (status = 200, description = "Estimativa de custos", body = EstimateResult),
        (status = 400, description = "Quantidade inválida")
    )
)]
pub async fn estimate(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(service_type_id): Path<i64>,
    Json(payload): Json<EstimatePayload>,
) -> Result<impl IntoResponse, ApiError> {
    // Sem `validate()`: quantidade <= 0 vira InvalidQuantity no estimador
    let result = app_state
        .catalog_service
        .estimate(service_type_id, payload.quantity)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(result)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_lines_are_validated_on_edit() {
        let payload: ServiceTypePayload = serde_json::from_str(
            r#"{
                "name": "Mampostería 12cm",
                "unit": "m2",
                "productivityRate": 8,
                "laborCostPerDay": 95000,
                "materials": [
                    { "materialId": 7, "quantityPerUnit": 12 },
                    { "materialId": 9, "quantityPerUnit": 0 }
                ]
            }"#,
        )
        .unwrap();

        let errors = payload.validate().unwrap_err();

        assert!(errors.errors().contains_key("materials"));
    }

    #[test]
    fn materials_default_to_empty_list() {
        let payload: ServiceTypePayload =
            serde_json::from_str(r#"{ "name": "Pintura", "unit": "m2" }"#).unwrap();

        assert!(payload.validate().is_ok());
        assert!(payload.materials.is_empty());
        assert_eq!(payload.social_charges_percent, Decimal::ZERO);
    }
}
