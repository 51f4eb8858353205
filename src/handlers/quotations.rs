// src/handlers/quotations.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::{not_negative, percent},
    },
    config::AppState,
    middleware::i18n::Locale,
    models::{
        budget::{Quotation, QuotationDetail, QuotationItem, QuotationOverview, QuotationStatus},
        project::ProjectDetail,
    },
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuotationPayload {
    pub client_id: Option<i64>,

    #[validate(length(min = 1, message = "O título é obrigatório."))]
    #[schema(example = "Ampliación casa Gómez")]
    pub title: String,

    pub notes: Option<String>,

    // Padrão: true
    pub apply_margin: Option<bool>,

    // Padrão: margem das configurações
    #[validate(custom(function = "percent"))]
    #[schema(example = "25")]
    pub margin_percent: Option<Decimal>,
}

/// Item de template (`serviceTypeId`) ou manual (`manualPrice` + descrição + unidade).
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItemPayload {
    #[schema(example = 3)]
    pub service_type_id: Option<i64>,

    #[schema(example = "20")]
    pub quantity: Decimal,

    pub description: Option<String>,

    pub unit: Option<String>,

    #[validate(custom(function = "not_negative"))]
    pub manual_price: Option<Decimal>,
}

impl AddItemPayload {
    // Regra: item sem template precisa de preço, descrição e unidade
    fn validate_consistency(&self) -> Result<(), (&'static str, ValidationError)> {
        if self.service_type_id.is_some() {
            if self.manual_price.is_some() {
                return Err(("manualPrice", ValidationError::new("ManualPriceOnTemplateItem")));
            }
            return Ok(());
        }

        if self.manual_price.is_none() {
            return Err(("manualPrice", ValidationError::new("ManualPriceRequired")));
        }
        if self.description.as_deref().is_none_or(|d| d.trim().is_empty()) {
            return Err(("description", ValidationError::new("DescriptionRequired")));
        }
        if self.unit.as_deref().is_none_or(|u| u.trim().is_empty()) {
            return Err(("unit", ValidationError::new("UnitRequired")));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemPayload {
    pub description: Option<String>,

    #[schema(example = "25")]
    pub quantity: Option<Decimal>,

    #[validate(custom(function = "not_negative"))]
    pub manual_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCustomMaterialPayload {
    pub material_id: Option<i64>,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Flete")]
    pub name: String,

    #[schema(example = "1")]
    pub quantity: Decimal,

    #[validate(length(min = 1, message = "A unidade é obrigatória."))]
    #[schema(example = "gl")]
    pub unit: String,

    #[validate(custom(function = "not_negative"))]
    #[schema(example = "35000")]
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMarginPayload {
    pub apply_margin: bool,

    #[validate(custom(function = "percent"))]
    #[schema(example = "25")]
    pub margin_percent: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionStatusPayload {
    pub status: QuotationStatus,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectPayload {
    // Padrão: título do orçamento
    pub name: Option<String>,
}

// =============================================================================
//  CABEÇALHO
// =============================================================================

// POST /api/quotations
#[utoipa::path(
    post,
    path = "/api/quotations",
    tag = "Quotations",
    request_body = CreateQuotationPayload,
    responses(
        (status = 201, description = "Orçamento criado em rascunho", body = Quotation)
    )
)]
pub async fn create_quotation(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateQuotationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let quotation = app_state
        .quotation_service
        .create_quotation(
            payload.client_id,
            &payload.title,
            payload.notes.as_deref(),
            payload.apply_margin,
            payload.margin_percent,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(quotation)))
}

// GET /api/quotations
#[utoipa::path(
    get,
    path = "/api/quotations",
    tag = "Quotations",
    responses(
        (status = 200, description = "Orçamentos", body = Vec<Quotation>)
    )
)]
pub async fn list_quotations(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let quotations = app_state
        .quotation_service
        .list_quotations()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(quotations)))
}

// GET /api/quotations/{id}
#[utoipa::path(
    get,
    path = "/api/quotations/{id}",
    tag = "Quotations",
    params(("id" = i64, Path, description = "ID do orçamento")),
    responses(
        (status = 200, description = "Orçamento com itens e materiais", body = QuotationDetail),
        (status = 404, description = "Não encontrado")
    )
)]
pub async fn get_quotation(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(quotation_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .quotation_service
        .get_detail(quotation_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// GET /api/quotations/{id}/summary
#[utoipa::path(
    get,
    path = "/api/quotations/{id}/summary",
    tag = "Quotations",
    params(("id" = i64, Path, description = "ID do orçamento")),
    responses(
        (status = 200, description = "Custo base, margem, total, lista de compras e prévia comercial", body = QuotationOverview)
    )
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(quotation_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let overview = app_state
        .quotation_service
        .overview(quotation_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(overview)))
}

// PUT /api/quotations/{id}/margin
#[utoipa::path(
    put,
    path = "/api/quotations/{id}/margin",
    tag = "Quotations",
    request_body = UpdateMarginPayload,
    params(("id" = i64, Path, description = "ID do orçamento")),
    responses(
        (status = 200, description = "Margem atualizada e total recalculado", body = Quotation),
        (status = 409, description = "Orçamento bloqueado")
    )
)]
pub async fn update_margin(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(quotation_id): Path<i64>,
    Json(payload): Json<UpdateMarginPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let quotation = app_state
        .quotation_service
        .update_margin(quotation_id, payload.apply_margin, payload.margin_percent)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(quotation)))
}

// POST /api/quotations/{id}/status
#[utoipa::path(
    post,
    path = "/api/quotations/{id}/status",
    tag = "Quotations",
    request_body = TransitionStatusPayload,
    params(("id" = i64, Path, description = "ID do orçamento")),
    responses(
        (status = 200, description = "Status alterado", body = Quotation),
        (status = 409, description = "Transição inválida")
    )
)]
pub async fn transition_status(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(quotation_id): Path<i64>,
    Json(payload): Json<TransitionStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let quotation = app_state
        .quotation_service
        .transition_status(quotation_id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(quotation)))
}

// =============================================================================
//  ITENS
// =============================================================================

// POST /api/quotations/{id}/items
#[utoipa::path(
    post,
    path = "/api/quotations/{id}/items",
    tag = "Quotations",
    request_body = AddItemPayload,
    params(("id" = i64, Path, description = "ID do orçamento")),
    responses(
        (status = 201, description = "Item adicionado", body = QuotationItem),
        (status = 400, description = "Quantidade inválida ou payload inconsistente"),
        (status = 409, description = "Orçamento bloqueado")
    )
)]
pub async fn add_item(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(quotation_id): Path<i64>,
    Json(payload): Json<AddItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    payload.validate_consistency().map_err(|(field, e)| {
        let mut errors = validator::ValidationErrors::new();
        errors.add(field, e);
        AppError::ValidationError(errors).to_api_error(&locale, &app_state.i18n_store)
    })?;

    let result = match (payload.service_type_id, payload.manual_price) {
        (Some(service_type_id), _) => {
            app_state
                .quotation_service
                .add_template_item(
                    quotation_id,
                    service_type_id,
                    payload.quantity,
                    payload.description.as_deref(),
                )
                .await
        }
        (None, Some(manual_price)) => {
            app_state
                .quotation_service
                .add_manual_item(
                    quotation_id,
                    payload.description.as_deref().unwrap_or_default(),
                    payload.quantity,
                    payload.unit.as_deref().unwrap_or_default(),
                    manual_price,
                )
                .await
        }
        // Já barrado por validate_consistency
        (None, None) => Err(AppError::InvalidQuantity { quantity: payload.quantity, max: None }),
    };

    let item = result.map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(item)))
}

// PUT /api/quotations/{id}/items/{itemId}
#[utoipa::path(
    put,
    path = "/api/quotations/{id}/items/{item_id}",
    tag = "Quotations",
    request_body = UpdateItemPayload,
    params(
        ("id" = i64, Path, description = "ID do orçamento"),
        ("item_id" = i64, Path, description = "ID do item")
    ),
    responses(
        (status = 200, description = "Item recalculado", body = QuotationItem),
        (status = 409, description = "Orçamento bloqueado")
    )
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((quotation_id, item_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .quotation_service
        .update_item(
            quotation_id,
            item_id,
            payload.description.as_deref(),
            payload.quantity,
            payload.manual_price,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(item)))
}

// DELETE /api/quotations/{id}/items/{itemId}
#[utoipa::path(
    delete,
    path = "/api/quotations/{id}/items/{item_id}",
    tag = "Quotations",
    params(
        ("id" = i64, Path, description = "ID do orçamento"),
        ("item_id" = i64, Path, description = "ID do item")
    ),
    responses(
        (status = 204, description = "Item removido"),
        (status = 404, description = "Item não encontrado")
    )
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((quotation_id, item_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .quotation_service
        .delete_item(quotation_id, item_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/quotations/{id}/items/{itemId}/materials
#[utoipa::path(
    post,
    path = "/api/quotations/{id}/items/{item_id}/materials",
    tag = "Quotations",
    request_body = AddCustomMaterialPayload,
    params(
        ("id" = i64, Path, description = "ID do orçamento"),
        ("item_id" = i64, Path, description = "ID do item")
    ),
    responses(
        (status = 201, description = "Linha avulsa adicionada", body = QuotationItem)
    )
)]
pub async fn add_custom_material(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((quotation_id, item_id)): Path<(i64, i64)>,
    Json(payload): Json<AddCustomMaterialPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .quotation_service
        .add_custom_material(
            quotation_id,
            item_id,
            payload.material_id,
            &payload.name,
            payload.quantity,
            &payload.unit,
            payload.unit_price,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(item)))
}

// =============================================================================
//  CONVERSÃO EM OBRA
// =============================================================================

// POST /api/quotations/{id}/project
#[utoipa::path(
    post,
    path = "/api/quotations/{id}/project",
    tag = "Quotations",
    request_body = CreateProjectPayload,
    params(("id" = i64, Path, description = "ID do orçamento")),
    responses(
        (status = 201, description = "Obra criada com os rubros materializados", body = ProjectDetail),
        (status = 409, description = "Orçamento não pago ou já convertido")
    )
)]
pub async fn create_project(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(quotation_id): Path<i64>,
    Json(payload): Json<CreateProjectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let project = app_state
        .project_service
        .create_from_quotation(quotation_id, payload.name.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(project)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payload(service_type_id: Option<i64>, manual_price: Option<Decimal>) -> AddItemPayload {
        AddItemPayload {
            service_type_id,
            quantity: dec!(1),
            description: Some("Limpieza final".to_string()),
            unit: Some("gl".to_string()),
            manual_price,
        }
    }

    #[test]
    fn template_item_needs_only_the_service_type() {
        assert!(payload(Some(3), None).validate_consistency().is_ok());
    }

    #[test]
    fn template_item_rejects_manual_price() {
        let err = payload(Some(3), Some(dec!(100))).validate_consistency().unwrap_err();
        assert_eq!(err.0, "manualPrice");
    }

    #[test]
    fn manual_item_requires_price_and_unit() {
        assert_eq!(payload(None, None).validate_consistency().unwrap_err().0, "manualPrice");

        let mut no_unit = payload(None, Some(dec!(80000)));
        no_unit.unit = Some("  ".to_string());
        assert_eq!(no_unit.validate_consistency().unwrap_err().0, "unit");

        assert!(payload(None, Some(dec!(80000))).validate_consistency().is_ok());
    }
}
