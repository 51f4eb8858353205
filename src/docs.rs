// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "Obras - Orçamentos e Avanço de Obra"),
    paths(
        // --- Catálogo ---
        handlers::catalog::create_material,
        handlers::catalog::list_materials,
        handlers::catalog::update_material_price,
        handlers::catalog::create_service_type,
        handlers::catalog::list_service_types,
        handlers::catalog::get_service_type,
        handlers::catalog::update_service_type,
        handlers::catalog::delete_service_type,
        handlers::catalog::estimate,

        // --- Orçamentos ---
        handlers::quotations::create_quotation,
        handlers::quotations::list_quotations,
        handlers::quotations::get_quotation,
        handlers::quotations::get_summary,
        handlers::quotations::update_margin,
        handlers::quotations::transition_status,
        handlers::quotations::add_item,
        handlers::quotations::update_item,
        handlers::quotations::delete_item,
        handlers::quotations::add_custom_material,
        handlers::quotations::create_project,

        // --- Obras ---
        handlers::projects::get_project,
        handlers::projects::get_progress,
        handlers::projects::apply_progress,
        handlers::projects::list_cash_movements,
        handlers::projects::create_cash_movement,

        // --- Settings ---
        handlers::settings::get_settings,
        handlers::settings::update_settings,
    ),
    components(
        schemas(
            // --- Catálogo ---
            models::catalog::Material,
            models::catalog::ServiceType,
            models::catalog::ServiceTypeMaterial,
            models::catalog::ServiceTypeDetail,
            models::catalog::ServiceTypeMaterialInput,

            // --- Orçamentos ---
            models::budget::QuotationStatus,
            models::budget::MaterialLine,
            models::budget::EstimateResult,
            models::budget::Quotation,
            models::budget::QuotationItem,
            models::budget::QuotationDetail,
            models::budget::PurchasingLine,
            models::budget::QuotationSummary,
            models::budget::CommercialLine,
            models::budget::QuotationOverview,

            // --- Obras ---
            models::project::ProgressState,
            models::project::Project,
            models::project::ProjectRubro,
            models::project::RubroMaterial,
            models::project::ProjectDetail,
            models::project::MaterialProgress,
            models::project::RubroProgress,
            models::project::ProjectProgress,
            models::project::ApplyOutcome,

            // --- Caixa ---
            models::finance::MovementType,
            models::finance::CashMovement,

            // --- Settings ---
            models::settings::BudgetSettings,
            models::settings::UpdateBudgetSettingsRequest,

            // --- Payloads ---
            handlers::catalog::CreateMaterialPayload,
            handlers::catalog::UpdatePricePayload,
            handlers::catalog::ServiceTypePayload,
            handlers::catalog::EstimatePayload,
            handlers::quotations::CreateQuotationPayload,
            handlers::quotations::AddItemPayload,
            handlers::quotations::UpdateItemPayload,
            handlers::quotations::AddCustomMaterialPayload,
            handlers::quotations::UpdateMarginPayload,
            handlers::quotations::TransitionStatusPayload,
            handlers::quotations::CreateProjectPayload,
            handlers::projects::LaborKind,
            handlers::projects::ApplyLaborBody,
            handlers::projects::ApplyMaterialBody,
            handlers::projects::ApplyRubroBody,
            handlers::projects::ApplyProgressPayload,
            handlers::projects::CreateCashMovementPayload,
        )
    ),
    tags(
        (name = "Catalog", description = "Materiais e Tipos de Serviço (templates)"),
        (name = "Quotations", description = "Orçamentos, Itens e Margem"),
        (name = "Projects", description = "Obras, Avanço de Rubros e Caixa"),
        (name = "Settings", description = "Parâmetros do Orçamentista")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();

        for path in [
            "/api/materials",
            "/api/service-types/{id}",
            "/api/service-types/{id}/estimate",
            "/api/quotations/{id}/items/{item_id}/materials",
            "/api/quotations/{id}/project",
            "/api/projects/{id}/apply",
            "/api/projects/{id}/cash-movements",
            "/api/settings/budget",
        ] {
            assert!(doc.paths.paths.contains_key(path), "rota ausente: {path}");
        }
    }
}
