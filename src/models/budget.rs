// src/models/budget.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "quotation_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    Draft,
    Sent,
    Paid,
    Rejected,
}

impl QuotationStatus {
    /// draft -> sent -> paid | rejected. Nada volta atrás.
    pub fn can_transition_to(self, next: QuotationStatus) -> bool {
        matches!(
            (self, next),
            (QuotationStatus::Draft, QuotationStatus::Sent)
                | (QuotationStatus::Sent, QuotationStatus::Paid)
                | (QuotationStatus::Sent, QuotationStatus::Rejected)
        )
    }

    // Itens só mudam enquanto o orçamento está em negociação
    pub fn accepts_item_changes(self) -> bool {
        matches!(self, QuotationStatus::Draft | QuotationStatus::Sent)
    }
}

// --- Linhas de material ---

/// Uma linha (material, quantidade, preço). `quantity` é a quantidade arredondada
/// para compra; `total` é sempre calculado sobre `raw_quantity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialLine {
    pub material_id: Option<i64>,
    #[schema(example = "Ladrillo hueco 12x18x33")]
    pub name: String,
    #[schema(example = "320")]
    pub quantity: Decimal,
    #[schema(example = "320")]
    pub raw_quantity: Decimal,
    #[schema(example = "un")]
    pub unit: String,
    #[schema(example = "480")]
    pub unit_price: Decimal,
    #[schema(example = "153600")]
    pub total: Decimal,
    // true = adicionada à mão pelo operador (fora do template)
    pub is_custom: bool,
}

// --- Resultado do estimador ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResult {
    #[schema(example = "20")]
    pub quantity: Decimal,
    #[schema(example = "2.5")]
    pub estimated_days: Decimal,
    #[schema(example = "153600")]
    pub materials_cost: Decimal,
    #[schema(example = "237500")]
    pub labor_cost: Decimal,
    #[schema(example = "0")]
    pub fixed_cost: Decimal,
    #[schema(example = "391100")]
    pub subtotal: Decimal,
    pub materials: Vec<MaterialLine>,
}

// --- Orçamento ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub id: i64,
    pub client_id: Option<i64>,
    #[schema(example = "Ampliación casa Gómez")]
    pub title: String,
    pub status: QuotationStatus,
    pub notes: Option<String>,
    #[schema(example = true)]
    pub apply_margin: bool,
    #[schema(example = "25")]
    pub margin_percent: Decimal,
    // Total para o cliente (custo base + margem), gravado a cada salvamento
    #[schema(example = "488875")]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotationItem {
    pub id: i64,
    pub quotation_id: i64,
    pub position: i32,
    pub service_type_id: Option<i64>,
    #[schema(example = "Muro de ladrillo hueco 12cm")]
    pub description: String,
    #[schema(example = "20")]
    pub quantity: Decimal,
    #[schema(example = "m2")]
    pub unit: String,
    #[schema(example = "2.5")]
    pub estimated_days: Decimal,
    pub materials_cost: Decimal,
    pub labor_cost: Decimal,
    pub fixed_cost: Decimal,
    // Item manual: preço fechado, ignora os três componentes
    pub manual_price: Option<Decimal>,
    #[schema(example = "391100")]
    pub subtotal: Decimal,

    #[sqlx(skip)]
    pub materials: Vec<MaterialLine>,
}

impl QuotationItem {
    pub fn is_manual(&self) -> bool {
        self.service_type_id.is_none()
    }

    /// O subtotal nunca é editado diretamente: é sempre derivado daqui.
    pub fn recompute_subtotal(&mut self) {
        self.subtotal = match self.manual_price {
            Some(price) => price,
            None => self.materials_cost + self.labor_cost + self.fixed_cost,
        };
    }

    pub fn custom_materials(&self) -> impl Iterator<Item = &MaterialLine> {
        self.materials.iter().filter(|m| m.is_custom)
    }

    /// Aplica uma estimativa nova preservando as linhas avulsas do operador.
    pub fn apply_estimate(&mut self, estimate: EstimateResult) {
        let custom: Vec<MaterialLine> = self.custom_materials().cloned().collect();
        let custom_cost: Decimal = custom.iter().map(|m| m.total).sum();

        self.quantity = estimate.quantity;
        self.estimated_days = estimate.estimated_days;
        self.labor_cost = estimate.labor_cost;
        self.fixed_cost = estimate.fixed_cost;
        self.materials_cost = crate::services::cost_estimator::round_currency(
            estimate.materials_cost + custom_cost,
        );
        self.materials = estimate.materials;
        self.materials.extend(custom);
        self.recompute_subtotal();
    }

    /// Linha avulsa: entra na lista de compras e, em itens de template, no custo de materiais.
    pub fn add_custom_material(&mut self, line: MaterialLine) {
        if !self.is_manual() {
            self.materials_cost = crate::services::cost_estimator::round_currency(
                self.materials_cost + line.total,
            );
        }
        self.materials.push(line);
        self.recompute_subtotal();
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotationDetail {
    #[serde(flatten)]
    pub quotation: Quotation,
    pub items: Vec<QuotationItem>,
}

// --- Agregação ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchasingLine {
    pub material_id: Option<i64>,
    pub name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotationSummary {
    #[schema(example = "391100")]
    pub cost_base: Decimal,
    #[schema(example = "97775")]
    pub margin: Decimal,
    #[schema(example = "488875")]
    pub total: Decimal,
    pub purchasing_list: Vec<PurchasingLine>,
}

/// Preço de cada item como o cliente vê: a margem já vem diluída.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommercialLine {
    pub item_id: i64,
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    pub final_price: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotationOverview {
    pub summary: QuotationSummary,
    pub commercial_preview: Vec<CommercialLine>,
}
