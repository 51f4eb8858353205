// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// --- Materiais (catálogo de preços vigentes) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[schema(example = 12)]
    pub id: i64,
    #[schema(example = "Ladrillo hueco 12x18x33")]
    pub name: String,
    #[schema(example = "un")]
    pub unit: String,
    #[schema(example = "480")]
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Tipos de Serviço (templates de rubro) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceType {
    #[schema(example = 3)]
    pub id: i64,
    #[schema(example = "Mampostería 12cm")]
    pub name: String,
    #[schema(example = "m2")]
    pub unit: String,
    // Unidades de trabalho por dia (ex: 8 m2/dia)
    #[schema(example = "8")]
    pub productivity_rate: Option<Decimal>,
    #[schema(example = "95000")]
    pub labor_cost_per_day: Option<Decimal>,
    #[schema(example = "0")]
    pub social_charges_percent: Decimal,
    // true = usa o percentual próprio; false = usa o percentual global
    #[schema(example = false)]
    pub includes_social_charges: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Linha do template já com o snapshot do material (JOIN com `materials`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTypeMaterial {
    pub id: i64,
    pub service_type_id: i64,
    pub material_id: i64,
    #[schema(example = "Ladrillo hueco 12x18x33")]
    pub material_name: String,
    #[schema(example = "un")]
    pub unit: String,
    #[schema(example = "480")]
    pub unit_price: Decimal,
    // Quantidade por UMA unidade de trabalho (ex: por m2)
    #[schema(example = "16")]
    pub quantity_per_unit: Decimal,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTypeDetail {
    #[serde(flatten)]
    pub service_type: ServiceType,
    pub materials: Vec<ServiceTypeMaterial>,
}

/// Material do template na criação do tipo de serviço.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTypeMaterialInput {
    #[schema(example = 12)]
    pub material_id: i64,
    #[schema(example = "16")]
    #[validate(custom(function = "crate::common::validation::positive"))]
    pub quantity_per_unit: Decimal,
}
