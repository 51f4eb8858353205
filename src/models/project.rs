// src/models/project.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- Estado de avanço (derivado, nunca gravado) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProgressState {
    Pending,
    Partial,
    Applied,
}

impl ProgressState {
    pub fn from_quantities(applied: Decimal, total: Decimal) -> Self {
        if applied >= total {
            ProgressState::Applied
        } else if applied > Decimal::ZERO {
            ProgressState::Partial
        } else {
            ProgressState::Pending
        }
    }
}

/// Percentual 0..=100 com duas casas. Total zero conta como concluído.
pub fn percent_of(applied: Decimal, total: Decimal) -> Decimal {
    if total <= Decimal::ZERO {
        return Decimal::ONE_HUNDRED;
    }
    (applied * Decimal::ONE_HUNDRED / total).round_dp(2)
}

// --- Obra ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub quotation_id: i64,
    pub client_id: Option<i64>,
    #[schema(example = "Ampliación casa Gómez")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRubro {
    pub id: i64,
    pub project_id: i64,
    pub position: i32,
    pub service_type_id: Option<i64>,
    pub description: String,
    // Quantidade total do rubro na própria unidade (m2, ml, gl...)
    #[schema(example = "20")]
    pub quantity: Decimal,
    pub unit: String,
    pub estimated_days: Decimal,
    pub materials_cost: Decimal,
    // costo_mano_obra
    #[schema(example = "237500")]
    pub labor_cost: Decimal,
    pub fixed_cost: Decimal,
    pub subtotal: Decimal,
    // Só é usado quando o rubro não tem materiais discretos
    pub cantidad_aplicada: Decimal,
    pub mano_obra_applied: bool,
    pub mano_obra_applied_at: Option<DateTime<Utc>>,

    #[sqlx(skip)]
    pub materials: Vec<RubroMaterial>,
}

impl ProjectRubro {
    pub fn has_materials(&self) -> bool {
        !self.materials.is_empty()
    }

    pub fn all_materials_applied(&self) -> bool {
        self.materials.iter().all(RubroMaterial::is_complete)
    }

    pub fn labor_pending(&self) -> bool {
        !self.mano_obra_applied && self.labor_cost > Decimal::ZERO
    }

    pub fn progress_state(&self) -> ProgressState {
        ProgressState::from_quantities(self.cantidad_aplicada, self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RubroMaterial {
    pub id: i64,
    pub rubro_id: i64,
    pub material_id: Option<i64>,
    pub name: String,
    #[schema(example = "10")]
    pub cantidad: Decimal,
    pub unit: String,
    #[schema(example = "480")]
    pub unit_price: Decimal,
    pub total_cost: Decimal,
    #[schema(example = "5")]
    pub cantidad_aplicada: Decimal,
    // Espelho de `cantidad_aplicada >= cantidad`; a comparação é a fonte da verdade
    pub applied: bool,
    pub applied_at: Option<DateTime<Utc>>,
}

impl RubroMaterial {
    pub fn is_complete(&self) -> bool {
        self.cantidad_aplicada >= self.cantidad
    }

    pub fn remaining(&self) -> Decimal {
        (self.cantidad - self.cantidad_aplicada).max(Decimal::ZERO)
    }

    pub fn progress_state(&self) -> ProgressState {
        ProgressState::from_quantities(self.cantidad_aplicada, self.cantidad)
    }

    /// Re-deriva o cache `applied` a partir das quantidades.
    pub fn sync_applied_flag(&mut self) {
        self.applied = self.is_complete();
    }
}

// --- Saídas do materializador (ainda sem ID) ---

#[derive(Debug, Clone, PartialEq)]
pub struct NewRubroMaterial {
    pub material_id: Option<i64>,
    pub name: String,
    pub cantidad: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProjectRubro {
    pub position: i32,
    pub service_type_id: Option<i64>,
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    pub estimated_days: Decimal,
    pub materials_cost: Decimal,
    pub labor_cost: Decimal,
    pub fixed_cost: Decimal,
    pub subtotal: Decimal,
    pub materials: Vec<NewRubroMaterial>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub rubros: Vec<ProjectRubro>,
}

// --- Visão de avanço (barras de progresso) ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialProgress {
    pub material_id: i64,
    pub name: String,
    pub unit: String,
    pub cantidad: Decimal,
    pub cantidad_aplicada: Decimal,
    pub remaining: Decimal,
    pub percent: Decimal,
    pub state: ProgressState,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RubroProgress {
    pub rubro_id: i64,
    pub description: String,
    pub state: ProgressState,
    pub percent: Decimal,
    pub mano_obra_applied: bool,
    // Custo orçado já executado (materiais + avanço + mão de obra)
    pub executed_cost: Decimal,
    pub budgeted_cost: Decimal,
    pub materials: Vec<MaterialProgress>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectProgress {
    pub project_id: i64,
    pub budgeted_cost: Decimal,
    pub executed_cost: Decimal,
    pub percent: Decimal,
    pub rubros: Vec<RubroProgress>,
}

// --- Resultado das operações de aplicação ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_materials_applied: Option<bool>,
    pub mano_obra_auto_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
}
