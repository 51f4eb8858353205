// src/models/finance.rs

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

pub const CATEGORY_MATERIALS: &str = "Materiais";
pub const CATEGORY_LABOR: &str = "Mão de obra";
pub const CATEGORY_RUBRO_PROGRESS: &str = "Avanço de rubro";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Income,
    Expense,
}

/// Lançamento do caixa. Append-only: o núcleo nunca altera um lançamento existente.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashMovement {
    pub id: i64,
    pub project_id: Option<i64>,
    pub movement_type: MovementType,
    #[schema(example = "2400")]
    pub amount: Decimal,
    #[schema(example = "Materiais")]
    pub category: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCashMovement {
    pub project_id: Option<i64>,
    pub movement_type: MovementType,
    pub amount: Decimal,
    pub category: String,
    pub note: Option<String>,
}

impl NewCashMovement {
    pub fn expense(project_id: i64, amount: Decimal, category: &str, note: String) -> Self {
        Self {
            project_id: Some(project_id),
            movement_type: MovementType::Expense,
            amount: amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            category: category.to_string(),
            note: Some(note),
        }
    }
}
