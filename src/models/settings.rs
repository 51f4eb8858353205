// src/models/settings.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::validation::{not_negative, percent};

/// Parâmetros globais do orçamentista. Lidos uma vez por chamada e passados
/// por valor para o estimador/agregador.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSettings {
    #[schema(example = "1200000")]
    pub monthly_fixed_cost: Option<Decimal>,

    #[schema(example = "22")]
    pub working_days_per_month: Decimal,

    #[schema(example = "25")]
    pub default_margin_percent: Decimal,

    // Usado quando o tipo de serviço NÃO inclui encargos na própria taxa
    #[schema(example = "0")]
    pub social_charges_percent: Decimal,

    #[schema(example = "$")]
    pub currency_symbol: String,

    #[schema(example = 0)]
    pub currency_decimals: i16,

    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            monthly_fixed_cost: None,
            working_days_per_month: Decimal::from(22),
            default_margin_percent: Decimal::ZERO,
            social_charges_percent: Decimal::ZERO,
            currency_symbol: "$".to_string(),
            currency_decimals: 0,
            updated_at: None,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBudgetSettingsRequest {
    #[validate(custom(function = "not_negative"))]
    #[schema(example = "1500000")]
    pub monthly_fixed_cost: Option<Decimal>,

    // Zero desliga o rateio do custo fixo
    #[validate(custom(function = "not_negative"))]
    #[schema(example = "22")]
    pub working_days_per_month: Decimal,

    #[validate(custom(function = "percent"))]
    #[schema(example = "30")]
    pub default_margin_percent: Decimal,

    #[validate(custom(function = "percent"))]
    #[schema(example = "45")]
    pub social_charges_percent: Decimal,

    #[validate(length(min = 1, max = 8))]
    #[schema(example = "$")]
    pub currency_symbol: Option<String>,

    #[validate(range(min = 0, max = 4))]
    #[schema(example = 0)]
    pub currency_decimals: Option<i16>,
}
