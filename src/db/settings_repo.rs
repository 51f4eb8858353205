// src/db/settings_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::settings::{BudgetSettings, UpdateBudgetSettingsRequest},
};

const SETTINGS_COLUMNS: &str = r#"
    monthly_fixed_cost, working_days_per_month, default_margin_percent,
    social_charges_percent, currency_symbol, currency_decimals, updated_at
"#;

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Linha única (id = 1). Sem linha gravada, valem os padrões.
    pub async fn get_settings<'e, E>(&self, executor: E) -> Result<BudgetSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {SETTINGS_COLUMNS} FROM budget_settings WHERE id = 1");

        let settings = sqlx::query_as::<_, BudgetSettings>(&sql)
            .fetch_optional(executor)
            .await?;

        Ok(settings.unwrap_or_default())
    }

    pub async fn current(&self) -> Result<BudgetSettings, AppError> {
        self.get_settings(&self.pool).await
    }

    pub async fn update_settings<'e, E>(
        &self,
        executor: E,
        input: &UpdateBudgetSettingsRequest,
    ) -> Result<BudgetSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let defaults = BudgetSettings::default();

        // UPSERT (Insert or Update)
        let sql = format!(
            r#"
            INSERT INTO budget_settings (
                id, monthly_fixed_cost, working_days_per_month, default_margin_percent,
                social_charges_percent, currency_symbol, currency_decimals
            )
            VALUES (1, $1, $2, $3, $4, $5, $6)
            ON CONFLICT (id)
            DO UPDATE SET
                monthly_fixed_cost = EXCLUDED.monthly_fixed_cost,
                working_days_per_month = EXCLUDED.working_days_per_month,
                default_margin_percent = EXCLUDED.default_margin_percent,
                social_charges_percent = EXCLUDED.social_charges_percent,
                currency_symbol = EXCLUDED.currency_symbol,
                currency_decimals = EXCLUDED.currency_decimals,
                updated_at = NOW()
            RETURNING {SETTINGS_COLUMNS}
            "#
        );

        let settings = sqlx::query_as::<_, BudgetSettings>(&sql)
            .bind(input.monthly_fixed_cost)
            .bind(input.working_days_per_month)
            .bind(input.default_margin_percent)
            .bind(input.social_charges_percent)
            .bind(input.currency_symbol.as_deref().unwrap_or(&defaults.currency_symbol))
            .bind(input.currency_decimals.unwrap_or(defaults.currency_decimals))
            .fetch_one(executor)
            .await?;

        Ok(settings)
    }
}
