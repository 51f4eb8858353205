// src/db/finance_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::finance::{CashMovement, NewCashMovement},
};

#[derive(Clone)]
pub struct FinanceRepository {
    pool: PgPool,
}

impl FinanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LIVRO CAIXA (somente inserção)
    // =========================================================================

    pub async fn insert_movement<'e, E>(
        &self,
        executor: E,
        movement: &NewCashMovement,
    ) -> Result<CashMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, CashMovement>(
            r#"
            INSERT INTO cash_movements (project_id, movement_type, amount, category, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(movement.project_id)
        .bind(movement.movement_type)
        .bind(movement.amount)
        .bind(&movement.category)
        .bind(&movement.note)
        .fetch_one(executor)
        .await?;

        Ok(created)
    }

    pub async fn list_by_project(&self, project_id: i64) -> Result<Vec<CashMovement>, AppError> {
        let movements = sqlx::query_as::<_, CashMovement>(
            "SELECT * FROM cash_movements WHERE project_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}
