// src/services/finance_service.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    db::{FinanceRepository, ProjectRepository},
    models::finance::{CashMovement, NewCashMovement},
};

#[derive(Clone)]
pub struct FinanceService {
    repo: FinanceRepository,
    project_repo: ProjectRepository,
    pool: PgPool,
}

impl FinanceService {
    pub fn new(repo: FinanceRepository, project_repo: ProjectRepository, pool: PgPool) -> Self {
        Self { repo, project_repo, pool }
    }

    /// Grava um lançamento dentro da transação de quem chama (avanço de obra).
    pub async fn record_movement<'e, E>(
        &self,
        executor: E,
        movement: &NewCashMovement,
    ) -> Result<CashMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = self.repo.insert_movement(executor, movement).await?;

        tracing::info!(
            project_id = ?created.project_id,
            amount = %created.amount,
            category = %created.category,
            "Lançamento de caixa registrado"
        );

        Ok(created)
    }

    /// Lançamento manual do operador (ex.: estorno de um avanço registrado a mais).
    pub async fn create_manual_movement(
        &self,
        movement: NewCashMovement,
    ) -> Result<CashMovement, AppError> {
        let mut tx = self.pool.begin().await?;

        if let Some(project_id) = movement.project_id {
            if !self.project_repo.project_exists(&mut *tx, project_id).await? {
                return Err(AppError::ResourceNotFound(format!("Obra {project_id}")));
            }
        }

        let created = self.record_movement(&mut *tx, &movement).await?;

        tx.commit().await?;
        Ok(created)
    }

    pub async fn list_project_movements(&self, project_id: i64) -> Result<Vec<CashMovement>, AppError> {
        if !self.project_repo.project_exists(&self.pool, project_id).await? {
            return Err(AppError::ResourceNotFound(format!("Obra {project_id}")));
        }

        self.repo.list_by_project(project_id).await
    }
}
