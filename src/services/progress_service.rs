// src/services/progress_service.rs
//
// Camada transacional do avanço de obra. Cada operação:
//   1. trava o rubro (FOR UPDATE) e depois os materiais dele, em ordem de id;
//   2. pede o plano ao `progress_tracker` (puro);
//   3. grava estado + lançamentos de caixa e faz o commit.
// Qualquer erro antes do commit descarta a transação inteira.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::{
    common::error::AppError,
    db::ProjectRepository,
    models::project::{ApplyOutcome, ProjectRubro},
    services::{
        finance_service::FinanceService,
        progress_tracker::{self, LaborApplication},
    },
};

#[derive(Clone)]
pub struct ProgressService {
    repo: ProjectRepository,
    finance_service: FinanceService,
    pool: PgPool,
}

impl ProgressService {
    pub fn new(repo: ProjectRepository, finance_service: FinanceService, pool: PgPool) -> Self {
        Self { repo, finance_service, pool }
    }

    // Rubro já travado; trava os materiais e monta o agregado
    async fn with_locked_materials(
        &self,
        conn: &mut PgConnection,
        mut rubro: ProjectRubro,
    ) -> Result<ProjectRubro, AppError> {
        let mut materials = self.repo.lock_rubro_materials(&mut *conn, rubro.id).await?;
        for material in materials.iter_mut() {
            material.sync_applied_flag();
        }
        rubro.materials = materials;
        Ok(rubro)
    }

    async fn lock_rubro(
        &self,
        conn: &mut PgConnection,
        project_id: i64,
        rubro_id: i64,
    ) -> Result<ProjectRubro, AppError> {
        let rubro = self
            .repo
            .lock_rubro(&mut *conn, project_id, rubro_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Rubro {rubro_id}")))?;

        self.with_locked_materials(conn, rubro).await
    }

    async fn persist_labor(
        &self,
        conn: &mut PgConnection,
        rubro_id: i64,
        labor: &LaborApplication,
    ) -> Result<(), AppError> {
        self.repo.mark_labor_applied(&mut *conn, rubro_id, labor.applied_at).await?;
        if let Some(movement) = &labor.movement {
            self.finance_service.record_movement(&mut *conn, movement).await?;
        }
        Ok(())
    }

    /// ApplyMaterial: consome `quantity` de um material do rubro.
    pub async fn apply_material(
        &self,
        project_id: i64,
        material_id: i64,
        quantity: Decimal,
    ) -> Result<ApplyOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let Some(rubro) = self.repo.lock_rubro_of_material(&mut *tx, project_id, material_id).await?
        else {
            // Quantidade inválida ganha de material inexistente
            progress_tracker::check_apply_quantity(quantity, None)?;
            return Err(AppError::ResourceNotFound(format!("Material {material_id}")));
        };
        let rubro = self.with_locked_materials(&mut tx, rubro).await?;

        let plan = progress_tracker::plan_apply_material(&rubro, material_id, quantity, Utc::now())?;

        self.repo.update_material_progress(&mut *tx, &plan.material).await?;
        self.finance_service.record_movement(&mut *tx, &plan.movement).await?;
        if let Some(labor) = &plan.labor {
            self.persist_labor(&mut tx, rubro.id, labor).await?;
        }

        tx.commit().await?;

        tracing::info!(
            project_id,
            rubro_id = rubro.id,
            material_id,
            quantity = %quantity,
            all_materials_applied = plan.all_materials_applied,
            mano_obra_auto_applied = plan.labor.is_some(),
            "Material aplicado"
        );

        Ok(ApplyOutcome {
            success: true,
            all_materials_applied: Some(plan.all_materials_applied),
            mano_obra_auto_applied: plan.labor.is_some(),
            is_complete: None,
        })
    }

    /// ApplyRubroProgress: rubros sem materiais informam a quantidade executada.
    pub async fn apply_rubro_progress(
        &self,
        project_id: i64,
        rubro_id: i64,
        new_cantidad_aplicada: Decimal,
    ) -> Result<ApplyOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let rubro = self.lock_rubro(&mut tx, project_id, rubro_id).await?;
        let plan = progress_tracker::plan_rubro_progress(&rubro, new_cantidad_aplicada, Utc::now())?;

        self.repo.update_rubro_progress(&mut *tx, rubro_id, plan.cantidad_aplicada).await?;
        if let Some(movement) = &plan.movement {
            self.finance_service.record_movement(&mut *tx, movement).await?;
        }
        if let Some(labor) = &plan.labor {
            self.persist_labor(&mut tx, rubro_id, labor).await?;
        }

        tx.commit().await?;

        tracing::info!(
            project_id,
            rubro_id,
            cantidad_aplicada = %plan.cantidad_aplicada,
            is_complete = plan.is_complete,
            "Avanço de rubro registrado"
        );

        Ok(ApplyOutcome {
            success: true,
            all_materials_applied: None,
            mano_obra_auto_applied: plan.labor.is_some(),
            is_complete: Some(plan.is_complete),
        })
    }

    /// ApplyLabor manual.
    pub async fn apply_labor(&self, project_id: i64, rubro_id: i64) -> Result<ApplyOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let rubro = self.lock_rubro(&mut tx, project_id, rubro_id).await?;
        let labor = progress_tracker::plan_apply_labor(&rubro, Utc::now())?;

        self.persist_labor(&mut tx, rubro_id, &labor).await?;

        tx.commit().await?;

        tracing::info!(project_id, rubro_id, labor_cost = %rubro.labor_cost, "Mão de obra aplicada");

        Ok(ApplyOutcome {
            success: true,
            all_materials_applied: None,
            mano_obra_auto_applied: false,
            is_complete: None,
        })
    }
}
