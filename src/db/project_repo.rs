// src/db/project_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::project::{NewProjectRubro, NewRubroMaterial, Project, ProjectRubro, RubroMaterial},
};

const RUBRO_COLUMNS: &str = r#"
    id, project_id, position, service_type_id, description, quantity, unit,
    estimated_days, materials_cost, labor_cost, fixed_cost, subtotal,
    cantidad_aplicada, mano_obra_applied, mano_obra_applied_at
"#;

#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  OBRA
    // =========================================================================

    pub async fn create_project<'e, E>(
        &self,
        executor: E,
        quotation_id: i64,
        client_id: Option<i64>,
        name: &str,
    ) -> Result<Project, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (quotation_id, client_id, name)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(quotation_id)
        .bind(client_id)
        .bind(name)
        .fetch_one(executor)
        .await?;

        Ok(project)
    }

    pub async fn find_by_quotation<'e, E>(
        &self,
        executor: E,
        quotation_id: i64,
    ) -> Result<Option<Project>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE quotation_id = $1")
            .bind(quotation_id)
            .fetch_optional(executor)
            .await?;

        Ok(project)
    }

    pub async fn get_project(&self, project_id: i64) -> Result<Option<Project>, AppError> {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(project)
    }

    pub async fn project_exists<'e, E>(&self, executor: E, project_id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1)")
                .bind(project_id)
                .fetch_one(executor)
                .await?;

        Ok(exists)
    }

    // =========================================================================
    //  RUBROS (criação)
    // =========================================================================

    pub async fn insert_rubro<'e, E>(
        &self,
        executor: E,
        project_id: i64,
        rubro: &NewProjectRubro,
    ) -> Result<ProjectRubro, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO project_rubros (
                project_id, position, service_type_id, description, quantity, unit,
                estimated_days, materials_cost, labor_cost, fixed_cost, subtotal
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {RUBRO_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, ProjectRubro>(&sql)
            .bind(project_id)
            .bind(rubro.position)
            .bind(rubro.service_type_id)
            .bind(&rubro.description)
            .bind(rubro.quantity)
            .bind(&rubro.unit)
            .bind(rubro.estimated_days)
            .bind(rubro.materials_cost)
            .bind(rubro.labor_cost)
            .bind(rubro.fixed_cost)
            .bind(rubro.subtotal)
            .fetch_one(executor)
            .await?;

        Ok(created)
    }

    pub async fn insert_rubro_material<'e, E>(
        &self,
        executor: E,
        rubro_id: i64,
        material: &NewRubroMaterial,
    ) -> Result<RubroMaterial, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, RubroMaterial>(
            r#"
            INSERT INTO rubro_materials (rubro_id, material_id, name, cantidad, unit, unit_price, total_cost)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(rubro_id)
        .bind(material.material_id)
        .bind(&material.name)
        .bind(material.cantidad)
        .bind(&material.unit)
        .bind(material.unit_price)
        .bind(material.total_cost)
        .fetch_one(executor)
        .await?;

        Ok(created)
    }

    // =========================================================================
    //  RUBROS (leitura)
    // =========================================================================

    pub async fn list_rubros<'e, E>(
        &self,
        executor: E,
        project_id: i64,
    ) -> Result<Vec<ProjectRubro>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {RUBRO_COLUMNS} FROM project_rubros WHERE project_id = $1 ORDER BY position ASC, id ASC"
        );

        let rubros = sqlx::query_as::<_, ProjectRubro>(&sql)
            .bind(project_id)
            .fetch_all(executor)
            .await?;

        Ok(rubros)
    }

    pub async fn list_materials_for_project<'e, E>(
        &self,
        executor: E,
        project_id: i64,
    ) -> Result<Vec<RubroMaterial>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let materials = sqlx::query_as::<_, RubroMaterial>(
            r#"
            SELECT rm.*
            FROM rubro_materials rm
            JOIN project_rubros r ON r.id = rm.rubro_id
            WHERE r.project_id = $1
            ORDER BY rm.rubro_id ASC, rm.id ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await?;

        Ok(materials)
    }

    // =========================================================================
    //  TRAVAS (ordem fixa: rubro antes dos materiais, materiais por id)
    // =========================================================================

    pub async fn lock_rubro<'e, E>(
        &self,
        executor: E,
        project_id: i64,
        rubro_id: i64,
    ) -> Result<Option<ProjectRubro>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {RUBRO_COLUMNS} FROM project_rubros WHERE id = $1 AND project_id = $2 FOR UPDATE"
        );

        let rubro = sqlx::query_as::<_, ProjectRubro>(&sql)
            .bind(rubro_id)
            .bind(project_id)
            .fetch_optional(executor)
            .await?;

        Ok(rubro)
    }

    /// Trava o rubro dono do material. Só a linha do rubro é travada aqui.
    pub async fn lock_rubro_of_material<'e, E>(
        &self,
        executor: E,
        project_id: i64,
        material_id: i64,
    ) -> Result<Option<ProjectRubro>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rubro = sqlx::query_as::<_, ProjectRubro>(
            r#"
            SELECT r.id, r.project_id, r.position, r.service_type_id, r.description, r.quantity, r.unit,
                   r.estimated_days, r.materials_cost, r.labor_cost, r.fixed_cost, r.subtotal,
                   r.cantidad_aplicada, r.mano_obra_applied, r.mano_obra_applied_at
            FROM project_rubros r
            JOIN rubro_materials rm ON rm.rubro_id = r.id
            WHERE rm.id = $1 AND r.project_id = $2
            FOR UPDATE OF r
            "#,
        )
        .bind(material_id)
        .bind(project_id)
        .fetch_optional(executor)
        .await?;

        Ok(rubro)
    }

    pub async fn lock_rubro_materials<'e, E>(
        &self,
        executor: E,
        rubro_id: i64,
    ) -> Result<Vec<RubroMaterial>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let materials = sqlx::query_as::<_, RubroMaterial>(
            "SELECT * FROM rubro_materials WHERE rubro_id = $1 ORDER BY id ASC FOR UPDATE",
        )
        .bind(rubro_id)
        .fetch_all(executor)
        .await?;

        Ok(materials)
    }

    // =========================================================================
    //  ESCRITAS DE AVANÇO
    // =========================================================================

    pub async fn update_material_progress<'e, E>(
        &self,
        executor: E,
        material: &RubroMaterial,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE rubro_materials
            SET cantidad_aplicada = $1, applied = $2, applied_at = $3
            WHERE id = $4
            "#,
        )
        .bind(material.cantidad_aplicada)
        .bind(material.applied)
        .bind(material.applied_at)
        .bind(material.id)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn update_rubro_progress<'e, E>(
        &self,
        executor: E,
        rubro_id: i64,
        cantidad_aplicada: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE project_rubros SET cantidad_aplicada = $1 WHERE id = $2")
            .bind(cantidad_aplicada)
            .bind(rubro_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn mark_labor_applied<'e, E>(
        &self,
        executor: E,
        rubro_id: i64,
        applied_at: DateTime<Utc>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE project_rubros
            SET mano_obra_applied = TRUE, mano_obra_applied_at = $1
            WHERE id = $2
            "#,
        )
        .bind(applied_at)
        .bind(rubro_id)
        .execute(executor)
        .await?;

        Ok(())
    }
}
