// src/db/catalog_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::catalog::{Material, ServiceType, ServiceTypeMaterial},
};

const SERVICE_TYPE_MATERIAL_COLUMNS: &str = r#"
    stm.id, stm.service_type_id, stm.material_id,
    m.name AS material_name, m.unit, m.unit_price,
    stm.quantity_per_unit, stm.position
"#;

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  MATERIAIS
    // =========================================================================

    pub async fn create_material<'e, E>(
        &self,
        executor: E,
        name: &str,
        unit: &str,
        unit_price: Decimal,
    ) -> Result<Material, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let material = sqlx::query_as::<_, Material>(
            r#"
            INSERT INTO materials (name, unit, unit_price)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(unit)
        .bind(unit_price)
        .fetch_one(executor)
        .await?;

        Ok(material)
    }

    // Leituras simples usam a pool direto
    pub async fn list_materials(&self) -> Result<Vec<Material>, AppError> {
        let materials = sqlx::query_as::<_, Material>("SELECT * FROM materials ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(materials)
    }

    pub async fn update_material_price<'e, E>(
        &self,
        executor: E,
        material_id: i64,
        unit_price: Decimal,
    ) -> Result<Option<Material>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let material = sqlx::query_as::<_, Material>(
            r#"
            UPDATE materials
            SET unit_price = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(unit_price)
        .bind(material_id)
        .fetch_optional(executor)
        .await?;

        Ok(material)
    }

    // =========================================================================
    //  TIPOS DE SERVIÇO
    // =========================================================================

    pub async fn create_service_type<'e, E>(
        &self,
        executor: E,
        name: &str,
        unit: &str,
        productivity_rate: Option<Decimal>,
        labor_cost_per_day: Option<Decimal>,
        social_charges_percent: Decimal,
        includes_social_charges: bool,
    ) -> Result<ServiceType, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let service_type = sqlx::query_as::<_, ServiceType>(
            r#"
            INSERT INTO service_types (
                name, unit, productivity_rate, labor_cost_per_day,
                social_charges_percent, includes_social_charges
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(unit)
        .bind(productivity_rate)
        .bind(labor_cost_per_day)
        .bind(social_charges_percent)
        .bind(includes_social_charges)
        .fetch_one(executor)
        .await?;

        Ok(service_type)
    }

    // Trava a linha do template até o fim da transação
    #[allow(clippy::too_many_arguments)]
    pub async fn update_service_type<'e, E>(
        &self,
        executor: E,
        service_type_id: i64,
        name: &str,
        unit: &str,
        productivity_rate: Option<Decimal>,
        labor_cost_per_day: Option<Decimal>,
        social_charges_percent: Decimal,
        includes_social_charges: bool,
    ) -> Result<Option<ServiceType>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let service_type = sqlx::query_as::<_, ServiceType>(
            r#"
            UPDATE service_types
            SET name = $1,
                unit = $2,
                productivity_rate = $3,
                labor_cost_per_day = $4,
                social_charges_percent = $5,
                includes_social_charges = $6,
                updated_at = NOW()
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(unit)
        .bind(productivity_rate)
        .bind(labor_cost_per_day)
        .bind(social_charges_percent)
        .bind(includes_social_charges)
        .bind(service_type_id)
        .fetch_optional(executor)
        .await?;

        Ok(service_type)
    }

    pub async fn delete_service_type_materials<'e, E>(
        &self,
        executor: E,
        service_type_id: i64,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM service_type_materials WHERE service_type_id = $1")
            .bind(service_type_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    // Insere a linha e devolve já com o snapshot do material (CTE + JOIN numa query só)
    pub async fn add_service_type_material<'e, E>(
        &self,
        executor: E,
        service_type_id: i64,
        material_id: i64,
        quantity_per_unit: Decimal,
        position: i32,
    ) -> Result<ServiceTypeMaterial, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            WITH stm AS (
                INSERT INTO service_type_materials (service_type_id, material_id, quantity_per_unit, position)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT {SERVICE_TYPE_MATERIAL_COLUMNS}
            FROM stm
            JOIN materials m ON m.id = stm.material_id
            "#
        );

        let line = sqlx::query_as::<_, ServiceTypeMaterial>(&sql)
            .bind(service_type_id)
            .bind(material_id)
            .bind(quantity_per_unit)
            .bind(position)
            .fetch_one(executor)
            .await?;

        Ok(line)
    }

    pub async fn list_service_types(&self) -> Result<Vec<ServiceType>, AppError> {
        let types = sqlx::query_as::<_, ServiceType>("SELECT * FROM service_types ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(types)
    }

    pub async fn get_service_type<'e, E>(
        &self,
        executor: E,
        service_type_id: i64,
    ) -> Result<Option<ServiceType>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let service_type =
            sqlx::query_as::<_, ServiceType>("SELECT * FROM service_types WHERE id = $1")
                .bind(service_type_id)
                .fetch_optional(executor)
                .await?;

        Ok(service_type)
    }

    pub async fn list_service_type_materials<'e, E>(
        &self,
        executor: E,
        service_type_id: i64,
    ) -> Result<Vec<ServiceTypeMaterial>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {SERVICE_TYPE_MATERIAL_COLUMNS}
            FROM service_type_materials stm
            JOIN materials m ON m.id = stm.material_id
            WHERE stm.service_type_id = $1
            ORDER BY stm.position ASC, stm.id ASC
            "#
        );

        let lines = sqlx::query_as::<_, ServiceTypeMaterial>(&sql)
            .bind(service_type_id)
            .fetch_all(executor)
            .await?;

        Ok(lines)
    }

    /// Materiais de vários templates de uma vez (usado na materialização).
    pub async fn list_materials_for_service_types<'e, E>(
        &self,
        executor: E,
        service_type_ids: &[i64],
    ) -> Result<Vec<ServiceTypeMaterial>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {SERVICE_TYPE_MATERIAL_COLUMNS}
            FROM service_type_materials stm
            JOIN materials m ON m.id = stm.material_id
            WHERE stm.service_type_id = ANY($1)
            ORDER BY stm.service_type_id ASC, stm.position ASC, stm.id ASC
            "#
        );

        let lines = sqlx::query_as::<_, ServiceTypeMaterial>(&sql)
            .bind(service_type_ids)
            .fetch_all(executor)
            .await?;

        Ok(lines)
    }

    pub async fn existing_service_type_ids<'e, E>(
        &self,
        executor: E,
        service_type_ids: &[i64],
    ) -> Result<Vec<i64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM service_types WHERE id = ANY($1)")
            .bind(service_type_ids)
            .fetch_all(executor)
            .await?;

        Ok(ids)
    }

    pub async fn delete_service_type<'e, E>(
        &self,
        executor: E,
        service_type_id: i64,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM service_types WHERE id = $1")
            .bind(service_type_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
