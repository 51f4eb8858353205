// src/db/quotation_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, FromRow, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::budget::{MaterialLine, Quotation, QuotationItem, QuotationStatus},
};

// Linha de material + o item dono (para montar o orçamento com uma query só)
#[derive(Debug, FromRow)]
pub struct ItemMaterialRow {
    pub item_id: i64,
    #[sqlx(flatten)]
    pub line: MaterialLine,
}

const ITEM_COLUMNS: &str = r#"
    id, quotation_id, position, service_type_id, description, quantity, unit,
    estimated_days, materials_cost, labor_cost, fixed_cost, manual_price, subtotal
"#;

const MATERIAL_LINE_COLUMNS: &str = r#"
    item_id, material_id, name, quantity, raw_quantity, unit, unit_price, total, is_custom
"#;

#[derive(Clone)]
pub struct QuotationRepository {
    pool: PgPool,
}

impl QuotationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CABEÇALHO
    // =========================================================================

    pub async fn create_quotation<'e, E>(
        &self,
        executor: E,
        client_id: Option<i64>,
        title: &str,
        notes: Option<&str>,
        apply_margin: bool,
        margin_percent: Decimal,
    ) -> Result<Quotation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quotation = sqlx::query_as::<_, Quotation>(
            r#"
            INSERT INTO quotations (client_id, title, notes, apply_margin, margin_percent)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(client_id)
        .bind(title)
        .bind(notes)
        .bind(apply_margin)
        .bind(margin_percent)
        .fetch_one(executor)
        .await?;

        Ok(quotation)
    }

    pub async fn list_quotations(&self) -> Result<Vec<Quotation>, AppError> {
        let quotations =
            sqlx::query_as::<_, Quotation>("SELECT * FROM quotations ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(quotations)
    }

    pub async fn get_quotation<'e, E>(
        &self,
        executor: E,
        quotation_id: i64,
    ) -> Result<Option<Quotation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quotation = sqlx::query_as::<_, Quotation>("SELECT * FROM quotations WHERE id = $1")
            .bind(quotation_id)
            .fetch_optional(executor)
            .await?;

        Ok(quotation)
    }

    /// Trava o orçamento: edições de itens e o recálculo do total ficam serializados.
    pub async fn get_quotation_for_update<'e, E>(
        &self,
        executor: E,
        quotation_id: i64,
    ) -> Result<Option<Quotation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quotation =
            sqlx::query_as::<_, Quotation>("SELECT * FROM quotations WHERE id = $1 FOR UPDATE")
                .bind(quotation_id)
                .fetch_optional(executor)
                .await?;

        Ok(quotation)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        quotation_id: i64,
        status: QuotationStatus,
    ) -> Result<Quotation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quotation = sqlx::query_as::<_, Quotation>(
            r#"
            UPDATE quotations
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(quotation_id)
        .fetch_one(executor)
        .await?;

        Ok(quotation)
    }

    pub async fn update_margin<'e, E>(
        &self,
        executor: E,
        quotation_id: i64,
        apply_margin: bool,
        margin_percent: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE quotations
            SET apply_margin = $1, margin_percent = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(apply_margin)
        .bind(margin_percent)
        .bind(quotation_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn update_total<'e, E>(
        &self,
        executor: E,
        quotation_id: i64,
        total: Decimal,
    ) -> Result<Quotation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quotation = sqlx::query_as::<_, Quotation>(
            r#"
            UPDATE quotations
            SET total = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(total)
        .bind(quotation_id)
        .fetch_one(executor)
        .await?;

        Ok(quotation)
    }

    // =========================================================================
    //  ITENS
    // =========================================================================

    pub async fn list_items<'e, E>(
        &self,
        executor: E,
        quotation_id: i64,
    ) -> Result<Vec<QuotationItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM quotation_items WHERE quotation_id = $1 ORDER BY position ASC, id ASC"
        );

        let items = sqlx::query_as::<_, QuotationItem>(&sql)
            .bind(quotation_id)
            .fetch_all(executor)
            .await?;

        Ok(items)
    }

    pub async fn get_item<'e, E>(
        &self,
        executor: E,
        quotation_id: i64,
        item_id: i64,
    ) -> Result<Option<QuotationItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM quotation_items WHERE quotation_id = $1 AND id = $2"
        );

        let item = sqlx::query_as::<_, QuotationItem>(&sql)
            .bind(quotation_id)
            .bind(item_id)
            .fetch_optional(executor)
            .await?;

        Ok(item)
    }

    // A posição é a próxima livre dentro do orçamento
    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        quotation_id: i64,
        item: &QuotationItem,
    ) -> Result<QuotationItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO quotation_items (
                quotation_id, position, service_type_id, description, quantity, unit,
                estimated_days, materials_cost, labor_cost, fixed_cost, manual_price, subtotal
            )
            VALUES (
                $1,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM quotation_items WHERE quotation_id = $1),
                $2, $3, $4, $5, $6, $7, $8, $9, $10, $11
            )
            RETURNING {ITEM_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, QuotationItem>(&sql)
            .bind(quotation_id)
            .bind(item.service_type_id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(&item.unit)
            .bind(item.estimated_days)
            .bind(item.materials_cost)
            .bind(item.labor_cost)
            .bind(item.fixed_cost)
            .bind(item.manual_price)
            .bind(item.subtotal)
            .fetch_one(executor)
            .await?;

        Ok(created)
    }

    pub async fn update_item<'e, E>(&self, executor: E, item: &QuotationItem) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE quotation_items
            SET description = $1, quantity = $2, estimated_days = $3,
                materials_cost = $4, labor_cost = $5, fixed_cost = $6,
                manual_price = $7, subtotal = $8
            WHERE id = $9 AND quotation_id = $10
            "#,
        )
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.estimated_days)
        .bind(item.materials_cost)
        .bind(item.labor_cost)
        .bind(item.fixed_cost)
        .bind(item.manual_price)
        .bind(item.subtotal)
        .bind(item.id)
        .bind(item.quotation_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn delete_item<'e, E>(
        &self,
        executor: E,
        quotation_id: i64,
        item_id: i64,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM quotation_items WHERE id = $1 AND quotation_id = $2")
            .bind(item_id)
            .bind(quotation_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  LINHAS DE MATERIAL
    // =========================================================================

    pub async fn list_item_materials<'e, E>(
        &self,
        executor: E,
        item_id: i64,
    ) -> Result<Vec<MaterialLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {MATERIAL_LINE_COLUMNS} FROM quotation_item_materials WHERE item_id = $1 ORDER BY id ASC"
        );

        let rows = sqlx::query_as::<_, ItemMaterialRow>(&sql)
            .bind(item_id)
            .fetch_all(executor)
            .await?;

        Ok(rows.into_iter().map(|r| r.line).collect())
    }

    pub async fn list_quotation_materials<'e, E>(
        &self,
        executor: E,
        quotation_id: i64,
    ) -> Result<Vec<ItemMaterialRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {MATERIAL_LINE_COLUMNS}
            FROM quotation_item_materials
            WHERE item_id IN (SELECT id FROM quotation_items WHERE quotation_id = $1)
            ORDER BY item_id ASC, id ASC
            "#
        );

        let rows = sqlx::query_as::<_, ItemMaterialRow>(&sql)
            .bind(quotation_id)
            .fetch_all(executor)
            .await?;

        Ok(rows)
    }

    pub async fn insert_item_material<'e, E>(
        &self,
        executor: E,
        item_id: i64,
        line: &MaterialLine,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO quotation_item_materials (
                item_id, material_id, name, quantity, raw_quantity, unit, unit_price, total, is_custom
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(item_id)
        .bind(line.material_id)
        .bind(&line.name)
        .bind(line.quantity)
        .bind(line.raw_quantity)
        .bind(&line.unit)
        .bind(line.unit_price)
        .bind(line.total)
        .bind(line.is_custom)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn delete_item_materials<'e, E>(&self, executor: E, item_id: i64) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM quotation_item_materials WHERE item_id = $1")
            .bind(item_id)
            .execute(executor)
            .await?;

        Ok(())
    }
}
