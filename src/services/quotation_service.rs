// src/services/quotation_service.rs

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{PgConnection, PgPool};

use crate::{
    common::error::AppError,
    db::{quotation_repo::ItemMaterialRow, CatalogRepository, QuotationRepository, SettingsRepository},
    models::budget::{
        MaterialLine, Quotation, QuotationDetail, QuotationItem, QuotationOverview, QuotationStatus,
    },
    services::{cost_estimator, quotation_aggregator},
};

/// Distribui as linhas de material (já ordenadas) pelos itens donos.
pub fn attach_lines(items: &mut [QuotationItem], rows: Vec<ItemMaterialRow>) {
    let mut by_item: HashMap<i64, Vec<MaterialLine>> = HashMap::new();
    for row in rows {
        by_item.entry(row.item_id).or_default().push(row.line);
    }
    for item in items.iter_mut() {
        item.materials = by_item.remove(&item.id).unwrap_or_default();
    }
}

// Linha avulsa: quantidade informada é a própria quantidade de compra
pub fn custom_line(
    material_id: Option<i64>,
    name: &str,
    quantity: Decimal,
    unit: &str,
    unit_price: Decimal,
) -> MaterialLine {
    MaterialLine {
        material_id,
        name: name.to_string(),
        quantity,
        raw_quantity: quantity,
        unit: unit.trim().to_string(),
        unit_price,
        total: quantity * unit_price,
        is_custom: true,
    }
}

#[derive(Clone)]
pub struct QuotationService {
    repo: QuotationRepository,
    catalog_repo: CatalogRepository,
    settings_repo: SettingsRepository,
    pool: PgPool,
}

impl QuotationService {
    pub fn new(
        repo: QuotationRepository,
        catalog_repo: CatalogRepository,
        settings_repo: SettingsRepository,
        pool: PgPool,
    ) -> Self {
        Self { repo, catalog_repo, settings_repo, pool }
    }

    // =========================================================================
    //  HELPERS (sempre dentro da conexão/transação de quem chama)
    // =========================================================================

    async fn load_items(
        &self,
        conn: &mut PgConnection,
        quotation_id: i64,
    ) -> Result<Vec<QuotationItem>, AppError> {
        let mut items = self.repo.list_items(&mut *conn, quotation_id).await?;
        let rows = self.repo.list_quotation_materials(&mut *conn, quotation_id).await?;
        attach_lines(&mut items, rows);
        Ok(items)
    }

    async fn load_item(
        &self,
        conn: &mut PgConnection,
        quotation_id: i64,
        item_id: i64,
    ) -> Result<QuotationItem, AppError> {
        let mut item = self
            .repo
            .get_item(&mut *conn, quotation_id, item_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Item {item_id}")))?;
        item.materials = self.repo.list_item_materials(&mut *conn, item_id).await?;
        Ok(item)
    }

    /// Trava o orçamento e confirma que ainda aceita edição de itens.
    async fn lock_editable(
        &self,
        conn: &mut PgConnection,
        quotation_id: i64,
    ) -> Result<Quotation, AppError> {
        let quotation = self
            .repo
            .get_quotation_for_update(&mut *conn, quotation_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Orçamento {quotation_id}")))?;

        if !quotation.status.accepts_item_changes() {
            return Err(AppError::QuotationLocked(quotation.status));
        }
        Ok(quotation)
    }

    // Regrava as linhas do item (template recalculado + avulsas preservadas)
    async fn replace_lines(&self, conn: &mut PgConnection, item: &QuotationItem) -> Result<(), AppError> {
        self.repo.delete_item_materials(&mut *conn, item.id).await?;
        for line in &item.materials {
            self.repo.insert_item_material(&mut *conn, item.id, line).await?;
        }
        Ok(())
    }

    /// Recalcula e grava o total persistido (custo base + margem).
    async fn recompute_total(
        &self,
        conn: &mut PgConnection,
        quotation: &Quotation,
    ) -> Result<Quotation, AppError> {
        let items = self.repo.list_items(&mut *conn, quotation.id).await?;
        let summary =
            quotation_aggregator::aggregate(&items, quotation.apply_margin, quotation.margin_percent);
        let total = summary.total.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        self.repo.update_total(&mut *conn, quotation.id, total).await
    }

    // =========================================================================
    //  CABEÇALHO
    // =========================================================================

    pub async fn create_quotation(
        &self,
        client_id: Option<i64>,
        title: &str,
        notes: Option<&str>,
        apply_margin: Option<bool>,
        margin_percent: Option<Decimal>,
    ) -> Result<Quotation, AppError> {
        // Margem padrão vem das configurações quando não informada
        let margin_percent = match margin_percent {
            Some(m) => m,
            None => self.settings_repo.current().await?.default_margin_percent,
        };

        let quotation = self
            .repo
            .create_quotation(
                &self.pool,
                client_id,
                title,
                notes,
                apply_margin.unwrap_or(true),
                margin_percent,
            )
            .await?;

        tracing::info!(quotation_id = quotation.id, "Orçamento criado");
        Ok(quotation)
    }

    pub async fn list_quotations(&self) -> Result<Vec<Quotation>, AppError> {
        self.repo.list_quotations().await
    }

    pub async fn get_detail(&self, quotation_id: i64) -> Result<QuotationDetail, AppError> {
        let mut conn = self.pool.acquire().await?;

        let quotation = self
            .repo
            .get_quotation(&mut *conn, quotation_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Orçamento {quotation_id}")))?;
        let items = self.load_items(&mut conn, quotation_id).await?;

        Ok(QuotationDetail { quotation, items })
    }

    /// Resumo: custo base, margem, total, lista de compras e a prévia comercial.
    pub async fn overview(&self, quotation_id: i64) -> Result<QuotationOverview, AppError> {
        let detail = self.get_detail(quotation_id).await?;

        let summary = quotation_aggregator::aggregate(
            &detail.items,
            detail.quotation.apply_margin,
            detail.quotation.margin_percent,
        );
        let commercial_preview = quotation_aggregator::commercial_preview(&detail.items, &summary);

        Ok(QuotationOverview { summary, commercial_preview })
    }

    pub async fn update_margin(
        &self,
        quotation_id: i64,
        apply_margin: bool,
        margin_percent: Decimal,
    ) -> Result<Quotation, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut quotation = self.lock_editable(&mut tx, quotation_id).await?;
        self.repo.update_margin(&mut *tx, quotation_id, apply_margin, margin_percent).await?;
        quotation.apply_margin = apply_margin;
        quotation.margin_percent = margin_percent;

        let quotation = self.recompute_total(&mut tx, &quotation).await?;

        tx.commit().await?;
        Ok(quotation)
    }

    pub async fn transition_status(
        &self,
        quotation_id: i64,
        next: QuotationStatus,
    ) -> Result<Quotation, AppError> {
        let mut tx = self.pool.begin().await?;

        let quotation = self
            .repo
            .get_quotation_for_update(&mut *tx, quotation_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Orçamento {quotation_id}")))?;

        if !quotation.status.can_transition_to(next) {
            return Err(AppError::InvalidStatusTransition { from: quotation.status, to: next });
        }

        let updated = self.repo.update_status(&mut *tx, quotation_id, next).await?;

        tx.commit().await?;

        tracing::info!(quotation_id, from = ?quotation.status, to = ?next, "Status do orçamento alterado");
        Ok(updated)
    }

    // =========================================================================
    //  ITENS
    // =========================================================================

    /// Item de template: estimado com o template e os preços vigentes.
    pub async fn add_template_item(
        &self,
        quotation_id: i64,
        service_type_id: i64,
        quantity: Decimal,
        description: Option<&str>,
    ) -> Result<QuotationItem, AppError> {
        let mut tx = self.pool.begin().await?;

        let quotation = self.lock_editable(&mut tx, quotation_id).await?;

        let service_type = self
            .catalog_repo
            .get_service_type(&mut *tx, service_type_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Tipo de serviço {service_type_id}")))?;
        let template = self.catalog_repo.list_service_type_materials(&mut *tx, service_type_id).await?;
        let settings = self.settings_repo.get_settings(&mut *tx).await?;

        let estimate = cost_estimator::estimate(&service_type, &template, quantity, &settings)?;

        let mut item = QuotationItem {
            quotation_id,
            service_type_id: Some(service_type_id),
            description: description.unwrap_or(service_type.name.as_str()).to_string(),
            unit: service_type.unit.clone(),
            ..QuotationItem::default()
        };
        item.apply_estimate(estimate);

        let mut created = self.repo.insert_item(&mut *tx, quotation_id, &item).await?;
        created.materials = item.materials;
        self.replace_lines(&mut tx, &created).await?;

        self.recompute_total(&mut tx, &quotation).await?;
        tx.commit().await?;

        tracing::info!(quotation_id, item_id = created.id, subtotal = %created.subtotal, "Item de template adicionado");
        Ok(created)
    }

    /// Item manual: preço fixo informado pelo operador, sem template.
    pub async fn add_manual_item(
        &self,
        quotation_id: i64,
        description: &str,
        quantity: Decimal,
        unit: &str,
        manual_price: Decimal,
    ) -> Result<QuotationItem, AppError> {
        if quantity <= Decimal::ZERO {
            return Err(AppError::InvalidQuantity { quantity, max: None });
        }

        let mut tx = self.pool.begin().await?;
        let quotation = self.lock_editable(&mut tx, quotation_id).await?;

        let mut item = QuotationItem {
            quotation_id,
            description: description.to_string(),
            quantity,
            unit: unit.trim().to_string(),
            manual_price: Some(manual_price),
            ..QuotationItem::default()
        };
        item.recompute_subtotal();

        let created = self.repo.insert_item(&mut *tx, quotation_id, &item).await?;

        self.recompute_total(&mut tx, &quotation).await?;
        tx.commit().await?;

        tracing::info!(quotation_id, item_id = created.id, "Item manual adicionado");
        Ok(created)
    }

    /// Nova quantidade re-estima o item de template; preço manual só vale para itens manuais.
    pub async fn update_item(
        &self,
        quotation_id: i64,
        item_id: i64,
        description: Option<&str>,
        quantity: Option<Decimal>,
        manual_price: Option<Decimal>,
    ) -> Result<QuotationItem, AppError> {
        let mut tx = self.pool.begin().await?;

        let quotation = self.lock_editable(&mut tx, quotation_id).await?;
        let mut item = self.load_item(&mut tx, quotation_id, item_id).await?;

        if let Some(description) = description {
            item.description = description.to_string();
        }

        match item.service_type_id {
            Some(service_type_id) => {
                if let Some(quantity) = quantity {
                    let service_type = self
                        .catalog_repo
                        .get_service_type(&mut *tx, service_type_id)
                        .await?
                        .ok_or_else(|| {
                            AppError::ResourceNotFound(format!("Tipo de serviço {service_type_id}"))
                        })?;
                    let template =
                        self.catalog_repo.list_service_type_materials(&mut *tx, service_type_id).await?;
                    let settings = self.settings_repo.get_settings(&mut *tx).await?;

                    let estimate = cost_estimator::estimate(&service_type, &template, quantity, &settings)?;
                    item.apply_estimate(estimate);
                    self.replace_lines(&mut tx, &item).await?;
                }
            }
            None => {
                if let Some(quantity) = quantity {
                    if quantity <= Decimal::ZERO {
                        return Err(AppError::InvalidQuantity { quantity, max: None });
                    }
                    item.quantity = quantity;
                }
                if manual_price.is_some() {
                    item.manual_price = manual_price;
                }
                item.recompute_subtotal();
            }
        }

        self.repo.update_item(&mut *tx, &item).await?;
        self.recompute_total(&mut tx, &quotation).await?;
        tx.commit().await?;

        tracing::info!(quotation_id, item_id, subtotal = %item.subtotal, "Item atualizado");
        Ok(item)
    }

    pub async fn delete_item(&self, quotation_id: i64, item_id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let quotation = self.lock_editable(&mut tx, quotation_id).await?;
        if !self.repo.delete_item(&mut *tx, quotation_id, item_id).await? {
            return Err(AppError::ResourceNotFound(format!("Item {item_id}")));
        }

        self.recompute_total(&mut tx, &quotation).await?;
        tx.commit().await?;

        tracing::info!(quotation_id, item_id, "Item removido");
        Ok(())
    }

    /// Linha de material avulsa (frete, material fora do template...).
    #[allow(clippy::too_many_arguments)]
    pub async fn add_custom_material(
        &self,
        quotation_id: i64,
        item_id: i64,
        material_id: Option<i64>,
        name: &str,
        quantity: Decimal,
        unit: &str,
        unit_price: Decimal,
    ) -> Result<QuotationItem, AppError> {
        if quantity <= Decimal::ZERO {
            return Err(AppError::InvalidQuantity { quantity, max: None });
        }

        let mut tx = self.pool.begin().await?;

        let quotation = self.lock_editable(&mut tx, quotation_id).await?;
        let mut item = self.load_item(&mut tx, quotation_id, item_id).await?;

        let line = custom_line(material_id, name, quantity, unit, unit_price);
        self.repo.insert_item_material(&mut *tx, item.id, &line).await?;
        item.add_custom_material(line);

        self.repo.update_item(&mut *tx, &item).await?;
        self.recompute_total(&mut tx, &quotation).await?;
        tx.commit().await?;

        tracing::info!(quotation_id, item_id, "Material avulso adicionado");
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(item_id: i64, name: &str) -> ItemMaterialRow {
        ItemMaterialRow { item_id, line: custom_line(None, name, dec!(1), "gl", dec!(100)) }
    }

    #[test]
    fn lines_are_attached_to_their_items_in_order() {
        let mut items = vec![
            QuotationItem { id: 1, ..QuotationItem::default() },
            QuotationItem { id: 2, ..QuotationItem::default() },
            QuotationItem { id: 3, ..QuotationItem::default() },
        ];

        attach_lines(&mut items, vec![row(1, "Arena"), row(1, "Cal"), row(3, "Flete")]);

        assert_eq!(items[0].materials.len(), 2);
        assert_eq!(items[0].materials[1].name, "Cal");
        assert!(items[1].materials.is_empty());
        assert_eq!(items[2].materials[0].name, "Flete");
    }

    #[test]
    fn custom_line_uses_the_given_quantity_for_cost() {
        let line = custom_line(Some(4), "Hierro 8mm", dec!(12.5), " kg ", dec!(1800));

        assert_eq!(line.quantity, dec!(12.5));
        assert_eq!(line.raw_quantity, dec!(12.5));
        assert_eq!(line.total, dec!(22500));
        assert_eq!(line.unit, "kg");
        assert!(line.is_custom);
    }

    #[test]
    fn custom_line_raises_template_item_subtotal() {
        let mut item = QuotationItem {
            service_type_id: Some(3),
            materials_cost: dec!(153600),
            labor_cost: dec!(237500),
            ..QuotationItem::default()
        };
        item.recompute_subtotal();

        item.add_custom_material(custom_line(None, "Flete", dec!(1), "gl", dec!(35000)));

        assert_eq!(item.materials_cost, dec!(188600));
        assert_eq!(item.subtotal, dec!(426100));
    }

    #[test]
    fn custom_line_does_not_change_manual_price() {
        let mut item = QuotationItem {
            manual_price: Some(dec!(80000)),
            ..QuotationItem::default()
        };
        item.recompute_subtotal();

        item.add_custom_material(custom_line(None, "Bolsas de residuo", dec!(4), "un", dec!(1500)));

        assert_eq!(item.subtotal, dec!(80000));
        assert_eq!(item.materials.len(), 1);
    }
}
