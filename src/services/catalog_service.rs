// src/services/catalog_service.rs

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::{
    common::error::AppError,
    db::{CatalogRepository, SettingsRepository},
    models::{
        budget::EstimateResult,
        catalog::{
            Material, ServiceType, ServiceTypeDetail, ServiceTypeMaterial, ServiceTypeMaterialInput,
        },
    },
    services::cost_estimator,
};

#[derive(Clone)]
pub struct CatalogService {
    repo: CatalogRepository,
    settings_repo: SettingsRepository,
    pool: PgPool,
}

impl CatalogService {
    pub fn new(repo: CatalogRepository, settings_repo: SettingsRepository, pool: PgPool) -> Self {
        Self { repo, settings_repo, pool }
    }

    // =========================================================================
    //  MATERIAIS
    // =========================================================================

    pub async fn create_material(
        &self,
        name: &str,
        unit: &str,
        unit_price: Decimal,
    ) -> Result<Material, AppError> {
        let material = self.repo.create_material(&self.pool, name, unit.trim(), unit_price).await?;
        tracing::info!(material_id = material.id, "Material cadastrado");
        Ok(material)
    }

    pub async fn list_materials(&self) -> Result<Vec<Material>, AppError> {
        self.repo.list_materials().await
    }

    // Orçamentos já salvos não mudam; só novas estimativas e materializações enxergam o preço novo
    pub async fn update_material_price(
        &self,
        material_id: i64,
        unit_price: Decimal,
    ) -> Result<Material, AppError> {
        let material = self
            .repo
            .update_material_price(&self.pool, material_id, unit_price)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Material {material_id}")))?;

        tracing::info!(material_id, unit_price = %unit_price, "Preço de material atualizado");
        Ok(material)
    }

    // =========================================================================
    //  TIPOS DE SERVIÇO
    // =========================================================================

    // Lista ordenada do template; FK violada = material inexistente no catálogo
    async fn insert_template_lines(
        &self,
        conn: &mut PgConnection,
        service_type_id: i64,
        materials: &[ServiceTypeMaterialInput],
    ) -> Result<Vec<ServiceTypeMaterial>, AppError> {
        let mut lines = Vec::with_capacity(materials.len());
        for (position, input) in materials.iter().enumerate() {
            let line = self
                .repo
                .add_service_type_material(
                    &mut *conn,
                    service_type_id,
                    input.material_id,
                    input.quantity_per_unit,
                    position as i32,
                )
                .await
                .map_err(|e| match e {
                    AppError::DatabaseError(sqlx::Error::Database(db))
                        if db.is_foreign_key_violation() =>
                    {
                        AppError::ResourceNotFound(format!("Material {}", input.material_id))
                    }
                    other => other,
                })?;
            lines.push(line);
        }
        Ok(lines)
    }

    /// Cria o template e a lista ordenada de materiais numa transação só.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_service_type(
        &self,
        name: &str,
        unit: &str,
        productivity_rate: Option<Decimal>,
        labor_cost_per_day: Option<Decimal>,
        social_charges_percent: Decimal,
        includes_social_charges: bool,
        materials: &[ServiceTypeMaterialInput],
    ) -> Result<ServiceTypeDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let service_type = self
            .repo
            .create_service_type(
                &mut *tx,
                name,
                unit.trim(),
                productivity_rate,
                labor_cost_per_day,
                social_charges_percent,
                includes_social_charges,
            )
            .await?;

        let lines = self.insert_template_lines(&mut tx, service_type.id, materials).await?;

        tx.commit().await?;

        tracing::info!(service_type_id = service_type.id, materials = lines.len(), "Tipo de serviço criado");
        Ok(ServiceTypeDetail { service_type, materials: lines })
    }

    /// Edita o template: campos de custo + troca da lista de materiais, tudo ou nada.
    /// Orçamentos já salvos não mudam; a próxima materialização enxerga o template novo.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_service_type(
        &self,
        service_type_id: i64,
        name: &str,
        unit: &str,
        productivity_rate: Option<Decimal>,
        labor_cost_per_day: Option<Decimal>,
        social_charges_percent: Decimal,
        includes_social_charges: bool,
        materials: &[ServiceTypeMaterialInput],
    ) -> Result<ServiceTypeDetail, AppError> {
        let mut tx = self.pool.begin().await?;

        let service_type = self
            .repo
            .update_service_type(
                &mut *tx,
                service_type_id,
                name,
                unit.trim(),
                productivity_rate,
                labor_cost_per_day,
                social_charges_percent,
                includes_social_charges,
            )
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Tipo de serviço {service_type_id}")))?;

        self.repo.delete_service_type_materials(&mut *tx, service_type_id).await?;
        let lines = self.insert_template_lines(&mut tx, service_type_id, materials).await?;

        tx.commit().await?;

        tracing::info!(service_type_id, materials = lines.len(), "Tipo de serviço atualizado");
        Ok(ServiceTypeDetail { service_type, materials: lines })
    }

    pub async fn list_service_types(&self) -> Result<Vec<ServiceType>, AppError> {
        self.repo.list_service_types().await
    }

    pub async fn get_service_type(&self, service_type_id: i64) -> Result<ServiceTypeDetail, AppError> {
        let service_type = self
            .repo
            .get_service_type(&self.pool, service_type_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Tipo de serviço {service_type_id}")))?;

        let materials = self.repo.list_service_type_materials(&self.pool, service_type_id).await?;

        Ok(ServiceTypeDetail { service_type, materials })
    }

    // Itens e rubros guardam só o ID (referência fraca), então nada mais muda
    pub async fn delete_service_type(&self, service_type_id: i64) -> Result<(), AppError> {
        let deleted = self.repo.delete_service_type(&self.pool, service_type_id).await?;
        if !deleted {
            return Err(AppError::ResourceNotFound(format!("Tipo de serviço {service_type_id}")));
        }

        tracing::info!(service_type_id, "Tipo de serviço removido");
        Ok(())
    }

    /// Estimativa avulsa (pré-visualização), sem gravar nada.
    pub async fn estimate(
        &self,
        service_type_id: i64,
        quantity: Decimal,
    ) -> Result<EstimateResult, AppError> {
        let detail = self.get_service_type(service_type_id).await?;
        let settings = self.settings_repo.current().await?;

        cost_estimator::estimate(&detail.service_type, &detail.materials, quantity, &settings)
    }
}
