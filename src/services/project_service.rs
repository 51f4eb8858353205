// src/services/project_service.rs

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};

use crate::{
    common::error::AppError,
    db::{CatalogRepository, ProjectRepository, QuotationRepository},
    models::{
        budget::QuotationStatus,
        catalog::ServiceTypeMaterial,
        project::{ProjectDetail, ProjectProgress, ProjectRubro, RubroMaterial},
    },
    services::{progress_tracker, quotation_service::attach_lines, rubro_materializer},
};

/// Pendura os materiais (já ordenados por rubro/id) nos rubros donos.
pub fn attach_materials(rubros: &mut [ProjectRubro], materials: Vec<RubroMaterial>) {
    let mut by_rubro: HashMap<i64, Vec<RubroMaterial>> = HashMap::new();
    for mut material in materials {
        // `applied` sempre re-derivado da comparação
        material.sync_applied_flag();
        by_rubro.entry(material.rubro_id).or_default().push(material);
    }
    for rubro in rubros.iter_mut() {
        rubro.materials = by_rubro.remove(&rubro.id).unwrap_or_default();
    }
}

#[derive(Clone)]
pub struct ProjectService {
    repo: ProjectRepository,
    quotation_repo: QuotationRepository,
    catalog_repo: CatalogRepository,
    pool: PgPool,
}

impl ProjectService {
    pub fn new(
        repo: ProjectRepository,
        quotation_repo: QuotationRepository,
        catalog_repo: CatalogRepository,
        pool: PgPool,
    ) -> Self {
        Self { repo, quotation_repo, catalog_repo, pool }
    }

    async fn load_rubros(
        &self,
        conn: &mut PgConnection,
        project_id: i64,
    ) -> Result<Vec<ProjectRubro>, AppError> {
        let mut rubros = self.repo.list_rubros(&mut *conn, project_id).await?;
        let materials = self.repo.list_materials_for_project(&mut *conn, project_id).await?;
        attach_materials(&mut rubros, materials);
        Ok(rubros)
    }

    /// LÓGICA DE NEGÓCIO: transforma um orçamento pago em obra.
    /// Obra + rubros + materiais + checagem de status numa transação só.
    pub async fn create_from_quotation(
        &self,
        quotation_id: i64,
        name: Option<&str>,
    ) -> Result<ProjectDetail, AppError> {
        // 1. Inicia a transação
        let mut tx = self.pool.begin().await?;

        // 2. Trava o orçamento (duas conversões simultâneas não passam daqui)
        let quotation = self
            .quotation_repo
            .get_quotation_for_update(&mut *tx, quotation_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Orçamento {quotation_id}")))?;

        if quotation.status != QuotationStatus::Paid {
            return Err(AppError::QuotationNotPaid(quotation.status));
        }

        if self.repo.find_by_quotation(&mut *tx, quotation_id).await?.is_some() {
            return Err(AppError::QuotationAlreadyConverted { quotation_id });
        }

        // 3. Itens com as linhas de material
        let mut items = self.quotation_repo.list_items(&mut *tx, quotation_id).await?;
        let rows = self.quotation_repo.list_quotation_materials(&mut *tx, quotation_id).await?;
        attach_lines(&mut items, rows);

        // 4. Templates vigentes dos tipos de serviço referenciados
        let mut service_type_ids: Vec<i64> = items.iter().filter_map(|i| i.service_type_id).collect();
        service_type_ids.sort_unstable();
        service_type_ids.dedup();

        let existing = self.catalog_repo.existing_service_type_ids(&mut *tx, &service_type_ids).await?;
        let lines = self
            .catalog_repo
            .list_materials_for_service_types(&mut *tx, &service_type_ids)
            .await?;

        // Tipo existente sem materiais também conta como template (lista vazia)
        let mut templates: HashMap<i64, Vec<ServiceTypeMaterial>> =
            existing.into_iter().map(|id| (id, Vec::new())).collect();
        for line in lines {
            templates.entry(line.service_type_id).or_default().push(line);
        }

        let new_rubros = rubro_materializer::materialize(&items, &templates);

        // 5. Grava a obra e os rubros
        let project = self
            .repo
            .create_project(
                &mut *tx,
                quotation_id,
                quotation.client_id,
                name.unwrap_or(quotation.title.as_str()),
            )
            .await?;

        let mut rubros = Vec::with_capacity(new_rubros.len());
        for new_rubro in &new_rubros {
            let mut rubro = self.repo.insert_rubro(&mut *tx, project.id, new_rubro).await?;
            for material in &new_rubro.materials {
                let created = self.repo.insert_rubro_material(&mut *tx, rubro.id, material).await?;
                rubro.materials.push(created);
            }
            rubros.push(rubro);
        }

        // 6. Commit
        tx.commit().await?;

        tracing::info!(
            project_id = project.id,
            quotation_id,
            rubros = rubros.len(),
            "Obra criada a partir do orçamento"
        );

        Ok(ProjectDetail { project, rubros })
    }

    pub async fn get_detail(&self, project_id: i64) -> Result<ProjectDetail, AppError> {
        let project = self
            .repo
            .get_project(project_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Obra {project_id}")))?;

        let mut conn = self.pool.acquire().await?;
        let rubros = self.load_rubros(&mut conn, project_id).await?;

        Ok(ProjectDetail { project, rubros })
    }

    pub async fn get_progress(&self, project_id: i64) -> Result<ProjectProgress, AppError> {
        let detail = self.get_detail(project_id).await?;
        Ok(progress_tracker::project_progress(project_id, &detail.rubros))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn material(id: i64, rubro_id: i64, applied: bool) -> RubroMaterial {
        RubroMaterial {
            id,
            rubro_id,
            name: format!("Material {id}"),
            cantidad: dec!(10),
            cantidad_aplicada: dec!(10),
            // Flag gravada fora de sincronia com as quantidades
            applied,
            ..RubroMaterial::default()
        }
    }

    #[test]
    fn materials_are_grouped_by_rubro() {
        let mut rubros = vec![
            ProjectRubro { id: 1, ..ProjectRubro::default() },
            ProjectRubro { id: 2, ..ProjectRubro::default() },
        ];

        attach_materials(&mut rubros, vec![material(10, 1, true), material(11, 2, true), material(12, 1, true)]);

        assert_eq!(rubros[0].materials.iter().map(|m| m.id).collect::<Vec<_>>(), vec![10, 12]);
        assert_eq!(rubros[1].materials.len(), 1);
    }

    #[test]
    fn applied_flag_is_rederived_on_load() {
        let mut rubros = vec![ProjectRubro { id: 1, ..ProjectRubro::default() }];

        attach_materials(&mut rubros, vec![material(10, 1, false)]);

        assert!(rubros[0].materials[0].applied);
    }

    #[test]
    fn rubros_without_materials_get_an_empty_list() {
        let mut rubros = vec![ProjectRubro { id: 5, ..ProjectRubro::default() }];

        attach_materials(&mut rubros, Vec::new());

        assert!(!rubros[0].has_materials());
    }
}
