// src/config.rs

use crate::{
    common::i18n::I18nStore,
    db::{CatalogRepository, FinanceRepository, ProjectRepository, QuotationRepository, SettingsRepository},
    services::{CatalogService, FinanceService, ProgressService, ProjectService, QuotationService},
};
use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub bind_addr: String,
    pub i18n_store: I18nStore,

    pub settings_repo: SettingsRepository,

    pub catalog_service: CatalogService,
    pub quotation_service: QuotationService,
    pub project_service: ProjectService,
    pub progress_service: ProgressService,
    pub finance_service: FinanceService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("DB_MAX_CONNECTIONS inválido: {raw}"))?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!(max_connections, "✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let quotation_repo = QuotationRepository::new(db_pool.clone());
        let project_repo = ProjectRepository::new(db_pool.clone());
        let finance_repo = FinanceRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());

        let catalog_service =
            CatalogService::new(catalog_repo.clone(), settings_repo.clone(), db_pool.clone());
        let quotation_service = QuotationService::new(
            quotation_repo.clone(),
            catalog_repo.clone(),
            settings_repo.clone(),
            db_pool.clone(),
        );
        let project_service =
            ProjectService::new(project_repo.clone(), quotation_repo, catalog_repo, db_pool.clone());
        let finance_service =
            FinanceService::new(finance_repo, project_repo.clone(), db_pool.clone());
        let progress_service =
            ProgressService::new(project_repo, finance_service.clone(), db_pool.clone());

        Ok(Self {
            db_pool,
            bind_addr,
            i18n_store: I18nStore::new(),
            settings_repo,
            catalog_service,
            quotation_service,
            project_service,
            progress_service,
            finance_service,
        })
    }
}
