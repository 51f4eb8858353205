//src/main.rs

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;

fn router(app_state: AppState) -> Router {
    let catalog_routes = Router::new()
        .route("/materials"
               ,post(handlers::catalog::create_material)
               .get(handlers::catalog::list_materials)
        )
        .route("/materials/{id}/price", put(handlers::catalog::update_material_price))
        .route("/service-types"
               ,post(handlers::catalog::create_service_type)
               .get(handlers::catalog::list_service_types)
        )
        .route("/service-types/{id}"
               ,get(handlers::catalog::get_service_type)
               .put(handlers::catalog::update_service_type)
               .delete(handlers::catalog::delete_service_type)
        )
        .route("/service-types/{id}/estimate", post(handlers::catalog::estimate));

    let quotation_routes = Router::new()
        .route("/"
               ,post(handlers::quotations::create_quotation)
               .get(handlers::quotations::list_quotations)
        )
        .route("/{id}", get(handlers::quotations::get_quotation))
        .route("/{id}/summary", get(handlers::quotations::get_summary))
        .route("/{id}/margin", put(handlers::quotations::update_margin))
        .route("/{id}/status", post(handlers::quotations::transition_status))
        .route("/{id}/items", post(handlers::quotations::add_item))
        .route("/{id}/items/{item_id}"
               ,put(handlers::quotations::update_item)
               .delete(handlers::quotations::delete_item)
        )
        .route("/{id}/items/{item_id}/materials", post(handlers::quotations::add_custom_material))
        .route("/{id}/project", post(handlers::quotations::create_project));

    let project_routes = Router::new()
        .route("/{id}", get(handlers::projects::get_project))
        .route("/{id}/progress", get(handlers::projects::get_progress))
        .route("/{id}/apply", post(handlers::projects::apply_progress))
        .route("/{id}/cash-movements"
               ,get(handlers::projects::list_cash_movements)
               .post(handlers::projects::create_cash_movement)
        );

    let settings_routes = Router::new()
        .route("/budget"
               ,get(handlers::settings::get_settings)
               .put(handlers::settings::update_settings)
        );

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api", catalog_routes)
        .nest("/api/quotations", quotation_routes)
        .nest("/api/projects", project_routes)
        .nest("/api/settings", settings_routes)
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG manda; sem ele, `info`
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let app_state = AppState::new().await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let listener = TcpListener::bind(&app_state.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, router(app_state)).await?;
    Ok(())
}
