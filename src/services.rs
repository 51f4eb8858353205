// Núcleo puro (sem banco)
pub mod cost_estimator;
pub mod progress_tracker;
pub mod quotation_aggregator;
pub mod rubro_materializer;

// Serviços transacionais
pub mod catalog_service;
pub mod finance_service;
pub mod progress_service;
pub mod project_service;
pub mod quotation_service;

pub use catalog_service::CatalogService;
pub use finance_service::FinanceService;
pub use progress_service::ProgressService;
pub use project_service::ProjectService;
pub use quotation_service::QuotationService;
