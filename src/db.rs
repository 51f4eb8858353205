pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod quotation_repo;
pub use quotation_repo::QuotationRepository;
pub mod project_repo;
pub use project_repo::ProjectRepository;
pub mod finance_repo;
pub use finance_repo::FinanceRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
