pub mod catalog;
pub mod projects;
pub mod quotations;
pub mod settings;
