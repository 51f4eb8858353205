pub mod budget;
pub mod catalog;
pub mod finance;
pub mod project;
pub mod settings;
