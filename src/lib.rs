//! credvault: A structured credential store with schema-driven validation.

pub mod cli;
pub mod codec;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod groups;
pub mod models;
pub mod repository;
pub mod schema;
pub mod utils;
pub mod validators;

// Re-export commonly used types
pub use config::{Config, FieldPolicy};
pub use db::Database;
pub use engine::{ValidationEngine, ValidationFailure, ValidationFailures, ValidationOutcome};
pub use error::{Result, SchemaConfigError, VaultError};
pub use groups::GroupHierarchy;
pub use repository::EntryRepository;
pub use schema::TemplateSchema;
pub use validators::ValidatorRegistry;
