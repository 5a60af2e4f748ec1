//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking
//! against a SQLite catalog.

pub mod catalog;
pub mod context;
pub mod models;
pub mod pool;
pub mod settings;
pub mod util;

pub use catalog::{CatalogRepository, Reconciled, VersionCandidate, VersionOutcome};
pub use context::CatalogContext;
pub use pool::{DbError, DbPool};
pub use settings::SettingsRepository;
pub use util::{parse_datetime, parse_datetime_opt};
