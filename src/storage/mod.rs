mod record;
mod repository;

pub use record::*;
pub use repository::*;

/// SQL migration for the per-user document table
pub const MIGRATION_001_DOCUMENTS: &str = include_str!("migrations/001_documents.sql");
