mod error;
mod json;
mod memory;
mod pg;
mod store;
pub mod models;

pub use error::{DbError, DbResult, IntegrityKind};
pub use json::JsonDirSource;
pub use memory::{MemorySource, MemoryStore};
pub use pg::{ENTITY_TABLE, PgLegacySource, PgMetaStore, connect, is_collection_name};
pub use sqlx::PgPool;
pub use store::{LegacySource, MetaStore, MetaStoreExt};
