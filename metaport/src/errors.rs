use metaport_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Persistence error: {0}")]
    Db(#[from] DbError),

    #[error("Table {name} not found in tenant {tenant}")]
    UnresolvedTable { tenant: String, name: String },

    #[error("Column {table}.{name} not found in tenant {tenant}")]
    UnresolvedColumn {
        tenant: String,
        table: String,
        name: String,
    },

    #[error("No relation column on {table} matches the endpoints of {column}")]
    RelationNotFound { table: String, column: String },

    #[error("View {view} has unsupported type {show_as:?}")]
    UnsupportedViewType { view: String, show_as: Option<String> },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl MigrateError {
    pub const fn code(&self) -> &'static str {
        match self {
            MigrateError::Db(e) => e.code(),
            MigrateError::UnresolvedTable { .. } => "unresolved_table",
            MigrateError::UnresolvedColumn { .. } => "unresolved_column",
            MigrateError::RelationNotFound { .. } => "relation_not_found",
            MigrateError::UnsupportedViewType { .. } => "unsupported_view_type",
            MigrateError::ConfigError(_) => "config_error",
        }
    }
}

pub type MigrateResult<T> = Result<T, MigrateError>;
