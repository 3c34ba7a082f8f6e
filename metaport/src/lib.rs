mod accounts;
mod ancillary;
mod computed;
mod context;
mod relations;
mod tables;
mod views;

pub mod cmd;
pub mod conf;
pub mod deferred;
pub mod errors;
pub mod formula;
pub mod index;
pub mod legacy;
pub mod migrator;
pub mod naming;
pub mod ops;
pub mod params;
pub mod report;
pub mod testing;

pub use computed::INVALID_FORMULA;
pub use conf::MigrateConf;
pub use context::MigrationCtx;
pub use deferred::{DeferredQueue, DeferredQueues, DrainMode, Phase};
pub use errors::{MigrateError, MigrateResult};
pub use formula::{AliasSubstitution, FormulaError, FormulaRewriter};
pub use index::ReferenceIndex;
pub use migrator::{Migrator, MigratorBuilder};
pub use report::MigrationReport;
pub use views::{ViewScope, is_visible, order_columns};
