pub mod config;
pub mod database;
pub mod error;
pub mod metrics;
pub mod migrate;
pub mod models;
pub mod routing;
pub mod services;
pub mod store;
pub mod sync;

pub use config::AppConfig;
pub use database::Database;
pub use error::{DbError, DbResult};
pub use models::{EntityModel, Record};
pub use routing::Router;
pub use store::StoreKey;
pub use sync::{SyncEngine, SyncReport, SyncTrigger};
