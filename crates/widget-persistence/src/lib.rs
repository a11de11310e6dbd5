//! widget-persistence
//!
//! Backend Postgres (Diesel) del store de widgets: implementación de
//! `WidgetStore`, utilidades de conexión y migraciones embebidas.
//!
//! Módulos:
//! - `pg`: `PgWidgetStore` sobre las tablas `views` y `events`.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, store_from_pool, ConnectionProvider, PgPool, PgWidgetStore, PoolProvider};
