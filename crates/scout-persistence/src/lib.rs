//! scout-persistence: backend Postgres (Diesel + r2d2) para el
//! `CheckpointStore` del core.
pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_pool, build_pool_from_env, ConnectionProvider, PgCheckpointStore, PgPool, PoolProvider};
