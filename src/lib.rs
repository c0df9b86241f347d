//! scoutflow: runner de inteligencia competitiva sobre el motor durable.
//!
//! - `config`: parámetros del job y políticas desde el entorno.
//! - `runner`: arma el pipeline, elige el store y produce el `JobReport`.
//! - `demo`: colaboradores deterministas sin red.
//! - `errors`: errores del entrypoint.

pub mod config;
pub mod demo;
pub mod errors;
pub mod runner;

pub use config::{parse_target_urls, AppConfig, JobParams};
pub use errors::AppError;
pub use runner::{open_store, run_job, JobReport};
