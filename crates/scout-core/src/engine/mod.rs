//! Motor de ejecución: plan, builder, configuración y ciclo de vida del run.

pub mod builder;
pub mod config;
pub mod core;
pub mod outcome;
pub mod plan;

pub use builder::{EngineBuilder, EngineBuilderInit};
pub use config::EngineConfig;
pub use self::core::WorkflowEngine;
pub use outcome::RunOutcome;
pub use plan::ExecutionPlan;
