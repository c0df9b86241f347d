use once_cell::sync::Lazy;
use scout_core::RunId;
use scout_persistence::config::DbConfig;
use scout_persistence::pg::{build_pool, PgPool};

pub static TEST_POOL: Lazy<Option<PgPool>> = Lazy::new(|| {
    let cfg = DbConfig::from_env().ok()?;
    match build_pool(&cfg.url, 1, 2) {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("No se pudo construir pool de test: {e}");
            None
        }
    }
});

pub fn pool() -> Option<PgPool> {
    TEST_POOL.as_ref().cloned()
}

/// RunId único por test para no chocar con ejecuciones previas.
pub fn fresh_run_id(prefix: &str) -> RunId {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    RunId::new(format!("{prefix}-{nanos}")).unwrap()
}
