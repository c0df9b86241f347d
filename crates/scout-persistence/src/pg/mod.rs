//! Implementación Postgres (Diesel) de `CheckpointStore`.
//!
//! - Log append-only: cada checkpoint es una fila `(run_id, seq)`; no hay
//!   updates ni deletes.
//! - `put` verifica la secuencia dentro de una transacción y además confía en
//!   la PK para detectar carreras entre escritores del mismo run.
//! - Diesel es síncrono: cada operación corre en `spawn_blocking` para no
//!   bloquear el runtime.
//! - Errores transitorios (pool, serialización) se reintentan con backoff.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, warn};
use serde_json::Value;

use scout_core::{Checkpoint, CheckpointError, CheckpointStore, RunId, StageId, WorkflowState};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::workflow_checkpoints;

/// Pool r2d2 de conexiones Postgres. Al construirlo se corren las migraciones
/// pendientes una sola vez.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Contrato: devuelve una conexión válida o `PersistenceError::TransientIo`.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

/// `ConnectionProvider` respaldado por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = workflow_checkpoints)]
struct NewCheckpointRow<'a> {
    run_id: &'a str,
    seq: i64,
    stage: &'a str,
    fingerprint: &'a str,
    state: &'a Value,
    created_at: DateTime<Utc>,
}

/// Fila de `workflow_checkpoints` (mismo orden de columnas que el esquema).
#[derive(Queryable, Debug)]
struct CheckpointRow {
    run_id: String,
    seq: i64,
    stage: String,
    fingerprint: String,
    state: Value,
    created_at: DateTime<Utc>,
}

impl CheckpointRow {
    fn into_checkpoint(self) -> Result<Checkpoint, PersistenceError> {
        let run_id = RunId::new(self.run_id).map_err(|e| PersistenceError::CorruptRow(e.to_string()))?;
        let sequence = u64::try_from(self.seq).map_err(|_| {
                                                  PersistenceError::CorruptRow(format!("negative seq {}", self.seq))
                                              })?;
        let state: WorkflowState = serde_json::from_value(self.state).map_err(|e| {
                                                                         PersistenceError::CorruptRow(format!("state run_id={run_id} seq={sequence}: {e}"))
                                                                     })?;
        Ok(Checkpoint { run_id,
                        sequence,
                        stage: StageId::new(self.stage),
                        fingerprint: self.fingerprint,
                        state,
                        created_at: self.created_at })
    }
}

enum PutOutcome {
    Inserted,
    Stale { latest: u64 },
}

/// Reintento con backoff corto (hasta 3 reintentos: 15ms, 30ms, 45ms).
///
/// Sólo repite la unidad de trabajo provista por `f`; cada intento abre su
/// propia transacción.
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if e.is_retryable() && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms",
                      attempts + 1,
                      e,
                      delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// `CheckpointStore` durable sobre Postgres.
pub struct PgCheckpointStore<P: ConnectionProvider> {
    provider: Arc<P>,
}

impl PgCheckpointStore<PoolProvider> {
    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(PoolProvider { pool })
    }
}

impl<P: ConnectionProvider> PgCheckpointStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider: Arc::new(provider) }
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T, CheckpointError>
        where F: FnOnce(&P) -> Result<T, CheckpointError> + Send + 'static,
              T: Send + 'static
    {
        let provider = Arc::clone(&self.provider);
        tokio::task::spawn_blocking(move || f(&provider)).await
                                                         .map_err(|e| CheckpointError::Backend(format!("blocking task: {e}")))?
    }
}

fn insert_checkpoint<P: ConnectionProvider>(provider: &P, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
    let run_id = checkpoint.run_id.as_str();
    let seq = i64::try_from(checkpoint.sequence).map_err(|_| {
                                                    CheckpointError::Backend(format!("sequence {} out of range",
                                                                                     checkpoint.sequence))
                                                })?;
    let state = serde_json::to_value(&checkpoint.state).map_err(|e| CheckpointError::Serialization(e.to_string()))?;
    let row = NewCheckpointRow { run_id,
                                 seq,
                                 stage: checkpoint.stage.as_str(),
                                 fingerprint: &checkpoint.fingerprint,
                                 state: &state,
                                 created_at: checkpoint.created_at };

    let conflict = |latest: u64| CheckpointError::SequenceConflict { run_id: run_id.to_string(),
                                                                     attempted: checkpoint.sequence,
                                                                     latest };

    let outcome = with_retry(|| {
        let mut conn = provider.connection()?;
        conn.build_transaction()
            .read_write()
            .run(|tx| {
                let latest: Option<i64> = workflow_checkpoints::table.filter(workflow_checkpoints::run_id.eq(run_id))
                                                                     .select(max(workflow_checkpoints::seq))
                                                                     .first(tx)?;
                let latest = latest.unwrap_or(0);
                if seq <= latest {
                    return Ok(PutOutcome::Stale { latest: latest as u64 });
                }
                diesel::insert_into(workflow_checkpoints::table).values(&row).execute(tx)?;
                Ok::<PutOutcome, diesel::result::Error>(PutOutcome::Inserted)
            })
            .map_err(PersistenceError::from)
    });

    match outcome {
        Ok(PutOutcome::Inserted) => Ok(()),
        Ok(PutOutcome::Stale { latest }) => Err(conflict(latest)),
        // Otro escritor confirmó la misma secuencia entre el SELECT y el INSERT.
        Err(PersistenceError::UniqueViolation(_)) => Err(conflict(checkpoint.sequence)),
        Err(other) => Err(other.into()),
    }
}

#[async_trait]
impl<P: ConnectionProvider> CheckpointStore for PgCheckpointStore<P> {
    async fn put(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        debug!("pg put:start run_id={} seq={} stage={}",
               checkpoint.run_id,
               checkpoint.sequence,
               checkpoint.stage);
        self.blocking(move |provider| insert_checkpoint(provider, &checkpoint)).await
    }

    async fn get_latest(&self, run_id: &RunId) -> Result<Option<Checkpoint>, CheckpointError> {
        let key = run_id.as_str().to_string();
        self.blocking(move |provider| {
                let row: Option<CheckpointRow> = with_retry(|| {
                    let mut conn = provider.connection()?;
                    workflow_checkpoints::table.filter(workflow_checkpoints::run_id.eq(&key))
                                               .order(workflow_checkpoints::seq.desc())
                                               .first(&mut conn)
                                               .optional()
                                               .map_err(PersistenceError::from)
                })?;
                Ok(row.map(CheckpointRow::into_checkpoint).transpose()?)
            })
            .await
    }

    async fn history(&self, run_id: &RunId) -> Result<Vec<Checkpoint>, CheckpointError> {
        let key = run_id.as_str().to_string();
        self.blocking(move |provider| {
                let rows: Vec<CheckpointRow> = with_retry(|| {
                    let mut conn = provider.connection()?;
                    workflow_checkpoints::table.filter(workflow_checkpoints::run_id.eq(&key))
                                               .order(workflow_checkpoints::seq.asc())
                                               .load(&mut conn)
                                               .map_err(PersistenceError::from)
                })?;
                debug!("pg history run_id={key} count={}", rows.len());
                Ok(rows.into_iter()
                       .map(CheckpointRow::into_checkpoint)
                       .collect::<Result<Vec<_>, _>>()?)
            })
            .await
    }
}

/// Construye el pool y corre migraciones pendientes.
///
/// - Tamaños en cero se elevan a 1; si `min_size > max_size` se usa
///   `min = max`.
/// - Devuelve `PersistenceError::TransientIo` ante errores del pool.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({} > {}), ajustando min=max",
              validated_min, validated_max);
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Carga `.env`, lee `DbConfig` y construye un pool ya migrado.
pub fn build_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
