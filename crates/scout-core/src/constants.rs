//! Constantes del motor core.
//!
//! `ENGINE_VERSION` forma parte del fingerprint de cada checkpoint: un cambio
//! de versión incompatible invalida la verificación de snapshots antiguos.

/// Versión lógica del motor. Mantener estable mientras el formato de
/// `WorkflowState` no cambie de forma incompatible.
pub const ENGINE_VERSION: &str = "S1.0";

/// Timeout por defecto de cada llamada a un colaborador externo (segundos).
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// Nombre lógico del almacén de checkpoints en errores de colaborador.
pub const CHECKPOINT_STORE_TARGET: &str = "checkpoint_store";
