//! Configuración de conexión desde variables de entorno.
//! Usa la convención `DATABASE_URL` con tamaños de pool opcionales.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::error::PersistenceError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const DEFAULT_MIN_CONNECTIONS: u32 = 2;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, PersistenceError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables inyectable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PersistenceError>
        where F: Fn(&str) -> Option<String>
    {
        let url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty())
                                        .ok_or_else(|| PersistenceError::Config("DATABASE_URL no definido".into()))?;
        let min_connections = parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", DEFAULT_MIN_CONNECTIONS);
        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        Ok(Self { url,
                  min_connections,
                  max_connections })
    }
}

fn parse_or<F>(lookup: &F, key: &str, default: u32) -> u32
    where F: Fn(&str) -> Option<String>
{
    lookup(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Forzar carga temprana de .env desde aplicaciones externas.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
