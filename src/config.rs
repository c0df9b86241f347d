//! Configuración del job desde variables de entorno (.env incluido).
//!
//! - Parámetros del job: `JOB_ID`, `TARGET_URLS` (arreglo JSON).
//! - Guard: `SCOUT_ALLOWED_SCHEMES`, `SCOUT_ALLOWED_HOSTS`,
//!   `SCOUT_ALLOW_LOCALHOST`, `SCOUT_ALLOW_PRIVATE_IPS`.
//! - Motor: `SCOUT_CALL_TIMEOUT_SECS`, `SCOUT_TOLERATE_PARTIAL_FETCH`.
//! - Persistencia: `DATABASE_URL` (opcional; sin ella se usa el store en
//!   memoria) y tamaños del pool.
use std::env;
use std::time::Duration;

use scout_core::{EngineConfig, RunId};
use scout_guard::GuardConfig;
use scout_persistence::{init_dotenv, DbConfig};

use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct JobParams {
    pub run_id: RunId,
    pub targets: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub job: JobParams,
    pub guard: GuardConfig,
    pub engine: EngineConfig,
    pub database: Option<DbConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        init_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
        where F: Fn(&str) -> Option<String>
    {
        let job = job_from(&lookup)?;
        let guard = guard_from(&lookup)?;
        let engine = engine_from(&lookup)?;
        let database = match non_empty(&lookup, "DATABASE_URL") {
            Some(_) => Some(DbConfig::from_lookup(&lookup)?),
            None => None,
        };
        Ok(Self { job,
                  guard,
                  engine,
                  database })
    }
}

/// Decodifica `TARGET_URLS`: debe ser un arreglo JSON de strings.
pub fn parse_target_urls(raw: &str) -> Result<Vec<String>, AppError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| AppError::Config(format!("TARGET_URLS is not valid JSON: {e}")))?;
    let items = value.as_array()
                     .ok_or_else(|| AppError::Config("TARGET_URLS must be a JSON array".into()))?;
    items.iter()
         .map(|item| {
             item.as_str()
                 .map(str::to_string)
                 .ok_or_else(|| AppError::Config(format!("TARGET_URLS entries must be strings, got {item}")))
         })
         .collect()
}

fn job_from<F>(lookup: &F) -> Result<JobParams, AppError>
    where F: Fn(&str) -> Option<String>
{
    let job_id = non_empty(lookup, "JOB_ID").ok_or_else(|| AppError::Config("JOB_ID environment variable not set".into()))?;
    let run_id = RunId::new(job_id)?;
    let raw = non_empty(lookup, "TARGET_URLS").ok_or_else(|| {
                                                  AppError::Config("TARGET_URLS environment variable not set".into())
                                              })?;
    Ok(JobParams { run_id,
                   targets: parse_target_urls(&raw)? })
}

fn guard_from<F>(lookup: &F) -> Result<GuardConfig, AppError>
    where F: Fn(&str) -> Option<String>
{
    let mut guard = GuardConfig::default();
    if let Some(schemes) = non_empty(lookup, "SCOUT_ALLOWED_SCHEMES") {
        guard = guard.with_schemes(split_list(&schemes));
    }
    if let Some(hosts) = non_empty(lookup, "SCOUT_ALLOWED_HOSTS") {
        guard = guard.with_allowed_hosts(split_list(&hosts));
    }
    guard = guard.allow_localhost(parse_flag(lookup, "SCOUT_ALLOW_LOCALHOST")?)
                 .allow_private_ips(parse_flag(lookup, "SCOUT_ALLOW_PRIVATE_IPS")?);
    Ok(guard)
}

fn engine_from<F>(lookup: &F) -> Result<EngineConfig, AppError>
    where F: Fn(&str) -> Option<String>
{
    let mut engine = EngineConfig::default();
    if let Some(raw) = non_empty(lookup, "SCOUT_CALL_TIMEOUT_SECS") {
        let secs: u64 = raw.trim()
                           .parse()
                           .ok()
                           .filter(|s| *s > 0)
                           .ok_or_else(|| AppError::Config(format!("SCOUT_CALL_TIMEOUT_SECS must be a positive integer, got '{raw}'")))?;
        engine = engine.with_call_timeout(Duration::from_secs(secs));
    }
    Ok(engine.with_partial_tolerance(parse_flag(lookup, "SCOUT_TOLERATE_PARTIAL_FETCH")?))
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
    where F: Fn(&str) -> Option<String>
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn split_list(raw: &str) -> Vec<&str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}

fn parse_flag<F>(lookup: &F, key: &str) -> Result<bool, AppError>
    where F: Fn(&str) -> Option<String>
{
    match non_empty(lookup, key) {
        None => Ok(false),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Config(format!("{key} must be a boolean, got '{raw}'"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 2] = [("JOB_ID", "job-1"), ("TARGET_URLS", r#"["https://a.example/"]"#)];

    #[test]
    fn defaults_match_strict_policy() {
        let cfg = AppConfig::from_lookup(lookup_from(&BASE)).unwrap();
        assert_eq!(cfg.job.run_id.as_str(), "job-1");
        assert_eq!(cfg.job.targets, vec!["https://a.example/"]);
        assert_eq!(cfg.guard, GuardConfig::default());
        assert_eq!(cfg.engine, EngineConfig::default());
        assert!(cfg.database.is_none());
    }

    #[test]
    fn missing_job_id_is_config_error() {
        let err = AppConfig::from_lookup(lookup_from(&[("TARGET_URLS", "[]")])).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("JOB_ID")));
    }

    #[test]
    fn target_urls_must_be_array_of_strings() {
        assert!(parse_target_urls(r#"{"url":"x"}"#).is_err());
        assert!(parse_target_urls(r#"["https://a.example/", 3]"#).is_err());
        assert!(parse_target_urls("not json").is_err());
        assert_eq!(parse_target_urls("[]").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn guard_and_engine_overrides() {
        let mut pairs = BASE.to_vec();
        pairs.extend([("SCOUT_ALLOWED_SCHEMES", "https, http"),
                      ("SCOUT_ALLOWED_HOSTS", "Docs.Example.COM."),
                      ("SCOUT_ALLOW_LOCALHOST", "true"),
                      ("SCOUT_CALL_TIMEOUT_SECS", "5"),
                      ("SCOUT_TOLERATE_PARTIAL_FETCH", "1")]);
        let cfg = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(cfg.guard.allowed_schemes.contains("http"));
        assert!(cfg.guard.allowed_hosts.as_ref().unwrap().contains("docs.example.com"));
        assert!(cfg.guard.allow_localhost);
        assert!(!cfg.guard.allow_private_ips);
        assert_eq!(cfg.engine.call_timeout, Duration::from_secs(5));
        assert!(cfg.engine.tolerate_partial);
    }

    #[test]
    fn invalid_flag_and_timeout_are_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SCOUT_ALLOW_PRIVATE_IPS", "maybe"));
        assert!(AppConfig::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = BASE.to_vec();
        pairs.push(("SCOUT_CALL_TIMEOUT_SECS", "0"));
        assert!(AppConfig::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn database_url_enables_persistence() {
        let mut pairs = BASE.to_vec();
        pairs.push(("DATABASE_URL", "postgres://localhost/scout"));
        let cfg = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(cfg.database.unwrap().url, "postgres://localhost/scout");
    }
}
