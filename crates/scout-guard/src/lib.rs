//! scout-guard: fronteras de seguridad sobre entrada externa no confiable.
//!
//! - `UrlGuard` valida toda URL saliente contra SSRF (esquemas, hosts
//!   locales, IPs resueltas en rangos bloqueados, allow-list opcional).
//! - `ContentSanitizer` redacta patrones de prompt injection y limita el
//!   tamaño del texto antes de que llegue a una llamada de modelo.
pub mod config;
pub mod error;
pub mod resolver;
pub mod sanitizer;
pub mod url_guard;

pub use config::{GuardConfig, DEFAULT_BLOCKED_CIDRS};
pub use error::{GuardError, GuardResult};
pub use resolver::{Resolver, StaticResolver, SystemResolver};
pub use sanitizer::{ContentSanitizer, Sanitized, MAX_CONTENT_BYTES, REDACTION_MARKER, TRUNCATION_MARKER};
pub use url_guard::{UrlGuard, ValidatedUrl};
