use scout_core::{ErrorKind, StageError};
use thiserror::Error;

/// Motivo de rechazo de una URL.
///
/// Las variantes se dividen en dos familias:
/// - validación: URL mal formada o esquema/host ausente o no permitido;
/// - seguridad (SSRF): destino local, privado o fuera de la allow-list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("malformed url: {0}")]
    Malformed(String),

    #[error("url has no scheme")]
    MissingScheme,

    #[error("disallowed url scheme: {0}")]
    DisallowedScheme(String),

    #[error("url has no host")]
    NoHost,

    #[error("embedded credentials are not allowed")]
    EmbeddedCredentials,

    #[error("host '{0}' is not in the allow-list")]
    NotAllowListed(String),

    /// Literal de localhost o dominio `.local`/`.localhost`.
    #[error("blocked local host: {0}")]
    LocalHost(String),

    #[error("host '{host}' is a loopback address ({ip})")]
    Loopback { host: String, ip: String },

    #[error("host '{host}' resolves to blocked address {ip} in {cidr}")]
    BlockedCidr { host: String, ip: String, cidr: String },

    /// Sólo se produce con `fail_closed_on_dns_error`.
    #[error("dns resolution failed for '{host}': {reason}")]
    DnsResolution { host: String, reason: String },
}

impl GuardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GuardError::Malformed(_) | GuardError::MissingScheme | GuardError::DisallowedScheme(_) | GuardError::NoHost => {
                ErrorKind::Validation
            }
            _ => ErrorKind::SecurityRejection,
        }
    }

    pub fn is_security(&self) -> bool {
        self.kind() == ErrorKind::SecurityRejection
    }

    /// Convierte el rechazo en el fallo de etapa correspondiente.
    pub fn into_stage_error(self, url: &str) -> StageError {
        match self.kind() {
            ErrorKind::Validation => StageError::Validation { url: url.to_string(),
                                                              reason: self.to_string() },
            _ => StageError::SecurityRejection { url: url.to_string(),
                                                 reason: self.to_string() },
        }
    }
}

pub type GuardResult<T> = Result<T, GuardError>;
