//! Configuración de `UrlGuard`.
//!
//! Los valores por defecto son los estrictos: sólo `https`, sin allow-list,
//! localhost y rangos privados bloqueados, resolución DNS fail-open.
use std::collections::HashSet;
use std::time::Duration;

use ipnet::IpNet;

/// Rangos bloqueados por defecto: loopback, RFC1918, link-local (incluye
/// metadata de cloud), "this network" y sus equivalentes IPv6.
pub const DEFAULT_BLOCKED_CIDRS: [&str; 9] = ["127.0.0.0/8",
                                              "10.0.0.0/8",
                                              "172.16.0.0/12",
                                              "192.168.0.0/16",
                                              "169.254.0.0/16",
                                              "0.0.0.0/8",
                                              "::1/128",
                                              "fc00::/7",
                                              "fe80::/10"];

pub const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct GuardConfig {
    /// Esquemas aceptados, en minúsculas.
    pub allowed_schemes: HashSet<String>,
    /// Si está presente, es lo único que decide qué hosts se aceptan (aparte
    /// del esquema).
    pub allowed_hosts: Option<HashSet<String>>,
    pub allow_localhost: bool,
    pub allow_private_ips: bool,
    pub blocked_cidrs: Vec<IpNet>,
    /// Rechaza la URL cuando el DNS falla en lugar de omitir los chequeos de IP.
    pub fail_closed_on_dns_error: bool,
    pub resolve_timeout: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self { allowed_schemes: HashSet::from(["https".to_string()]),
               allowed_hosts: None,
               allow_localhost: false,
               allow_private_ips: false,
               blocked_cidrs: DEFAULT_BLOCKED_CIDRS.iter().filter_map(|c| c.parse().ok()).collect(),
               fail_closed_on_dns_error: false,
               resolve_timeout: Duration::from_secs(DEFAULT_RESOLVE_TIMEOUT_SECS) }
    }
}

impl GuardConfig {
    pub fn with_schemes<I, S>(mut self, schemes: I) -> Self
        where I: IntoIterator<Item = S>,
              S: AsRef<str>
    {
        self.allowed_schemes = schemes.into_iter().map(|s| s.as_ref().trim().to_ascii_lowercase()).collect();
        self
    }

    /// Activa la allow-list. Las entradas se comparan en minúsculas y sin
    /// punto final.
    pub fn with_allowed_hosts<I, S>(mut self, hosts: I) -> Self
        where I: IntoIterator<Item = S>,
              S: AsRef<str>
    {
        self.allowed_hosts = Some(hosts.into_iter()
                                       .map(|h| h.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
                                       .collect());
        self
    }

    pub fn allow_localhost(mut self, allow: bool) -> Self {
        self.allow_localhost = allow;
        self
    }

    pub fn allow_private_ips(mut self, allow: bool) -> Self {
        self.allow_private_ips = allow;
        self
    }

    pub fn block_cidr(mut self, cidr: IpNet) -> Self {
        self.blocked_cidrs.push(cidr);
        self
    }

    pub fn fail_closed_on_dns_error(mut self, fail_closed: bool) -> Self {
        self.fail_closed_on_dns_error = fail_closed;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }
}
