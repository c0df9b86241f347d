//! `UrlGuard`: validación SSRF de cualquier URL antes de desreferenciarla.
//!
//! Orden de chequeos:
//! 1. parseo y esquema permitido;
//! 2. host presente y sin credenciales embebidas;
//! 3. allow-list (si existe decide sola);
//! 4. literales de localhost y dominios `.local`/`.localhost`;
//! 5. IP literal o, para dominios, todas las IPs resueltas contra loopback y
//!    los rangos bloqueados.
//!
//! Las formas ofuscadas de IPv4 (decimal, hex, octal) las normaliza el parser
//! de `url` a `Host::Ipv4`, de modo que pasan por el mismo chequeo de IP.
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use log::{debug, warn};
use url::{Host, Url};

use crate::config::GuardConfig;
use crate::error::{GuardError, GuardResult};
use crate::resolver::{Resolver, SystemResolver};

/// Nombres que siempre se consideran locales.
const LOCALHOST_NAMES: [&str; 5] = ["localhost", "localhost.localdomain", "127.0.0.1", "::1", "0.0.0.0"];
const LOCAL_SUFFIXES: [&str; 2] = [".local", ".localhost"];

/// URL aceptada junto con su hostname normalizado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    url: Url,
    host: String,
}

impl ValidatedUrl {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn into_url(self) -> Url {
        self.url
    }
}

#[derive(Debug, Clone)]
pub struct UrlGuard {
    config: GuardConfig,
    resolver: Arc<dyn Resolver>,
}

impl Default for UrlGuard {
    fn default() -> Self {
        Self::new(GuardConfig::default())
    }
}

impl UrlGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self::with_resolver(config, Arc::new(SystemResolver))
    }

    pub fn with_resolver(config: GuardConfig, resolver: Arc<dyn Resolver>) -> Self {
        Self { config, resolver }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Valida `raw`. Todo rechazo se registra en `warn` con la URL y el
    /// motivo.
    pub async fn validate(&self, raw: &str) -> GuardResult<ValidatedUrl> {
        match self.check(raw).await {
            Ok(validated) => {
                debug!("url accepted url={} host={}", raw, validated.host);
                Ok(validated)
            }
            Err(err) => {
                warn!("url rejected url={} kind={} reason={}", raw, err.kind().as_str(), err);
                Err(err)
            }
        }
    }

    async fn check(&self, raw: &str) -> GuardResult<ValidatedUrl> {
        let url = Url::parse(raw.trim()).map_err(|e| match e {
                                             url::ParseError::RelativeUrlWithoutBase => GuardError::MissingScheme,
                                             url::ParseError::EmptyHost => GuardError::NoHost,
                                             other => GuardError::Malformed(other.to_string()),
                                         })?;

        if !self.config.allowed_schemes.contains(url.scheme()) {
            return Err(GuardError::DisallowedScheme(url.scheme().to_string()));
        }

        let host = url.host().ok_or(GuardError::NoHost)?;
        let host_name = normalize_host(&host);
        if host_name.is_empty() {
            return Err(GuardError::NoHost);
        }

        if !url.username().is_empty() || url.password().is_some() {
            return Err(GuardError::EmbeddedCredentials);
        }

        if let Some(allowed) = &self.config.allowed_hosts {
            if allowed.contains(&host_name) {
                return Ok(ValidatedUrl { url, host: host_name });
            }
            return Err(GuardError::NotAllowListed(host_name));
        }

        if !self.config.allow_localhost && is_local_name(&host_name) {
            return Err(GuardError::LocalHost(host_name));
        }

        match host {
            Host::Ipv4(ip) => self.check_ip(&host_name, IpAddr::V4(ip))?,
            Host::Ipv6(ip) => self.check_ip(&host_name, IpAddr::V6(ip))?,
            Host::Domain(_) => self.check_resolved(&host_name, &url).await?,
        }

        Ok(ValidatedUrl { url, host: host_name })
    }

    async fn check_resolved(&self, host: &str, url: &Url) -> GuardResult<()> {
        let port = url.port_or_known_default().unwrap_or(443);
        let lookup = tokio::time::timeout(self.config.resolve_timeout, self.resolver.resolve(host, port)).await;
        let resolved = match lookup {
            Ok(Ok(ips)) if !ips.is_empty() => ips,
            Ok(Ok(_)) => return self.on_dns_failure(host, "no addresses returned".into()),
            Ok(Err(e)) => return self.on_dns_failure(host, e.to_string()),
            Err(_) => return self.on_dns_failure(host, "resolution timed out".into()),
        };
        // Todas las direcciones: un atacante controla el orden de la respuesta.
        for ip in resolved {
            self.check_ip(host, ip)?;
        }
        Ok(())
    }

    fn on_dns_failure(&self, host: &str, reason: String) -> GuardResult<()> {
        if self.config.fail_closed_on_dns_error {
            return Err(GuardError::DnsResolution { host: host.to_string(),
                                                   reason });
        }
        warn!("dns resolution failed host={} reason={}; skipping ip checks", host, reason);
        Ok(())
    }

    fn check_ip(&self, host: &str, ip: IpAddr) -> GuardResult<()> {
        let ip = canonical_ip(ip);
        if ip.is_loopback() || ip.is_unspecified() {
            if self.config.allow_localhost {
                return Ok(());
            }
            return Err(GuardError::Loopback { host: host.to_string(),
                                              ip: ip.to_string() });
        }
        if self.config.allow_private_ips {
            return Ok(());
        }
        match self.config.blocked_cidrs.iter().find(|net| net.contains(&ip)) {
            Some(net) => Err(GuardError::BlockedCidr { host: host.to_string(),
                                                       ip: ip.to_string(),
                                                       cidr: net.to_string() }),
            None => Ok(()),
        }
    }
}

/// Hostname en minúsculas, sin corchetes IPv6 ni punto final.
fn normalize_host(host: &Host<&str>) -> String {
    match host {
        Host::Domain(d) => d.trim_end_matches('.').to_ascii_lowercase(),
        Host::Ipv4(ip) => ip.to_string(),
        Host::Ipv6(ip) => ip.to_string(),
    }
}

fn is_local_name(host: &str) -> bool {
    LOCALHOST_NAMES.contains(&host) || LOCAL_SUFFIXES.iter().any(|suffix| host.ends_with(suffix))
}

/// Direcciones IPv6 que embeben una IPv4 se evalúan como esa IPv4:
/// mapeada (`::ffff:a.b.c.d`), compatible (`::a.b.c.d`) y NAT64
/// (`64:ff9b::/96`). `::` y `::1` quedan como IPv6.
fn canonical_ip(ip: IpAddr) -> IpAddr {
    let IpAddr::V6(v6) = ip else {
        return ip;
    };
    if v6.is_loopback() || v6.is_unspecified() {
        return ip;
    }
    if let Some(v4) = v6.to_ipv4_mapped() {
        return IpAddr::V4(v4);
    }
    let o = v6.octets();
    let embedded = Ipv4Addr::new(o[12], o[13], o[14], o[15]);
    match v6.segments() {
        [0, 0, 0, 0, 0, 0, _, _] | [0x64, 0xff9b, 0, 0, 0, 0, _, _] => IpAddr::V4(embedded),
        _ => ip,
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;
    use crate::resolver::StaticResolver;

    fn guard(config: GuardConfig) -> UrlGuard {
        let resolver = StaticResolver::new().with("a.example", [IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))])
                                            .with("rebind.example", [IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))]);
        UrlGuard::with_resolver(config, Arc::new(resolver))
    }

    #[tokio::test]
    async fn returns_normalised_host() {
        let ok = guard(GuardConfig::default()).validate("https://A.Example./pricing").await.expect("ok");
        assert_eq!(ok.host(), "a.example");
    }

    #[tokio::test]
    async fn relative_url_is_missing_scheme() {
        let err = guard(GuardConfig::default()).validate("a.example/path").await.unwrap_err();
        assert_eq!(err, GuardError::MissingScheme);
        assert!(!err.is_security());
    }

    #[test]
    fn mapped_ipv6_is_checked_as_ipv4() {
        let mapped = IpAddr::V6(Ipv4Addr::new(10, 1, 2, 3).to_ipv6_mapped());
        assert_eq!(canonical_ip(mapped), IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)));
        let plain = IpAddr::V6(Ipv6Addr::LOCALHOST);
        assert_eq!(canonical_ip(plain), plain);
    }

    #[test]
    fn local_suffixes() {
        assert!(is_local_name("printer.local"));
        assert!(is_local_name("api.localhost"));
        assert!(!is_local_name("localhost.example.com"));
    }
}
