//! Colaboradores deterministas sin red.
//!
//! El transporte real de navegador y el de modelos viven fuera de este
//! repositorio; el runner usa estas implementaciones para ejecutar el
//! pipeline completo de forma reproducible (smoke tests, desarrollo local).
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use scout_adapters::{CollaboratorError, FetchedPage, ModelClient, PageFetcher};
use url::Url;

/// Genera una página sintética por host con título, precios, CTA y
/// navegación.
#[derive(Debug, Default)]
pub struct SyntheticFetcher {
    calls: AtomicUsize,
}

impl SyntheticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for SyntheticFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let host = url.host_str().unwrap_or("unknown");
        let text = format!("<title>{host} | Product</title>\n\
                            <nav>Home | Features | Pricing | Docs</nav>\n\
                            <h1>{host}</h1>\n\
                            <p>Plans start at $29/mo for teams and $99/mo for business.</p>\n\
                            <a>Start free trial</a>");
        Ok(FetchedPage { text,
                         visual: url.as_str().as_bytes().to_vec() })
    }
}

/// Modelo eco: respuestas derivadas sólo de la entrada.
#[derive(Debug, Default)]
pub struct EchoModelClient {
    calls: AtomicUsize,
}

impl EchoModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for EchoModelClient {
    async fn analyze_visual(&self, image: &[u8], _prompt: &str) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("layout snapshot of {} bytes: hero section, pricing table, primary CTA above the fold",
                   image.len()))
    }

    async fn synthesize(&self, context: &str, _prompt: &str) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let targets = serde_json::from_str::<serde_json::Value>(context).ok()
                                                                        .and_then(|v| v.get("targets").cloned())
                                                                        .and_then(|t| t.as_array().map(Vec::len))
                                                                        .unwrap_or(0);
        Ok(format!("# Competitive Intelligence Brief\n\n\
                    ## Executive Summary\n\
                    Analyzed {targets} competitor page(s). Context size: {} bytes.\n",
                   context.len()))
    }
}
