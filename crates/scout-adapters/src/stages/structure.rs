//! `structure_analyze`: extracción local y determinista de señales de
//! estructura (título, precios, CTAs, navegación) sobre el texto saneado.
//!
//! Es CPU-bound: corre en un worker bloqueante y reparte las páginas con
//! rayon.
use async_trait::async_trait;
use log::info;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use scout_core::{Stage, StageContext, StageError, StageId, StateSlot, StructureSummary, WorkflowState};

use crate::pipeline::STRUCTURE_ANALYZE;

const CTA_MARKERS: [&str; 6] = ["<button", "sign up", "get started", "try now", "contact", "book a demo"];
const NAV_MARKERS: [&str; 3] = ["<nav", "<header", "role=\"navigation\""];
const MAX_PRICE_POINTS: usize = 20;

static TITLE_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok());
static PRICE_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"[$€£]\s?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{1,2})?").ok());

#[derive(Debug, Default, Clone, Copy)]
pub struct StructureStage;

impl StructureStage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for StructureStage {
    fn id(&self) -> StageId {
        StageId::new(STRUCTURE_ANALYZE)
    }

    fn writes(&self) -> StateSlot {
        StateSlot::Structures
    }

    async fn run(&self, mut state: WorkflowState, ctx: &StageContext) -> Result<WorkflowState, StageError> {
        let pages: Vec<(String, String)> = state.fetched()
                                                .iter()
                                                .map(|(url, artifact)| (url.clone(), artifact.text.clone()))
                                                .collect();
        let summaries = tokio::task::spawn_blocking(move || {
                            pages.par_iter()
                                 .map(|(url, text)| (url.clone(), extract_structure(text)))
                                 .collect::<Vec<_>>()
                        }).await
                          .map_err(|e| StageError::internal(format!("structure extraction panicked: {e}")))?;

        for (url, summary) in summaries {
            state.record_structure(&url, summary)?;
        }
        info!("structure analysis done run_id={} pages={}", ctx.run_id, state.structures().len());
        Ok(state)
    }
}

/// Extrae señales de estructura de una página.
pub fn extract_structure(text: &str) -> StructureSummary {
    let lower = text.to_lowercase();
    let price_points = price_points(text);
    StructureSummary { title: title(text),
                       has_pricing: lower.contains("pricing") || !price_points.is_empty() || text.contains('$'),
                       has_cta: CTA_MARKERS.iter().any(|m| lower.contains(m)),
                       has_navigation: NAV_MARKERS.iter().any(|m| lower.contains(m)),
                       content_bytes: text.len(),
                       price_points }
}

fn title(text: &str) -> Option<String> {
    let re = TITLE_RE.as_ref()?;
    let raw = re.captures(text)?.get(1)?.as_str();
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Precios distintos en orden de aparición.
fn price_points(text: &str) -> Vec<String> {
    let Some(re) = PRICE_RE.as_ref() else {
        return Vec::new();
    };
    let mut found: Vec<String> = Vec::new();
    for m in re.find_iter(text) {
        let price = m.as_str().replace(char::is_whitespace, "");
        if !found.contains(&price) {
            found.push(price);
        }
        if found.len() == MAX_PRICE_POINTS {
            break;
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>
        Acme   Pricing
    </title></head><body><header><nav>Home</nav></header>
    <h1>Plans</h1><p>Starter $19/mo, Pro $49.99/mo, Team $19/mo, Enterprise €1,200</p>
    <button>Get started</button></body></html>"#;

    #[test]
    fn extracts_signals() {
        let s = extract_structure(PAGE);
        assert_eq!(s.title.as_deref(), Some("Acme Pricing"));
        assert!(s.has_pricing && s.has_cta && s.has_navigation);
        assert_eq!(s.price_points, vec!["$19", "$49.99", "€1,200"]);
        assert_eq!(s.content_bytes, PAGE.len());
    }

    #[test]
    fn bare_text_has_no_signals() {
        let s = extract_structure("just some words about nothing");
        assert_eq!(s.title, None);
        assert!(!s.has_pricing && !s.has_cta && !s.has_navigation);
        assert!(s.price_points.is_empty());
    }

    #[test]
    fn empty_title_is_none() {
        assert_eq!(extract_structure("<title>   </title>").title, None);
    }
}
