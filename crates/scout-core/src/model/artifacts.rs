//! Artifacts por URL producidos por las etapas.
use serde::{Deserialize, Serialize};

/// Resultado de `fetch_all` para una URL: texto ya saneado + captura binaria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchArtifact {
    /// Texto de la página tras pasar por el sanitizer (nunca el crudo).
    pub text: String,
    /// Artifact visual (p.ej. PNG de la captura).
    pub visual: Vec<u8>,
    /// Marcadores de redacción aplicados al texto.
    pub redactions: usize,
    /// El texto superó el techo de bytes y fue truncado.
    pub truncated: bool,
}

/// Extracción estructurada de una página.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureSummary {
    pub title: Option<String>,
    pub has_pricing: bool,
    pub has_cta: bool,
    pub has_navigation: bool,
    pub content_bytes: usize,
    pub price_points: Vec<String>,
}

/// Insight visual devuelto por el modelo de visión.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualInsight {
    pub insight: String,
    pub confidence: f32,
}
