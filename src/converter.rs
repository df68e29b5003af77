//! Conversion pipeline: model calls, flowchart rendering and storage.

use std::sync::Arc;

use uuid::Uuid;

use crate::clients::LanguageModel;
use crate::error::{CobolLensError, Result};
use crate::flowchart::{self, GraphvizRenderer, LayoutEngine, StructureFlags};
use crate::prompts;
use crate::store::{ConversionResult, ResultStore};

/// Runs one upload through every generation step and stores the outcome.
///
/// Each step degrades on its own: a failed model call stores a placeholder
/// and a failed Graphviz render falls back to the fixed-layout SVG. Only
/// empty input and store failures abort a conversion.
#[derive(Clone)]
pub struct Converter {
    model: Arc<dyn LanguageModel>,
    renderer: GraphvizRenderer,
    store: Arc<dyn ResultStore>,
}

impl Converter {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        engine: Arc<dyn LayoutEngine>,
        store: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            model,
            renderer: GraphvizRenderer::new(engine),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Convert `source` and return the id it was stored under
    pub async fn convert(&self, source: &str) -> Result<Uuid> {
        if source.trim().is_empty() {
            return Err(CobolLensError::validation("Empty file content"));
        }

        let pseudocode = self.pseudocode(source).await;
        let explanation = self.explanation(source).await;
        let flowchart = self.flowchart(StructureFlags::detect(source)).await;

        let id = Uuid::new_v4();
        self.store
            .insert(
                id,
                ConversionResult {
                    pseudocode,
                    explanation,
                    flowchart,
                },
            )
            .await?;
        tracing::info!("Stored conversion {}", id);
        Ok(id)
    }

    async fn pseudocode(&self, source: &str) -> String {
        match self.model.generate(&prompts::pseudocode_prompt(source)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Pseudocode generation failed: {}", e);
                prompts::PSEUDOCODE_UNAVAILABLE.to_string()
            }
        }
    }

    async fn explanation(&self, source: &str) -> String {
        match self.model.generate(&prompts::explanation_prompt(source)).await {
            Ok(text) => prompts::strip_emphasis(&text),
            Err(e) => {
                tracing::error!("Explanation generation failed: {}", e);
                prompts::EXPLANATION_UNAVAILABLE.to_string()
            }
        }
    }

    async fn flowchart(&self, flags: StructureFlags) -> String {
        tracing::debug!(?flags, "Detected COBOL structure");
        match self.renderer.render(flags).await {
            Ok(svg) => svg,
            Err(e) => {
                tracing::warn!("Graphviz flowchart generation failed, trying fallback SVG method");
                match flowchart::fallback::render(flags) {
                    Some(svg) if !svg.is_empty() => {
                        tracing::info!("Successfully generated fallback SVG flowchart");
                        svg
                    }
                    _ => e.to_stored_text(),
                }
            }
        }
    }
}
