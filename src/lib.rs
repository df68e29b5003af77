pub mod clients;
pub mod config;
pub mod converter;
pub mod error;
pub mod flowchart;
pub mod http;
pub mod prompts;
pub mod store;

use std::sync::Arc;

use anyhow::Context;

use crate::clients::GeminiClient;
use crate::config::Config;
use crate::converter::Converter;
use crate::flowchart::DotEngine;
use crate::store::InMemoryResultStore;

/// Wire the production collaborators described by `config`
pub fn build_converter(config: &Config) -> anyhow::Result<Converter> {
    let api_key = config
        .runtime
        .google_api_key
        .clone()
        .context("Missing GOOGLE_API_KEY in environment variables")?;
    let model = GeminiClient::new(api_key, &config.model)?;
    tracing::info!("Using Gemini model {}", model.model());

    let engine = DotEngine::new(config.flowchart.dot_command.clone());
    if engine.locate().is_none() {
        tracing::warn!(
            "Graphviz '{}' not found; flowcharts will use the fallback renderer",
            config.flowchart.dot_command
        );
    }

    let store = InMemoryResultStore::new(config.cache.max_entries, config.cache_ttl());
    Ok(Converter::new(
        Arc::new(model),
        Arc::new(engine),
        Arc::new(store),
    ))
}
