//! Deterministic stand-ins for the language model and layout engine.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use cobol_lens::clients::{LanguageModel, LlmError};
use cobol_lens::converter::Converter;
use cobol_lens::flowchart::{LayoutEngine, RenderError};
use cobol_lens::store::InMemoryResultStore;

pub const SAMPLE_PROGRAM: &str = "       IDENTIFICATION DIVISION.
       PROGRAM-ID. HELLO.
       DATA DIVISION.
       WORKING-STORAGE SECTION.
       01 WS-COUNT PIC 9(3) VALUE 0.
       PROCEDURE DIVISION.
           PERFORM UNTIL WS-COUNT > 10
               ADD 1 TO WS-COUNT
           END-PERFORM.
           STOP RUN.
";

/// Answers pseudocode and explanation prompts with canned text
#[derive(Default)]
pub struct StubModel {
    pub fail: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl StubModel {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(LlmError::Api {
                status: 503,
                body: "unavailable".into(),
            });
        }
        if prompt.starts_with("Convert this COBOL code") {
            Ok("1. IDENTIFICATION:\n   Program: HELLO".to_string())
        } else {
            Ok("The **HELLO** program *counts* to ten.\n".to_string())
        }
    }
}

pub enum EngineBehavior {
    Missing,
    Emits(String),
    Fails(String),
}

/// Layout engine that records the DOT it receives
pub struct StubEngine {
    pub behavior: EngineBehavior,
    pub dot: Mutex<Option<String>>,
}

impl StubEngine {
    pub fn new(behavior: EngineBehavior) -> Self {
        Self {
            behavior,
            dot: Mutex::new(None),
        }
    }

    pub fn svg() -> Self {
        Self::new(EngineBehavior::Emits(
            "<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\"><g id=\"graph0\"/></svg>\n"
                .to_string(),
        ))
    }

    pub fn seen_dot(&self) -> Option<String> {
        self.dot.lock().unwrap().clone()
    }
}

#[async_trait]
impl LayoutEngine for StubEngine {
    fn name(&self) -> &str {
        "stub-dot"
    }

    fn is_available(&self) -> bool {
        !matches!(self.behavior, EngineBehavior::Missing)
    }

    async fn render_svg(&self, dot: &str) -> Result<String, RenderError> {
        *self.dot.lock().unwrap() = Some(dot.to_string());
        match &self.behavior {
            EngineBehavior::Missing => Err(RenderError::EngineUnavailable {
                command: "stub-dot".into(),
            }),
            EngineBehavior::Emits(out) => Ok(out.clone()),
            EngineBehavior::Fails(stderr) => Err(RenderError::EngineFailed(stderr.clone())),
        }
    }
}

pub fn converter(model: Arc<StubModel>, engine: Arc<StubEngine>) -> Converter {
    Converter::new(model, engine, Arc::new(InMemoryResultStore::new(16, None)))
}
