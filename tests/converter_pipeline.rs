//! End-to-end behaviour of the conversion pipeline with stubbed collaborators

mod common;

use std::sync::Arc;

use cobol_lens::error::CobolLensError;
use cobol_lens::flowchart::fallback::{self, NO_STRUCTURE_NOTE};
use cobol_lens::flowchart::StructureFlags;
use cobol_lens::prompts::{EXPLANATION_UNAVAILABLE, PSEUDOCODE_UNAVAILABLE};
use common::{EngineBehavior, SAMPLE_PROGRAM, StubEngine, StubModel, converter};

#[tokio::test]
async fn empty_content_is_rejected_before_any_external_call() {
    let model = Arc::new(StubModel::default());
    let engine = Arc::new(StubEngine::svg());
    let conv = converter(model.clone(), engine.clone());

    for blank in ["", "   ", "\n\t \r\n"] {
        let err = conv.convert(blank).await.unwrap_err();
        assert!(matches!(err, CobolLensError::Validation { .. }));
        assert_eq!(err.to_string(), "Validation error: Empty file content");
    }
    assert_eq!(model.calls(), 0);
    assert!(engine.seen_dot().is_none());
    assert!(conv.store().is_empty().await);
}

#[tokio::test]
async fn successful_conversion_stores_all_three_outputs() {
    let model = Arc::new(StubModel::default());
    let conv = converter(model.clone(), Arc::new(StubEngine::svg()));

    let id = conv.convert(SAMPLE_PROGRAM).await.unwrap();
    let stored = conv.store().get(&id).await.unwrap().unwrap();

    assert_eq!(stored.pseudocode, "1. IDENTIFICATION:\n   Program: HELLO");
    // emphasis markers stripped and whitespace trimmed
    assert_eq!(stored.explanation, "The HELLO program counts to ten.");
    assert!(stored.flowchart.starts_with("<svg"));
    assert_eq!(model.calls(), 2);

    let prompts = model.prompts.lock().unwrap().clone();
    assert!(prompts.iter().all(|p| p.ends_with(SAMPLE_PROGRAM)));
}

#[tokio::test]
async fn model_failures_degrade_to_placeholders() {
    let conv = converter(Arc::new(StubModel::failing()), Arc::new(StubEngine::svg()));
    let id = conv.convert(SAMPLE_PROGRAM).await.unwrap();
    let stored = conv.store().get(&id).await.unwrap().unwrap();

    assert_eq!(stored.pseudocode, PSEUDOCODE_UNAVAILABLE);
    assert_eq!(stored.explanation, EXPLANATION_UNAVAILABLE);
    assert!(stored.flowchart.starts_with("<svg"));
}

#[tokio::test]
async fn missing_engine_falls_back_to_fixed_layout_svg() {
    let conv = converter(
        Arc::new(StubModel::default()),
        Arc::new(StubEngine::new(EngineBehavior::Missing)),
    );
    let id = conv.convert(SAMPLE_PROGRAM).await.unwrap();
    let stored = conv.store().get(&id).await.unwrap().unwrap();

    let expected = fallback::render(StructureFlags::new(true, true, true)).unwrap();
    assert_eq!(stored.flowchart, expected);
    assert!(!stored.flowchart.starts_with("Error:"));
}

#[tokio::test]
async fn engine_error_is_replaced_by_fallback() {
    let conv = converter(
        Arc::new(StubModel::default()),
        Arc::new(StubEngine::new(EngineBehavior::Fails("segfault".into()))),
    );
    let id = conv.convert("       DISPLAY 'HI'.\n").await.unwrap();
    let stored = conv.store().get(&id).await.unwrap().unwrap();

    assert!(stored.flowchart.starts_with("<svg"));
    assert_eq!(stored.flowchart.matches(NO_STRUCTURE_NOTE).count(), 1);
}

#[tokio::test]
async fn invalid_engine_output_is_replaced_by_fallback() {
    let conv = converter(
        Arc::new(StubModel::default()),
        Arc::new(StubEngine::new(EngineBehavior::Emits("garbage".into()))),
    );
    let id = conv.convert(SAMPLE_PROGRAM).await.unwrap();
    let stored = conv.store().get(&id).await.unwrap().unwrap();
    assert!(stored.flowchart.starts_with("<svg width=\"800\""));
}

#[tokio::test]
async fn each_conversion_gets_a_fresh_id() {
    let conv = converter(Arc::new(StubModel::default()), Arc::new(StubEngine::svg()));
    let a = conv.convert(SAMPLE_PROGRAM).await.unwrap();
    let b = conv.convert(SAMPLE_PROGRAM).await.unwrap();
    assert_ne!(a, b);
    assert_eq!(conv.store().len().await, 2);
}
