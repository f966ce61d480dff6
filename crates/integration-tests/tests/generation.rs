mod harness;

use harness::app::TestApp;
use harness::config::ConfigBuilder;
use harness::mock_crypto_pay::MockCryptoPay;
use harness::mock_gemini::MockGemini;
use pixelmint_imagegen::{GenerationRequest, Orientation, PhotosessionRequest, PromptRequest};
use pixelmint_studio::{GenerationKind, GenerationStatus, StudioError};

struct Setup {
    app: TestApp,
    gemini: MockGemini,
    dir: tempfile::TempDir,
}

async fn setup(fallback: Option<&str>) -> Setup {
    let gemini = MockGemini::start().await;
    let crypto_pay = MockCryptoPay::start().await;
    let dir = tempfile::tempdir().unwrap();

    let mut builder = ConfigBuilder::new(&crypto_pay.uri(), &gemini.uri(), &dir.path().join("out"));
    if let Some(model) = fallback {
        builder = builder.with_fallback_model(model);
    }

    Setup {
        app: TestApp::new(builder.build()),
        gemini,
        dir,
    }
}

fn prompt(text: &str) -> GenerationRequest {
    GenerationRequest::Prompt(PromptRequest {
        prompt: text.to_owned(),
        template: None,
        references: Vec::new(),
    })
}

#[tokio::test]
async fn prompt_generation_is_charged_and_saved() {
    let s = setup(None).await;
    s.gemini.serve_image("model-a").await;
    s.app.user(1, 10).await;

    let output = s.app.studio.run_generation(1, 5, prompt("a lighthouse")).await.unwrap();

    assert_eq!(output.balance, 5);
    assert_eq!(std::fs::read(&output.location).unwrap(), b"png!");
    assert!(output.location.starts_with(&s.dir.path().join("out").display().to_string()));

    let history = s.app.studio.history(1, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, GenerationKind::Prompt);
    assert_eq!(history[0].status, GenerationStatus::Ready);
}

#[tokio::test]
async fn model_fallback_is_invisible_to_the_caller() {
    let s = setup(Some("model-b")).await;
    s.gemini.reject_model("model-a").await;
    s.gemini.serve_image("model-b").await;
    s.app.user(1, 10).await;

    let output = s.app.studio.run_generation(1, 1, prompt("a lighthouse")).await.unwrap();

    assert_eq!(output.image.model, "model-b");
    assert_eq!(s.gemini.calls("model-a").await, 1);
    assert_eq!(s.gemini.calls("model-b").await, 1);
    assert_eq!(s.app.ledger.balance(1).await.unwrap(), 9);
}

#[tokio::test]
async fn empty_response_refunds_and_fails_record() {
    let s = setup(None).await;
    s.gemini.serve_text_only("model-a").await;
    s.app.user(1, 10).await;

    let err = s.app.studio.run_generation(1, 5, prompt("a lighthouse")).await.unwrap_err();

    assert!(matches!(err, StudioError::GenerationFailed { .. }));
    assert_eq!(s.app.ledger.balance(1).await.unwrap(), 10);
    assert_eq!(s.app.studio.history(1, 1).await.unwrap()[0].status, GenerationStatus::Failed);
}

#[tokio::test]
async fn exhausted_fallback_refunds() {
    let s = setup(Some("model-b")).await;
    s.gemini.reject_model("model-a").await;
    s.gemini.reject_model("model-b").await;
    s.app.user(1, 10).await;

    let err = s.app.studio.run_generation(1, 5, prompt("a lighthouse")).await.unwrap_err();

    assert!(matches!(err, StudioError::GenerationFailed { ref message } if message.contains("model-b")));
    assert_eq!(s.app.ledger.balance(1).await.unwrap(), 10);
}

#[tokio::test]
async fn insufficient_balance_never_reaches_upstream() {
    let s = setup(None).await;
    s.gemini.serve_image("model-a").await;
    s.app.user(1, 3).await;

    let err = s.app.studio.run_generation(1, 5, prompt("a lighthouse")).await.unwrap_err();

    assert!(matches!(
        err,
        StudioError::InsufficientBalance {
            required: 5,
            available: 3
        }
    ));
    assert_eq!(s.app.ledger.balance(1).await.unwrap(), 3);
    assert_eq!(s.gemini.calls("model-a").await, 0);
}

#[tokio::test]
async fn photosession_is_recorded_with_style() {
    let s = setup(None).await;
    s.gemini.serve_image("model-a").await;
    s.app.user(1, 10).await;

    let request = GenerationRequest::Photosession(PhotosessionRequest {
        style: "film noir".to_owned(),
        prompt: None,
        orientation: Orientation::Vertical,
        references: vec![s.dir.path().join("missing-face.jpg")],
    });

    let cost = s.app.config.ledger.cost_per_session;
    let output = s.app.studio.run_generation(1, cost, request).await.unwrap();

    assert_eq!(output.balance, 10 - cost);
    let record = s.app.studio.history(1, 1).await.unwrap().remove(0);
    assert_eq!(record.kind, GenerationKind::Photosession);
    assert_eq!(record.template.as_deref(), Some("film noir"));
}
