//! The trigger against a mock generation endpoint over real HTTP.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use songtrigger::{
    parse_stamp, GenerationErrorKind, GenerationTrigger, HttpEndpoint, RecordingSurface,
    TriggerOutcome, UiState,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn trigger_for(server: &MockServer) -> (Arc<GenerationTrigger>, Arc<RecordingSurface>) {
    let config = songconf::ClientConfig {
        base_url: server.uri(),
        ..Default::default()
    };
    let surface = Arc::new(RecordingSurface::new());
    let trigger = GenerationTrigger::from_config(&config, surface.clone());
    (Arc::new(trigger), surface)
}

fn midi_response(body: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "audio/midi")
        .set_body_bytes(body.to_vec())
}

#[tokio::test]
async fn ten_byte_payload_is_what_the_download_resolves_to() {
    let server = MockServer::start().await;
    let payload: &[u8] = b"0123456789";
    Mock::given(method("GET"))
        .and(path("/generate-midi"))
        .respond_with(midi_response(payload))
        .expect(1)
        .mount(&server)
        .await;

    let (trigger, surface) = trigger_for(&server);
    let TriggerOutcome::Ready(handle) = trigger.activate().await else {
        panic!("generation should succeed");
    };

    let snapshot = surface.snapshot();
    let href = snapshot.download_href.unwrap();
    let player = snapshot.player_source.unwrap();
    assert_eq!(href, handle.url());
    assert_eq!(player, handle.url());

    let registry = trigger.registry();
    assert_eq!(registry.resolve_url(&href).as_deref(), Some(payload));
    assert_eq!(registry.resolve_url(&player).as_deref(), Some(payload));
    assert_eq!(handle.size(), 10);
    assert_eq!(handle.mime_type(), "audio/midi");
}

#[tokio::test]
async fn server_error_shows_failure_and_restores_label() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/generate-midi"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let (trigger, surface) = trigger_for(&server);
    let err = match trigger.activate().await {
        TriggerOutcome::Failed(err) => err,
        other => panic!("expected failure, got {:?}", other),
    };
    assert_eq!(err.kind, GenerationErrorKind::Status(500));

    let snapshot = surface.snapshot();
    assert_eq!(snapshot.status, "Error generating song.");
    assert_eq!(snapshot.trigger_label, "Generate New Song");
    assert!(snapshot.trigger_enabled);
    assert_eq!(snapshot.download_href, None);
    assert_eq!(trigger.registry().live_count(), 0);
    assert_eq!(trigger.state(), UiState::Failed);
}

#[tokio::test]
async fn rapid_double_trigger_sends_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/generate-midi"))
        .respond_with(midi_response(b"slow song").set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let (trigger, surface) = trigger_for(&server);
    let first = tokio::spawn({
        let trigger = trigger.clone();
        async move { trigger.activate().await }
    });

    while trigger.state() != UiState::Generating {
        tokio::task::yield_now().await;
    }
    assert!(!surface.snapshot().trigger_enabled);
    assert_eq!(surface.snapshot().trigger_label, "Generating...");
    assert_eq!(surface.snapshot().status, "Consulting the AI model...");

    assert_eq!(trigger.activate().await, TriggerOutcome::Ignored);

    assert!(matches!(first.await.unwrap(), TriggerOutcome::Ready(_)));
    assert!(surface.snapshot().trigger_enabled);
    // MockServer verifies `expect(1)` on drop.
}

#[tokio::test]
async fn successive_downloads_have_non_decreasing_stamps() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/generate-midi"))
        .respond_with(midi_response(b"MThd"))
        .expect(3)
        .mount(&server)
        .await;

    let (trigger, surface) = trigger_for(&server);
    let mut stamps = Vec::new();
    for _ in 0..3 {
        assert!(matches!(trigger.activate().await, TriggerOutcome::Ready(_)));
        let name = surface.snapshot().download_name.unwrap();
        assert!(name.starts_with("ai-song-") && name.ends_with(".mid"));
        stamps.push(parse_stamp(&name).unwrap());
    }
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    // Only the latest song stays addressable.
    assert_eq!(trigger.registry().live_count(), 1);
}

#[tokio::test]
async fn custom_endpoint_path_is_honored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/generate-midi"))
        .respond_with(midi_response(b"v2"))
        .expect(1)
        .mount(&server)
        .await;

    let surface = Arc::new(RecordingSurface::new());
    let endpoint = Arc::new(HttpEndpoint::new(format!(
        "{}/api/v2/generate-midi",
        server.uri()
    )));
    let trigger = GenerationTrigger::new(endpoint, surface.clone());

    let TriggerOutcome::Ready(handle) = trigger.activate().await else {
        panic!("generation should succeed");
    };
    assert_eq!(trigger.resolve(&handle).as_deref(), Some(&b"v2"[..]));
}
