//! HTTP routes for the song server.
//!
//! `/` serves the single-page player, `/generate-midi` composes a fresh song
//! per request and `/health` reports what the server loaded at startup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use songgen::{write_song, GenerateError, Generator, MIDI_MIME_TYPE};
use tower_http::trace::TraceLayer;

/// File name offered to browsers that save the response directly.
pub const DOWNLOAD_NAME: &str = "generated_song.mid";

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<Generator>,
    /// Every generated song is also written here when set.
    pub output_file: Option<PathBuf>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(generator: Generator, output_file: Option<PathBuf>) -> Self {
        Self {
            generator: Arc::new(generator),
            output_file,
            start_time: Instant::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/generate-midi", get(generate_midi))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Compose a song on the blocking pool and return it as an attachment.
///
/// Failures of any kind become a 500 whose body is the error text.
#[tracing::instrument(skip(state), fields(model = state.generator.model_name()))]
async fn generate_midi(State(state): State<AppState>) -> Response {
    let generator = Arc::clone(&state.generator);
    let output_file = state.output_file.clone();

    let result = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, GenerateError> {
        let song = generator.generate(&mut rand::thread_rng())?;
        if let Some(path) = output_file.as_deref() {
            write_song(path, &song.midi.bytes)?;
            tracing::debug!(path = %path.display(), "song written");
        }
        Ok(song.midi.bytes)
    })
    .await;

    match result {
        Ok(Ok(bytes)) => {
            tracing::info!(bytes = bytes.len(), "serving generated song");
            (
                [
                    (header::CONTENT_TYPE, MIDI_MIME_TYPE.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", DOWNLOAD_NAME),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "generation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "generation task panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("generation task failed: {}", e),
            )
                .into_response()
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let corpus = state.generator.corpus();
    Json(serde_json::json!({
        "status": "healthy",
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.generator.model_name(),
        "corpus": {
            "tokens": corpus.len(),
            "pitch_vocab": corpus.pitch_vocab.len(),
            "dur_vocab": corpus.dur_vocab.len(),
        }
    }))
}

/// The player page. The script mirrors the trigger client: one request in
/// flight at a time, the previous object URL revoked before a new one is
/// published, and a single generic message on any failure.
const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>AI Song Generator</title>
  <script src="https://cdn.jsdelivr.net/combine/npm/tone@14.7.58,npm/@magenta/music@1.23.1/es6/core.js,npm/focus-visible@5,npm/html-midi-player@1.5.0"></script>
  <style>
    :root { --bg: #1a1a2e; --card: #16213e; --accent: #e94560; --text: #eee; --muted: #888; }
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body { font-family: system-ui, -apple-system, sans-serif; background: var(--bg); color: var(--text); padding: 2rem 1rem; min-height: 100vh; display: flex; justify-content: center; }
    .card { background: var(--card); border-radius: 8px; padding: 1.5rem; width: 100%; max-width: 560px; display: flex; flex-direction: column; gap: 1rem; }
    h1 { font-size: 1.5rem; }
    button { background: var(--accent); border: none; color: white; padding: 0.6rem 1rem; border-radius: 4px; cursor: pointer; font-size: 1rem; }
    button:disabled { opacity: 0.5; cursor: wait; }
    a.download { color: var(--accent); text-decoration: none; }
    a.download.disabled { pointer-events: none; color: var(--muted); }
    midi-player { width: 100%; }
    .status { font-size: 0.9rem; color: var(--muted); min-height: 1.2em; }
  </style>
</head>
<body>
  <div class="card">
    <h1>AI Song Generator</h1>
    <button id="generateBtn">Generate New Song</button>
    <midi-player id="myPlayer" sound-font></midi-player>
    <a id="downloadBtn" class="download disabled" href="#">Download MIDI</a>
    <div class="status" id="statusText">Press the button to compose a song.</div>
  </div>
  <script>
    const GENERATE_ENDPOINT = '/generate-midi';

    const generateBtn = document.getElementById('generateBtn');
    const downloadBtn = document.getElementById('downloadBtn');
    const player = document.getElementById('myPlayer');
    const statusText = document.getElementById('statusText');

    let state = 'idle';
    let currentUrl = null;
    let lastStamp = 0;

    function downloadName() {
      lastStamp = Math.max(Date.now(), lastStamp);
      return `ai-song-${lastStamp}.mid`;
    }

    generateBtn.addEventListener('click', async () => {
      if (state === 'generating') return;
      state = 'generating';

      generateBtn.disabled = true;
      generateBtn.innerText = 'Generating...';
      statusText.innerText = 'Consulting the AI model...';
      downloadBtn.classList.add('disabled');

      try {
        const response = await fetch(GENERATE_ENDPOINT);
        if (!response.ok) throw new Error(`status ${response.status}`);

        const blob = await response.blob();
        if (currentUrl) URL.revokeObjectURL(currentUrl);
        currentUrl = URL.createObjectURL(blob);

        player.src = currentUrl;
        downloadBtn.href = currentUrl;
        downloadBtn.download = downloadName();
        downloadBtn.classList.remove('disabled');

        statusText.innerText = 'Song generated successfully!';
        state = 'ready';
      } catch (error) {
        console.error(error);
        statusText.innerText = 'Error generating song.';
        state = 'failed';
      } finally {
        generateBtn.disabled = false;
        generateBtn.innerText = 'Generate New Song';
      }
    });
  </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use songgen::CorpusFile;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn write_corpus(dir: &TempDir, steps: usize) -> PathBuf {
        let pitches = ["C4", "E4", "G4", "E4.G4", "D4", "F4"];
        let durs = ["1.0", "0.5", "0.5", "2.0", "1/3", "1.0"];
        let file = CorpusFile {
            pitches: (0..steps).map(|i| pitches[i % 6].to_string()).collect(),
            durs: (0..steps).map(|i| durs[i % 6].to_string()).collect(),
        };
        let path = dir.path().join("processed_midi.json");
        std::fs::write(&path, serde_json::to_vec(&file).unwrap()).unwrap();
        path
    }

    fn setup_state(steps: usize, with_output: bool) -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = songconf::GenerationConfig {
            corpus_file: write_corpus(&temp_dir, steps),
            output_file: None,
            num_notes: 16,
            sequence_length: 8,
            ..Default::default()
        };
        let generator = Generator::from_config(&config).unwrap();
        let output = with_output.then(|| temp_dir.path().join("output/output.mid"));
        (AppState::new(generator, output), temp_dir)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_generate_midi_returns_attachment() {
        let (state, _temp_dir) = setup_state(120, false);
        let response = router(state).oneshot(get("/generate-midi")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("content-type").unwrap(), "audio/midi");
        assert_eq!(
            response.headers().get("content-disposition").unwrap(),
            "attachment; filename=\"generated_song.mid\""
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.starts_with(b"MThd"));
        assert!(midly::Smf::parse(&body).is_ok());
    }

    #[tokio::test]
    async fn test_generate_midi_writes_output_file() {
        let (state, temp_dir) = setup_state(120, true);
        let response = router(state).oneshot(get("/generate-midi")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let written = std::fs::read(temp_dir.path().join("output/output.mid")).unwrap();
        assert_eq!(&body[..], &written[..]);
    }

    #[tokio::test]
    async fn test_generation_failure_is_500_with_text() {
        // 8 tokens cannot seed a window of 8.
        let (state, _temp_dir) = setup_state(8, false);
        let response = router(state).oneshot(get("/generate-midi")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("corpus"), "unexpected body: {text}");
    }

    #[tokio::test]
    async fn test_index_page_wires_the_trigger() {
        let (state, _temp_dir) = setup_state(120, false);
        let response = router(state).oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("id=\"generateBtn\""));
        assert!(html.contains("'/generate-midi'"));
        assert!(html.contains("URL.revokeObjectURL"));
    }

    #[tokio::test]
    async fn test_health_reports_corpus() {
        let (state, _temp_dir) = setup_state(120, false);
        let response = router(state).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["model"], "markov");
        assert_eq!(json["corpus"]["tokens"], 120);
        assert_eq!(json["corpus"]["pitch_vocab"], 6);
    }
}
