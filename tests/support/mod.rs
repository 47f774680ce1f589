#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    io::Cursor,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};

/// Scripted reply for one request. Unscripted requests succeed.
#[derive(Clone, Copy, Debug)]
pub enum Reply {
    Ok,
    Status(u16),
    /// Sleep before answering 200, to trip client timeouts.
    Stall(Duration),
    /// Answer 200 with a body that is not JSON.
    Garbage,
}

#[derive(Clone, Debug)]
pub struct SynthesisRequest {
    pub speaker: Option<String>,
    pub content_type: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Default)]
struct MockState {
    wav: Vec<u8>,
    query_hits: AtomicUsize,
    synthesis_hits: AtomicUsize,
    query_script: Mutex<VecDeque<Reply>>,
    synthesis_script: Mutex<VecDeque<Reply>>,
    query_params: Mutex<Vec<HashMap<String, String>>>,
    synthesis_requests: Mutex<Vec<SynthesisRequest>>,
}

/// In-process stand-in for the VOICEVOX engine (`/audio_query`, `/synthesis`).
pub struct MockVoicevox {
    pub host: String,
    pub port: u16,
    state: Arc<MockState>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockVoicevox {
    pub fn start(wav: Vec<u8>) -> Self {
        let state = Arc::new(MockState {
            wav,
            ..MockState::default()
        });
        let app = Router::new()
            .route("/audio_query", post(audio_query))
            .route("/synthesis", post(synthesis))
            .with_state(state.clone());

        let (addr_tx, addr_rx) = std::sync::mpsc::channel();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                addr_tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        shutdown_rx.await.ok();
                    })
                    .await
                    .ok();
            });
        });

        let addr = addr_rx.recv().unwrap();
        Self {
            host: addr.ip().to_string(),
            port: addr.port(),
            state,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn script_query(&self, replies: impl IntoIterator<Item = Reply>) {
        self.state.query_script.lock().unwrap().extend(replies);
    }

    pub fn script_synthesis(&self, replies: impl IntoIterator<Item = Reply>) {
        self.state.synthesis_script.lock().unwrap().extend(replies);
    }

    pub fn query_hits(&self) -> usize {
        self.state.query_hits.load(Ordering::SeqCst)
    }

    pub fn synthesis_hits(&self) -> usize {
        self.state.synthesis_hits.load(Ordering::SeqCst)
    }

    pub fn total_hits(&self) -> usize {
        self.query_hits() + self.synthesis_hits()
    }

    pub fn query_params(&self) -> Vec<HashMap<String, String>> {
        self.state.query_params.lock().unwrap().clone()
    }

    pub fn synthesis_requests(&self) -> Vec<SynthesisRequest> {
        self.state.synthesis_requests.lock().unwrap().clone()
    }
}

impl Drop for MockVoicevox {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
    }
}

async fn scripted(script: &Mutex<VecDeque<Reply>>) -> Option<Response> {
    let reply = script.lock().unwrap().pop_front().unwrap_or(Reply::Ok);
    match reply {
        Reply::Ok => None,
        Reply::Status(code) => {
            let status = StatusCode::from_u16(code).unwrap();
            Some((status, format!("scripted {code}")).into_response())
        }
        Reply::Stall(d) => {
            tokio::time::sleep(d).await;
            None
        }
        Reply::Garbage => Some(
            (
                [(header::CONTENT_TYPE, "application/json")],
                "{\"accent_phrases\": [",
            )
                .into_response(),
        ),
    }
}

async fn audio_query(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.query_hits.fetch_add(1, Ordering::SeqCst);
    state.query_params.lock().unwrap().push(params.clone());
    if let Some(resp) = scripted(&state.query_script).await {
        return resp;
    }
    let body = serde_json::json!({
        "accent_phrases": [],
        "speedScale": 1.0,
        "pitchScale": 0.0,
        "outputSamplingRate": 24000,
        "kana": params.get("text").cloned().unwrap_or_default(),
    });
    (
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

async fn synthesis(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.synthesis_hits.fetch_add(1, Ordering::SeqCst);
    state.synthesis_requests.lock().unwrap().push(SynthesisRequest {
        speaker: params.get("speaker").cloned(),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });
    if let Some(resp) = scripted(&state.synthesis_script).await {
        return resp;
    }
    ([(header::CONTENT_TYPE, "audio/wav")], state.wav.clone()).into_response()
}

/// Raw HTTP listener that sends a 200 with a declared `Content-Length` larger than the
/// bytes it actually writes, then holds the connection for `hold` before closing.
pub struct TruncatedBodyServer {
    pub port: u16,
    hits: Arc<AtomicUsize>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TruncatedBodyServer {
    const RESPONSE: &'static [u8] =
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"a\":";

    pub fn start(hold: Duration) -> Self {
        use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

        let hits = Arc::new(AtomicUsize::new(0));
        let (addr_tx, addr_rx) = std::sync::mpsc::channel();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let counter = hits.clone();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                addr_tx.send(listener.local_addr().unwrap()).unwrap();
                tokio::spawn(async move {
                    while let Ok((mut sock, _)) = listener.accept().await {
                        counter.fetch_add(1, Ordering::SeqCst);
                        tokio::spawn(async move {
                            let mut buf = [0u8; 4096];
                            sock.read(&mut buf).await.ok();
                            sock.write_all(Self::RESPONSE).await.ok();
                            sock.flush().await.ok();
                            tokio::time::sleep(hold).await;
                        });
                    }
                });
                shutdown_rx.await.ok();
            });
        });

        let addr = addr_rx.recv().unwrap();
        Self {
            port: addr.port(),
            hits,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for TruncatedBodyServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
    }
}

/// Silent mono 16-bit WAV with `frames` frames at `sample_rate`.
pub fn wav_bytes(frames: u32, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut w = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..frames {
            w.write_sample(0i16).unwrap();
        }
        w.finalize().unwrap();
    }
    cursor.into_inner()
}

/// A port on localhost with nothing listening.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Write a placeholder image; only its existence matters outside ffmpeg tests.
pub fn touch(path: &Path) -> PathBuf {
    std::fs::write(path, b"\x89PNG\r\n\x1a\n").unwrap();
    path.to_path_buf()
}

/// Drop an executable shell script named `name` into `dir`.
#[cfg(unix)]
pub fn fake_encoder(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt as _;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// In-memory log sink for a scoped `tracing::Dispatch`.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn dispatch(&self, directive: &str) -> tracing::Dispatch {
        let writer = self.clone();
        yukkuri::logging::dispatch(
            tracing_subscriber::EnvFilter::new(directive),
            move || writer.clone(),
            false,
        )
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
