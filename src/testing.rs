//! Test doubles shared by the unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::Semaphore;
use url::Url;

use crate::activate::{ScriptHost, ScriptLoadError};
use crate::camera::{CameraDevice, CameraError, Constraints, VideoStream};
use crate::notify::Notifier;
use crate::pipeline::{SubmissionRequest, Transport, TransportError, TransportResponse};

async fn pass_gate(gate: Option<&Arc<Semaphore>>) {
    if let Some(gate) = gate {
        let _permit = gate.acquire().await.expect("gate closed");
    }
}

// ============================================================================
// Script host
// ============================================================================

/// Script host that records fetches and models page globals.
#[derive(Default)]
pub struct FakeHost {
    defines: FxHashMap<String, String>,
    failing: FxHashSet<String>,
    gate: Option<Arc<Semaphore>>,
    fetches: Mutex<FxHashMap<String, usize>>,
    globals: Mutex<Vec<String>>,
    inline: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loading `url` sets the global `name`.
    pub fn defines(mut self, url: &str, name: &str) -> Self {
        self.defines.insert(url.to_string(), name.to_string());
        self
    }

    /// Loading `url` fails with HTTP 404.
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// Every load waits for a permit from `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().get(url).copied().unwrap_or(0)
    }

    pub fn inline_runs(&self) -> Vec<String> {
        self.inline.lock().iter().map(|(src, _)| src.clone()).collect()
    }

    /// Globals visible to each inline run, in run order.
    pub fn inline_globals(&self) -> Vec<Vec<String>> {
        self.inline.lock().iter().map(|(_, g)| g.clone()).collect()
    }
}

#[async_trait]
impl ScriptHost for FakeHost {
    async fn load(&self, url: &Url) -> Result<(), ScriptLoadError> {
        *self.fetches.lock().entry(url.to_string()).or_default() += 1;
        pass_gate(self.gate.as_ref()).await;

        if self.failing.contains(url.as_str()) {
            return Err(ScriptLoadError::Status {
                url: url.to_string(),
                status: 404,
            });
        }
        if let Some(name) = self.defines.get(url.as_str()) {
            self.globals.lock().push(name.clone());
        }
        Ok(())
    }

    fn run_inline(&self, source: &str) -> Result<(), ScriptLoadError> {
        let globals = self.globals.lock().clone();
        self.inline.lock().push((source.to_string(), globals));
        Ok(())
    }
}

// ============================================================================
// Camera
// ============================================================================

/// Camera producing a flat-colored frame.
pub struct FakeCamera {
    width: u32,
    height: u32,
    deny: bool,
    gate: Option<Arc<Semaphore>>,
    opens: AtomicUsize,
    live: Arc<AtomicUsize>,
}

impl FakeCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            deny: false,
            gate: None,
            opens: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every open fails with `PermissionDenied`.
    pub fn denying(mut self) -> Self {
        self.deny = true;
        self
    }

    /// Every open waits for a permit from `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Streams handed out and not yet released.
    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraDevice for FakeCamera {
    async fn open(&self, _constraints: &Constraints) -> Result<Box<dyn VideoStream>, CameraError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        pass_gate(self.gate.as_ref()).await;

        if self.deny {
            return Err(CameraError::PermissionDenied("user dismissed the prompt".into()));
        }
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            width: self.width,
            height: self.height,
            live: Arc::clone(&self.live),
            released: false,
        }))
    }
}

struct FakeStream {
    width: u32,
    height: u32,
    live: Arc<AtomicUsize>,
    released: bool,
}

impl VideoStream for FakeStream {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn grab(&mut self) -> Result<RgbImage, CameraError> {
        if self.released {
            return Err(CameraError::NoActiveStream);
        }
        Ok(RgbImage::from_pixel(self.width, self.height, Rgb([181, 140, 96])))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Notifier
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Transport answering every request with the same response.
pub struct StaticTransport {
    response: TransportResponse,
    gate: Option<Arc<Semaphore>>,
    requests: Mutex<Vec<SubmissionRequest>>,
}

impl StaticTransport {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            response: TransportResponse {
                status,
                body: body.to_string(),
            },
            gate: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn requests(&self) -> Vec<SubmissionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn post(&self, request: SubmissionRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().push(request);
        pass_gate(self.gate.as_ref()).await;
        Ok(self.response.clone())
    }
}

// ============================================================================
// HTTP stub server
// ============================================================================

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_contains(&self, needle: &[u8]) -> bool {
        self.body.windows(needle.len()).any(|w| w == needle)
    }
}

/// `tiny_http` server on an ephemeral port answering with a fixed response.
pub struct StubServer {
    base: Url,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub fn respond(status: u16, content_type: &str, body: &str) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind stub server");
        let port = server
            .server_addr()
            .to_ip()
            .expect("stub server has an ip address")
            .port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let content_type = content_type.to_string();
        let body = body.to_string();
        thread::spawn(move || {
            for mut request in server.incoming_requests() {
                let mut payload = Vec::new();
                request.as_reader().read_to_end(&mut payload).ok();
                recorded.lock().push(RecordedRequest {
                    method: request.method().to_string(),
                    path: request.url().to_string(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|h| (h.field.to_string(), h.value.to_string()))
                        .collect(),
                    body: payload,
                });

                let response = tiny_http::Response::from_string(body.as_str())
                    .with_status_code(status)
                    .with_header(
                        tiny_http::Header::from_bytes("Content-Type", content_type.as_bytes())
                            .expect("valid header"),
                    );
                request.respond(response).ok();
            }
        });

        let base = Url::parse(&format!("http://127.0.0.1:{port}/")).expect("stub url");
        Self { base, requests }
    }

    pub fn url(&self, path: &str) -> Url {
        self.base.join(path).expect("stub path")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}
