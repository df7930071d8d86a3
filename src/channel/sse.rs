//! Server-Sent Events transport.
//!
//! Opens a streaming `GET` with `Accept: text/event-stream` and reads the
//! body chunk by chunk on a tokio task, turning `event:`/`data:` blocks into
//! [`TransportEvent`]s. Closing a connection aborts its task, which drops the
//! response and with it the underlying socket.

use crate::channel::transport::{EventSink, PushConnection, Transport, TransportEvent};
use crate::error::{BoardError, Result};
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const EVENT_STREAM: &str = "text/event-stream";

/// Incremental parser for the SSE line format.
///
/// Feed it one line at a time (without the line terminator); it yields an
/// event whenever a blank line closes a block that carried data.
#[derive(Debug, Default)]
pub struct SseParser {
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_line(&mut self, line: &str) -> Option<TransportEvent> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            return self.dispatch();
        }

        // Comment / keep-alive
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // `id` and `retry` only matter to auto-reconnecting clients.
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<TransportEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");

        match event {
            Some(name) if !name.is_empty() && name != "message" => {
                Some(TransportEvent::Named { event: name, data })
            }
            _ => Some(TransportEvent::Message { data }),
        }
    }
}

/// Owns the runtime the reader tasks run on.
///
/// Shut down in the background so the transport can be dropped from any
/// thread, including a runtime worker.
struct ReaderRuntime(Option<Runtime>);

impl ReaderRuntime {
    fn spawn<F>(&self, future: F) -> Result<JoinHandle<()>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        match &self.0 {
            Some(runtime) => Ok(runtime.spawn(future)),
            None => Err(BoardError::Transport("Reader runtime shut down".to_string())),
        }
    }
}

impl Drop for ReaderRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

/// HTTP transport for server-sent events.
#[derive(Clone)]
pub struct SseTransport {
    client: reqwest::Client,
    runtime: Arc<ReaderRuntime>,
}

impl SseTransport {
    /// Create a transport with no read timeout; streams stay open until
    /// closed or failed.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BoardError::Transport(e.to_string()))?;
        Self::with_client(client)
    }

    /// Use a preconfigured client, e.g. one with extra default headers.
    pub fn with_client(client: reqwest::Client) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("sse-reader")
            .enable_all()
            .build()
            .map_err(|e| BoardError::Transport(format!("Failed to start reader runtime: {}", e)))?;
        Ok(Self {
            client,
            runtime: Arc::new(ReaderRuntime(Some(runtime))),
        })
    }
}

impl std::fmt::Debug for SseTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseTransport").finish_non_exhaustive()
    }
}

struct SseConnection {
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl PushConnection for SseConnection {
    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.reader.abort();
    }
}

impl Drop for SseConnection {
    fn drop(&mut self) {
        self.close();
    }
}

impl Transport for SseTransport {
    fn open(&self, url: &str, sink: EventSink) -> Result<Box<dyn PushConnection>> {
        let closed = Arc::new(AtomicBool::new(false));
        let request = self
            .client
            .get(url)
            .header(ACCEPT, EVENT_STREAM)
            .header(CACHE_CONTROL, "no-cache");

        let reader = self.runtime.spawn(read_stream(
            request,
            url.to_string(),
            sink,
            closed.clone(),
        ))?;

        Ok(Box::new(SseConnection { closed, reader }))
    }
}

async fn read_stream(
    request: reqwest::RequestBuilder,
    url: String,
    sink: EventSink,
    closed: Arc<AtomicBool>,
) {
    let fail = |message: String| {
        if !closed.load(Ordering::SeqCst) {
            sink.send(TransportEvent::Error(message));
        }
    };

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return fail(format!("Request to {} failed: {}", url, e)),
    };

    let status = response.status();
    if !status.is_success() {
        return fail(format!("Stream {} returned status {}", url, status.as_u16()));
    }

    let mut body = std::pin::pin!(response.bytes_stream());
    let mut buffer: Vec<u8> = Vec::with_capacity(8192);
    let mut parser = SseParser::new();

    loop {
        while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line[..newline]);
            if let Some(event) = parser.feed_line(&line) {
                if closed.load(Ordering::SeqCst) {
                    debug!(url = %url, "Reader stopping after close");
                    return;
                }
                sink.send(event);
            }
        }

        match body.next().await {
            Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
            Some(Err(e)) => {
                warn!(url = %url, error = %e, "SSE stream read error");
                return fail(format!("Read error: {}", e));
            }
            None => break,
        }
    }

    fail("Stream ended".to_string());
}
