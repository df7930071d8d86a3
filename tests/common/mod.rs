//! Shared test helpers: an in-memory transport, event builders and local
//! HTTP stubs.

#![allow(dead_code)]

use crossbeam_channel::Receiver;
use departure_board::{
    BoardConfig, EventSink, FixedClock, LiveBoard, PushConnection, Result, SseTransport,
    Transport, TransportEvent,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct Opened {
    url: String,
    sink: EventSink,
    closes: Arc<AtomicUsize>,
}

/// Transport that records opens and closes and lets tests push events.
#[derive(Default)]
pub struct MockTransport {
    opened: Mutex<Vec<Opened>>,
}

struct MockConnection {
    closes: Arc<AtomicUsize>,
}

impl PushConnection for MockConnection {
    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Transport for MockTransport {
    fn open(&self, url: &str, sink: EventSink) -> Result<Box<dyn PushConnection>> {
        let closes = Arc::new(AtomicUsize::new(0));
        self.opened.lock().push(Opened {
            url: url.to_string(),
            sink,
            closes: closes.clone(),
        });
        Ok(Box::new(MockConnection { closes }))
    }
}

impl MockTransport {
    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }

    pub fn url(&self, index: usize) -> String {
        self.opened.lock()[index].url.clone()
    }

    pub fn closes(&self, index: usize) -> usize {
        self.opened.lock()[index].closes.load(Ordering::SeqCst)
    }

    /// Connections opened and not yet closed.
    pub fn live_count(&self) -> usize {
        self.opened
            .lock()
            .iter()
            .filter(|o| o.closes.load(Ordering::SeqCst) == 0)
            .count()
    }

    /// Push into the most recently opened connection.
    pub fn push(&self, event: TransportEvent) {
        let sink = {
            let opened = self.opened.lock();
            opened.last().expect("no connection opened").sink.clone()
        };
        sink.send(event);
    }

    pub fn push_to(&self, index: usize, event: TransportEvent) {
        let sink = self.opened.lock()[index].sink.clone();
        sink.send(event);
    }

    pub fn send(&self, event: &str, data: Value) {
        self.push(TransportEvent::Named {
            event: event.to_string(),
            data: data.to_string(),
        });
    }

    pub fn send_raw(&self, event: &str, data: &str) {
        self.push(TransportEvent::Named {
            event: event.to_string(),
            data: data.to_string(),
        });
    }
}

pub fn test_config() -> BoardConfig {
    BoardConfig::default().with_base_url("http://board.test")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn live_board(clock: Arc<FixedClock>) -> (LiveBoard, Arc<MockTransport>) {
    init_tracing();
    let transport = Arc::new(MockTransport::default());
    let board = LiveBoard::new(test_config(), transport.clone(), clock).unwrap();
    (board, transport)
}

// --- Local HTTP stubs ---

/// Response head for an open-ended event stream.
pub const SSE_HEAD: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n";

/// Bind a listener on an ephemeral local port and return it with its base URL.
pub fn local_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

/// Accept one connection and read its request head. Returns the socket and
/// the head text.
pub fn accept_request(listener: &TcpListener) -> (TcpStream, String) {
    let (stream, _) = listener.accept().unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut head = String::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
            break;
        }
        head.push_str(&line);
    }
    (stream, head)
}

/// Serve a single JSON response on a background thread. Joining the handle
/// yields the request head.
pub fn serve_json(listener: TcpListener, status: &'static str, body: String) -> JoinHandle<String> {
    thread::spawn(move || {
        let (mut stream, head) = accept_request(&listener);
        write!(
            stream,
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
        .unwrap();
        stream.flush().unwrap();
        head
    })
}

/// True once the peer has closed `stream`, false if it is still open after
/// `wait`.
pub fn peer_closed(stream: &mut TcpStream, wait: Duration) -> bool {
    stream.set_read_timeout(Some(wait)).unwrap();
    let mut buf = [0u8; 256];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => return true,
            Ok(_) => continue,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => return false,
            Err(_) => return true,
        }
    }
}

/// Sink that forwards every transport event into a channel.
pub fn channel_sink() -> (EventSink, Receiver<TransportEvent>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let sink = EventSink::new(move |event| {
        let _ = tx.send(event);
    });
    (sink, rx)
}

/// SSE transport that ignores proxy settings from the environment.
pub fn local_sse_transport() -> SseTransport {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    SseTransport::with_client(client).unwrap()
}
