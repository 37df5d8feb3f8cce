//! A local stand-in for the Wayback Machine, served on an ephemeral port.

#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    io::{BufRead, BufReader, Write},
    net::{SocketAddr, TcpStream},
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc, Mutex,
    },
    thread,
};

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    routing::get,
    Router,
};

pub static ONE_CAPTURE_INDEX: &str =
    r#"[["timestamp","digest","length"],["20200101000000","abc","100"]]"#;
pub static TWO_CAPTURES_INDEX: &str = r#"[["timestamp","digest","length"],["20200101000000","abc","5"],["20210101000000","abc","5"]]"#;
pub static THREE_CAPTURES_INDEX: &str = r#"[["timestamp","digest","length"],["20200101000000","abc","5"],["20210101000000","abc","5"],["20220101000000","def","5"]]"#;

#[derive(Clone)]
struct ArchiveState {
    index_status: StatusCode,
    index_body: Arc<String>,
    snapshots: Arc<HashMap<String, Vec<u8>>>,
    index_requests: Arc<AtomicUsize>,
    snapshot_requests: Arc<AtomicUsize>,
    index_queries: Arc<Mutex<Vec<String>>>,
    snapshot_paths: Arc<Mutex<Vec<String>>>,
}

#[derive(Debug)]
pub struct MockArchive {
    pub base_url: String,
    index_requests: Arc<AtomicUsize>,
    snapshot_requests: Arc<AtomicUsize>,
    index_queries: Arc<Mutex<Vec<String>>>,
    snapshot_paths: Arc<Mutex<Vec<String>>>,
}

impl MockArchive {
    /// Serves `index_body` from the capture index and each `(timestamp,
    /// body)` pair as a snapshot. Unknown snapshots answer 404.
    pub fn start(index_body: &str, snapshots: &[(&str, &str)]) -> Self {
        Self::start_with_status(StatusCode::OK, index_body, snapshots)
    }

    pub fn start_with_status(
        index_status: StatusCode,
        index_body: &str,
        snapshots: &[(&str, &str)],
    ) -> Self {
        let state = ArchiveState {
            index_status,
            index_body: Arc::new(index_body.to_string()),
            snapshots: Arc::new(
                snapshots
                    .iter()
                    .map(|(timestamp, body)| (timestamp.to_string(), body.as_bytes().to_vec()))
                    .collect(),
            ),
            index_requests: Arc::default(),
            snapshot_requests: Arc::default(),
            index_queries: Arc::default(),
            snapshot_paths: Arc::default(),
        };
        let archive = Self {
            base_url: String::new(),
            index_requests: state.index_requests.clone(),
            snapshot_requests: state.snapshot_requests.clone(),
            index_queries: state.index_queries.clone(),
            snapshot_paths: state.snapshot_paths.clone(),
        };

        let (addr_tx, addr_rx) = mpsc::channel::<SocketAddr>();
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build mock archive runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("failed to bind mock archive");
                addr_tx
                    .send(listener.local_addr().unwrap())
                    .expect("failed to report mock archive address");
                let app = Router::new()
                    .route("/cdx/search/cdx", get(serve_index))
                    .route("/web/*capture", get(serve_snapshot))
                    .with_state(state);
                axum::serve(listener, app).await.unwrap();
            });
        });
        let addr = addr_rx.recv().expect("mock archive failed to start");

        Self {
            base_url: format!("http://{}", addr),
            ..archive
        }
    }

    pub fn total_requests(&self) -> usize {
        self.index_requests() + self.snapshot_requests()
    }

    pub fn index_requests(&self) -> usize {
        self.index_requests.load(Ordering::SeqCst)
    }

    pub fn snapshot_requests(&self) -> usize {
        self.snapshot_requests.load(Ordering::SeqCst)
    }

    pub fn index_queries(&self) -> Vec<String> {
        self.index_queries.lock().unwrap().clone()
    }

    /// Snapshot paths below `/web/`, in request order.
    pub fn snapshot_paths(&self) -> Vec<String> {
        self.snapshot_paths.lock().unwrap().clone()
    }
}

/// An archive that serves the index and then `snapshot_bodies` in request
/// order. Once those run out, every further snapshot request has its
/// connection closed without a response.
#[derive(Debug)]
pub struct DroppingArchive {
    pub base_url: String,
}

impl DroppingArchive {
    pub fn start(index_body: &str, snapshot_bodies: &[&str]) -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let index_body = index_body.to_string();
        let mut snapshot_bodies: VecDeque<String> =
            snapshot_bodies.iter().map(|body| body.to_string()).collect();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let mut stream = match stream {
                    Ok(stream) => stream,
                    Err(_) => break,
                };
                let path = match read_request_path(&stream) {
                    Some(path) => path,
                    None => continue,
                };
                let body = if path.starts_with("/cdx/search/cdx") {
                    Some(index_body.clone())
                } else {
                    snapshot_bodies.pop_front()
                };
                if let Some(body) = body {
                    let _ = write!(
                        stream,
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                }
            }
        });

        Self {
            base_url: format!("http://{}", addr),
        }
    }
}

/// Reads one request head and returns its path.
fn read_request_path(stream: &TcpStream) -> Option<String> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) | Err(_) => break,
            Ok(_) if header == "\r\n" => break,
            Ok(_) => {}
        }
    }
    request_line.split_whitespace().nth(1).map(str::to_string)
}

/// Returns a base URL nothing listens on.
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn serve_index(
    State(state): State<ArchiveState>,
    RawQuery(query): RawQuery,
) -> (StatusCode, String) {
    state.index_requests.fetch_add(1, Ordering::SeqCst);
    state
        .index_queries
        .lock()
        .unwrap()
        .push(query.unwrap_or_default());
    (state.index_status, state.index_body.as_ref().clone())
}

async fn serve_snapshot(
    State(state): State<ArchiveState>,
    Path(capture): Path<String>,
) -> (StatusCode, Vec<u8>) {
    state.snapshot_requests.fetch_add(1, Ordering::SeqCst);
    state.snapshot_paths.lock().unwrap().push(capture.clone());
    let timestamp = capture.split("if_/").next().unwrap_or_default();
    match state.snapshots.get(timestamp) {
        Some(body) => (StatusCode::OK, body.clone()),
        None => (StatusCode::NOT_FOUND, b"not archived".to_vec()),
    }
}
