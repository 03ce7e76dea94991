//! Shared fixtures for integration tests: a scripted HTTP backend that
//! stands in for the engine and download sources, plus fake engine binaries.

#![allow(dead_code)]

use llmgate::{CatalogEntry, GatewayConfig, Tier};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

/// Request as seen by the test backend
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Canned response written by the test backend
#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    /// `Some(n)` sends `Content-Length: n`; `None` streams until close
    content_length: Option<usize>,
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self {
            status,
            headers: Vec::new(),
            content_length: Some(body.len()),
            body,
        }
    }

    /// Body without a length header, terminated by closing the connection
    pub fn streamed(body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_length: None,
            ..Self::ok(body)
        }
    }

    /// Announces `declared` bytes but sends only the body given
    pub fn truncated(body: impl Into<Vec<u8>>, declared: usize) -> Self {
        Self {
            content_length: Some(declared),
            ..Self::ok(body)
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

type Handler = dyn Fn(&RecordedRequest) -> Reply + Send + Sync;

/// One-request-per-connection HTTP/1.1 server on a random local port
pub struct TestServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    pub fn start(handler: impl Fn(&RecordedRequest) -> Reply + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Test server has no address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let handler = Arc::clone(&handler);
                let recorded = Arc::clone(&recorded);
                thread::spawn(move || serve_connection(stream, handler.as_ref(), &recorded));
            }
        });

        Self { addr, requests }
    }

    /// Backend answering `/health` with 200 and everything else with 404
    pub fn healthy() -> Self {
        Self::start(|req| match req.path.as_str() {
            "/health" => Reply::ok(r#"{"status":"ok"}"#),
            _ => Reply::status(404, "not found"),
        })
    }

    /// `host:port`, the form used in gateway configuration
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

fn serve_connection(
    stream: TcpStream,
    handler: &Handler,
    recorded: &Mutex<Vec<RecordedRequest>>,
) {
    let mut reader = BufReader::new(stream.try_clone().expect("Failed to clone stream"));
    let Some(request) = read_request(&mut reader) else {
        return;
    };
    recorded.lock().unwrap().push(request.clone());

    let reply = handler(&request);
    let _ = write_reply(stream, &reply);
}

fn read_request(reader: &mut impl BufRead) -> Option<RecordedRequest> {
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        line.clear();
        reader.read_line(&mut line).ok()?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).ok()?;

    Some(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn write_reply(mut stream: TcpStream, reply: &Reply) -> std::io::Result<()> {
    let mut head = format!("HTTP/1.1 {} {}\r\n", reply.status, reason(reply.status));
    for (name, value) in &reply.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    if let Some(length) = reply.content_length {
        head.push_str(&format!("Content-Length: {}\r\n", length));
    }
    head.push_str("Connection: close\r\n\r\n");

    stream.write_all(head.as_bytes())?;
    stream.write_all(&reply.body)?;
    stream.flush()?;
    stream.shutdown(std::net::Shutdown::Both)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        206 => "Partial Content",
        404 => "Not Found",
        416 => "Range Not Satisfiable",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

/// A local port with nothing listening on it
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind probe socket");
    listener.local_addr().expect("Probe socket has no address").port()
}

/// Gateway configuration rooted in `dir`, pointed at `host`, with fast
/// engine timings and no orphan sweep
pub fn test_config(dir: &Path, host: &str) -> GatewayConfig {
    let mut config = GatewayConfig {
        host: host.to_string(),
        models_dir: dir.join("models"),
        engine_bin: dir.join("llama-server"),
        ..GatewayConfig::default()
    };
    config.engine.startup_timeout_secs = 1;
    config.engine.poll_interval_ms = 50;
    config.engine.port_release_ms = 0;
    config.engine.kill_orphans = false;
    config
}

/// Catalog entry downloadable from `url`
pub fn catalog_entry(name: &str, url: Option<String>) -> CatalogEntry {
    CatalogEntry {
        name: name.to_string(),
        display_name: name.to_string(),
        filename: format!("{}-q4_k_m.gguf", name),
        size_gb: 0.0,
        min_ram_mb: 0,
        tier: Tier::Cpu,
        architecture: "test".to_string(),
        description: "Test fixture".to_string(),
        url,
    }
}

/// Writes an executable shell script standing in for the engine binary
#[cfg(unix)]
pub fn fake_engine(path: &Path, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, format!("#!/bin/sh\n{}\n", script)).expect("Failed to write engine script");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to mark engine script executable");
    path.to_path_buf()
}

/// Writes a placeholder model file into the models directory
pub fn install_model(config: &GatewayConfig, filename: &str, bytes: &[u8]) -> PathBuf {
    std::fs::create_dir_all(&config.models_dir).expect("Failed to create models directory");
    let path = config.models_dir.join(filename);
    std::fs::write(&path, bytes).expect("Failed to write model file");
    path
}
