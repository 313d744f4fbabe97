//! HTTP surface.
//!
//! Routes:
//! - `POST /ingest` accepts a device reading. Always answers `{"ok": true}`.
//! - `GET /` serves the dashboard page.
//! - `GET /health` liveness probe.
//! - `GET /api/status` current alert status.
//! - `GET /api/coords`, `POST /api/coords` read and change the configured
//!   sensor coordinate.
//!
//! Routing is a pure function of the request (`route`) so it can be tested
//! without a socket. `ApiServer` wires it to `tiny_http` and handles each
//! request on its own thread, joining them on shutdown; all shared state
//! lives in `StatusService`.

use serde_json::{json, Value};
use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Method, Request, Response, Server};

use crate::logging::{self, Component};
use crate::model::{AlertError, Coordinate};
use crate::status::StatusService;

/// Largest request body read from the socket. Device payloads and
/// coordinate updates are a few dozen bytes.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

const DASHBOARD_HTML: &str = include_str!("../static/index.html");

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl ApiResponse {
    fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: value.to_string(),
        }
    }

    fn html(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.to_string(),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "ok": false, "error": message }))
    }
}

/// Dispatches one request. `url` may carry a query string, which is ignored.
pub fn route(service: &StatusService, method: &Method, url: &str, body: &[u8]) -> ApiResponse {
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (Method::Post, "/ingest") => {
            service.ingest(body);
            ApiResponse::json(200, json!({ "ok": true }))
        }
        (Method::Get, "/") | (Method::Get, "/index.html") => ApiResponse::html(DASHBOARD_HTML),
        (Method::Get, "/health") => ApiResponse::json(200, json!({ "ok": true, "status": "running" })),
        (Method::Get, "/api/status") => match serde_json::to_value(service.status()) {
            Ok(value) => ApiResponse::json(200, value),
            Err(e) => ApiResponse::error(500, &e.to_string()),
        },
        (Method::Get, "/api/coords") => {
            let c = service.coordinates();
            ApiResponse::json(200, json!({ "latitud": c.latitude, "longitud": c.longitude }))
        }
        (Method::Post, "/api/coords") => set_coordinates(service, body),
        (_, "/ingest" | "/" | "/health" | "/api/status" | "/api/coords") => {
            ApiResponse::error(405, "method not allowed")
        }
        _ => ApiResponse::error(404, "not found"),
    }
}

fn set_coordinates(service: &StatusService, body: &[u8]) -> ApiResponse {
    let coordinate = match parse_coordinate_body(body) {
        Ok(c) => c,
        Err(message) => return ApiResponse::error(400, &message),
    };

    match service.set_coordinates(coordinate) {
        Ok(()) => ApiResponse::json(
            200,
            json!({ "ok": true, "latitud": coordinate.latitude, "longitud": coordinate.longitude }),
        ),
        Err(AlertError::InvalidCoordinate(message)) => ApiResponse::error(400, &message),
        Err(e) => {
            logging::error(Component::Http, Some("/api/coords"), &e.to_string());
            ApiResponse::error(500, "could not persist coordinates")
        }
    }
}

/// Extracts a coordinate from a `{latitud, longitud}` body. The dashboard's
/// short `lat`/`lon` keys are accepted too. Both values must be JSON numbers.
pub fn parse_coordinate_body(body: &[u8]) -> Result<Coordinate, String> {
    let value: Value = serde_json::from_slice(body).map_err(|_| "body must be a JSON object".to_string())?;
    let object = value.as_object().ok_or_else(|| "body must be a JSON object".to_string())?;

    let number = |keys: &[&str]| -> Result<f64, String> {
        let raw = keys
            .iter()
            .find_map(|k| object.get(*k))
            .ok_or_else(|| format!("missing '{}'", keys[0]))?;
        raw.as_f64()
            .filter(|n| n.is_finite())
            .ok_or_else(|| format!("'{}' must be a finite number", keys[0]))
    };

    let coordinate = Coordinate::new(
        number(&["latitud", "lat", "latitude"])?,
        number(&["longitud", "lon", "longitude"])?,
    );
    coordinate.validate().map_err(|e| e.to_string())?;
    Ok(coordinate)
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub struct ApiServer {
    server: Arc<Server>,
    service: Arc<StatusService>,
}

/// Stops a running `ApiServer` from another thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    server: Arc<Server>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.server.unblock();
    }
}

impl ApiServer {
    pub fn bind(addr: &str, service: Arc<StatusService>) -> Result<Self, AlertError> {
        let server = Server::http(addr)
            .map_err(|e| AlertError::Config(format!("cannot bind {}: {}", addr, e)))?;
        Ok(Self {
            server: Arc::new(server),
            service,
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            server: Arc::clone(&self.server),
        }
    }

    /// Serves requests until `ShutdownHandle::shutdown` is called, then
    /// waits for the requests already being handled to finish.
    pub fn run(&self) {
        if let Some(addr) = self.local_addr() {
            logging::info(Component::Http, None, &format!("Listening on http://{}", addr));
        }
        let mut workers: Vec<JoinHandle<()>> = Vec::new();
        for request in self.server.incoming_requests() {
            workers.retain(|w| !w.is_finished());
            let service = Arc::clone(&self.service);
            workers.push(thread::spawn(move || handle(&service, request)));
        }

        if !workers.is_empty() {
            logging::info(
                Component::Http,
                None,
                &format!("Waiting for {} in-flight request(s)", workers.len()),
            );
        }
        for worker in workers {
            if worker.join().is_err() {
                logging::error(Component::Http, None, "Request handler panicked");
            }
        }
        logging::info(Component::Http, None, "Server stopped");
    }
}

fn handle(service: &StatusService, mut request: Request) {
    let mut body = Vec::new();
    let read = request.as_reader().take(MAX_BODY_BYTES).read_to_end(&mut body);
    if let Err(e) = read {
        logging::warn(Component::Http, Some(request.url()), &format!("Failed to read body: {}", e));
    }

    let method = request.method().clone();
    let url = request.url().to_string();
    let api = route(service, &method, &url, &body);
    logging::debug(Component::Http, Some(&url), &format!("{} → {}", method, api.status));

    let mut response = Response::from_string(api.body).with_status_code(api.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], api.content_type.as_bytes()) {
        response = response.with_header(header);
    }
    if let Err(e) = request.respond(response) {
        logging::warn(Component::Http, Some(&url), &format!("Failed to send response: {}", e));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
