//! Control-plane API server
//!
//! Accept loop plus per-connection request handling. Each connection runs
//! one request through: request line, headers, preflight short-circuit,
//! bearer-token authentication, body, routing, dispatch, response, close.

pub mod handlers;
pub mod http;
pub mod routes;

pub use handlers::AppState;

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use http::{Body, Status};

/// Run the accept loop until the future is dropped
///
/// Each accepted connection is handed to its own task so one slow client
/// never blocks another.
pub async fn serve(state: Arc<AppState>, listener: TcpListener) -> anyhow::Result<()> {
    info!("control API listening on {}", listener.local_addr()?);

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "new control connection");
                let state = Arc::clone(&state);

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(state, stream).await {
                        // Almost always the client going away mid-response
                        debug!(%peer, error = %e, "connection ended with I/O error");
                    }
                });
            }
            Err(e) => {
                // Transient accept failure (fd exhaustion and the like)
                error!(error = %e, "accept failed");
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

/// Process one request on an established connection
pub async fn handle_connection<S>(state: Arc<AppState>, stream: S) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    let (method, target) = match http::read_request_line(&mut reader).await? {
        http::RequestLine::Empty => {
            debug!("empty request line, closing");
            return Ok(());
        }
        http::RequestLine::Malformed => {
            return http::write_error(&mut writer, Status::BAD_REQUEST, "Malformed request line.")
                .await;
        }
        http::RequestLine::Request { method, target } => (method, target),
    };

    let path = target.split('?').next().unwrap_or("").to_string();
    debug!(method, path, "request");

    let headers = http::read_headers(&mut reader).await?;

    // Preflight negotiation always succeeds, unauthenticated and bodyless
    if method == "OPTIONS" {
        return http::write_preflight(&mut writer).await;
    }

    if !authorized(&headers, &state.config.api.token) {
        return http::write_error(&mut writer, Status::UNAUTHORIZED, "Authentication required.")
            .await;
    }

    let body = if matches!(method.as_str(), "POST" | "PUT" | "PATCH") {
        http::read_body(&mut reader, &headers).await?
    } else {
        Body::None
    };

    if body == Body::Invalid {
        return http::write_error(&mut writer, Status::BAD_REQUEST, "Invalid JSON in request body.")
            .await;
    }

    match routes::match_route(&method, &path) {
        Some((route, params)) => {
            handlers::dispatch(&state, route, &params, &body, &mut writer).await
        }
        None => http::write_error(&mut writer, Status::NOT_FOUND, "Resource not found.").await,
    }
}

/// Static bearer-token check; an unset token rejects everything
fn authorized(headers: &HashMap<String, String>, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }

    headers
        .get("authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|presented| presented == token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::monitor::MonitorControl;
    use crate::registry::Registry;
    use crate::sensor::tests::ack_frame;
    use crate::sensor::Sensor;
    use crate::servo::{NullActuator, ServoLock};
    use fplock_transport::{MockHandle, MockTransport};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::Mutex;

    const TOKEN: &str = "test-token";

    fn temp_registry() -> Arc<Registry> {
        let path: PathBuf = std::env::temp_dir().join(format!(
            "fplock-api-test-{}-{:?}.json",
            std::process::id(),
            std::thread::current().id()
        ));
        let _ = std::fs::remove_file(&path);
        Arc::new(Registry::load(path))
    }

    fn test_state() -> (Arc<AppState>, MockHandle) {
        let (transport, handle) = MockTransport::new();
        let registry = temp_registry();

        let sensor = Sensor::new(Box::new(transport), 0xFFFF_FFFF, Arc::clone(&registry))
            .with_read_timeout(Duration::from_millis(20))
            .with_enroll_count(2);

        let mut config = Config::default();
        config.api.token = TOKEN.to_string();

        let state = Arc::new(AppState {
            sensor: Arc::new(Mutex::new(sensor)),
            registry,
            servo: Arc::new(ServoLock::new(Box::new(NullActuator), 145, 0)),
            monitor: MonitorControl::new(true),
            config: Arc::new(config),
        });

        (state, handle)
    }

    /// Run one raw request through a connection and return the raw response
    async fn exchange(state: Arc<AppState>, raw: String) -> String {
        let (client, server) = tokio::io::duplex(16 * 1024);

        let server_task = tokio::spawn(handle_connection(state, server));

        let (mut client_read, mut client_write) = tokio::io::split(client);
        client_write.write_all(raw.as_bytes()).await.unwrap();

        let mut response = Vec::new();
        client_read.read_to_end(&mut response).await.unwrap();

        server_task.await.unwrap().unwrap();
        String::from_utf8(response).unwrap()
    }

    fn get(path: &str) -> String {
        format!(
            "GET {path} HTTP/1.1\r\nAuthorization: Bearer {TOKEN}\r\n\r\n"
        )
    }

    fn post(path: &str, body: &str) -> String {
        format!(
            "POST {path} HTTP/1.1\r\nAuthorization: Bearer {TOKEN}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (state, _) = test_state();
        let response = exchange(state, "GET / HTTP/1.1\r\n\r\n".to_string()).await;

        assert!(response.starts_with("HTTP/1.1 401"));
        assert!(response.contains("Authentication required."));
    }

    #[tokio::test]
    async fn test_wrong_token_is_unauthorized() {
        let (state, _) = test_state();
        let response = exchange(
            state,
            "GET / HTTP/1.1\r\nAuthorization: Bearer nope\r\n\r\n".to_string(),
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 401"));
    }

    #[tokio::test]
    async fn test_empty_configured_token_rejects_all() {
        let (state, _) = test_state();
        let mut config = (*state.config).clone();
        config.api.token = String::new();

        let state = Arc::new(AppState {
            sensor: Arc::clone(&state.sensor),
            registry: Arc::clone(&state.registry),
            servo: Arc::clone(&state.servo),
            monitor: state.monitor.clone(),
            config: Arc::new(config),
        });

        let response = exchange(
            state,
            "GET / HTTP/1.1\r\nAuthorization: Bearer \r\n\r\n".to_string(),
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 401"));
    }

    #[tokio::test]
    async fn test_malformed_request_line_is_400() {
        let (state, _) = test_state();
        let response = exchange(state, "GARBAGE\r\n".to_string()).await;

        assert!(response.starts_with("HTTP/1.1 400"));
        assert!(response.contains("Malformed request line."));
    }

    #[tokio::test]
    async fn test_preflight_bypasses_auth() {
        let (state, _) = test_state();
        let response = exchange(state, "OPTIONS /fingerprints HTTP/1.1\r\n\r\n".to_string()).await;

        assert!(response.starts_with("HTTP/1.1 204"));
        assert!(response.contains("Access-Control-Allow-Methods"));
    }

    #[tokio::test]
    async fn test_root_liveness() {
        let (state, _) = test_state();
        let response = exchange(state, get("/")).await;

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("Fingerprint API Server Running"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (state, _) = test_state();
        let response = exchange(state, get("/nothing/here")).await;

        assert!(response.starts_with("HTTP/1.1 404"));
        assert!(response.contains("Resource not found."));
    }

    #[tokio::test]
    async fn test_list_fingerprints() {
        let (state, _) = test_state();
        state.registry.insert(0, "alice");
        state.registry.insert(2, "bob");

        let response = exchange(state, get("/fingerprints")).await;

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(r#""0":"alice""#));
        assert!(response.contains(r#""2":"bob""#));
    }

    #[tokio::test]
    async fn test_monitoring_toggle_and_status() {
        let (state, _) = test_state();

        let response = exchange(Arc::clone(&state), post("/monitoring/stop", "")).await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(!state.monitor.enabled());

        let response = exchange(Arc::clone(&state), get("/monitoring/status")).await;
        assert!(response.contains(r#""enabled":false"#));
        assert!(response.contains(r#""active":false"#));

        let response = exchange(Arc::clone(&state), post("/monitoring/start", "")).await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(state.monitor.enabled());
    }

    #[tokio::test]
    async fn test_servo_routes() {
        let (state, _) = test_state();

        let response = exchange(Arc::clone(&state), post("/servo/unlock", "")).await;
        assert!(response.contains(r#""status":"unlocked""#));

        let response = exchange(Arc::clone(&state), get("/servo/status")).await;
        assert!(response.contains(r#""status":"unlocked""#));

        let response = exchange(Arc::clone(&state), post("/servo/lock", "")).await;
        assert!(response.contains(r#""status":"locked""#));
    }

    #[tokio::test]
    async fn test_delete_invalid_id_is_400() {
        let (state, _) = test_state();
        let response = exchange(
            state,
            format!("DELETE /fingerprints/abc HTTP/1.1\r\nAuthorization: Bearer {TOKEN}\r\n\r\n"),
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 400"));
    }

    #[tokio::test]
    async fn test_delete_unknown_slot_is_404() {
        let (state, handle) = test_state();
        handle.push_frame(ack_frame(0x0B, []));

        let response = exchange(
            state,
            format!("DELETE /fingerprints/42 HTTP/1.1\r\nAuthorization: Bearer {TOKEN}\r\n\r\n"),
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 404"));
        assert!(response.contains("Fingerprint not found."));
    }

    #[tokio::test]
    async fn test_delete_success_restores_monitoring() {
        let (state, handle) = test_state();
        state.registry.insert(1, "erin");
        handle.push_frame(ack_frame(0x00, []));

        assert!(state.monitor.enabled());
        let response = exchange(Arc::clone(&state), format!(
            "DELETE /fingerprints/1 HTTP/1.1\r\nAuthorization: Bearer {TOKEN}\r\n\r\n"
        ))
        .await;

        assert!(response.starts_with("HTTP/1.1 200"));
        assert_eq!(state.registry.get(1), None);

        // Suspension released, prior enabled state restored
        assert!(state.monitor.enabled());
        assert!(state.monitor.gate_open());
    }

    #[tokio::test]
    async fn test_enroll_missing_name_is_400() {
        let (state, _) = test_state();
        let response = exchange(state, post("/fingerprints", r#"{"nope": 1}"#)).await;

        assert!(response.starts_with("HTTP/1.1 400"));
        assert!(response.contains("Missing 'name'"));
    }

    #[tokio::test]
    async fn test_enroll_invalid_json_is_400() {
        let (state, _) = test_state();
        let response = exchange(state, post("/fingerprints", "{not json")).await;

        assert!(response.starts_with("HTTP/1.1 400"));
        assert!(response.contains("Invalid JSON"));
    }

    #[tokio::test]
    async fn test_enroll_storage_full_is_507() {
        let (state, _) = test_state();
        for slot in 0..state.config.device.capacity {
            state.registry.insert(slot, format!("user-{slot}"));
        }

        let response = exchange(state, post("/fingerprints", r#"{"name":"late"}"#)).await;

        assert!(response.starts_with("HTTP/1.1 507"));
        assert!(response.contains("storage full"));
    }

    #[tokio::test]
    async fn test_enroll_streams_progress_to_success() {
        let (state, handle) = test_state();

        for (phase, step) in [
            (0x00u8, 0x00u8),
            (0x01, 0x01),
            (0x02, 0x01),
            (0x03, 0x01),
            (0x01, 0x02),
            (0x02, 0x02),
            (0x03, 0x02),
            (0x04, 0xF0),
            (0x05, 0xF1),
            (0x06, 0xF2),
        ] {
            handle.push_frame(ack_frame(0x00, [phase, step]));
        }

        let response =
            exchange(Arc::clone(&state), post("/fingerprints", r#"{"name":"zoe"}"#)).await;

        assert!(response.contains("Content-Type: text/event-stream"));
        assert!(response.contains(r#"data: {"status":"progress""#));
        assert!(response.contains(r#""status":"success""#));
        assert!(response.contains(r#""id":0"#));

        assert_eq!(state.registry.get(0).as_deref(), Some("zoe"));
        assert!(state.monitor.enabled());
        assert!(state.monitor.gate_open());
    }

    #[tokio::test]
    async fn test_enroll_device_error_streams_terminal_error() {
        let (state, handle) = test_state();
        handle.push_frame(ack_frame(0x1F, []));

        let response =
            exchange(Arc::clone(&state), post("/fingerprints", r#"{"name":"max"}"#)).await;

        assert!(response.contains("Content-Type: text/event-stream"));
        assert!(response.contains(r#""status":"error""#));
        assert!(response.contains("fingerprint library full"));

        assert_eq!(state.registry.get(0), None);
        assert!(state.monitor.gate_open());
    }
}
