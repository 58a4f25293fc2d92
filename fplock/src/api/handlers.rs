//! Request dispatch and route handlers

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use serde_json::json;
use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use crate::api::http::{self, Body, Status};
use crate::api::routes::Route;
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::monitor::MonitorControl;
use crate::registry::Registry;
use crate::sensor::Sensor;
use crate::servo::ServoLock;

/// Everything a handler can touch
pub struct AppState {
    pub sensor: Arc<Mutex<Sensor>>,
    pub registry: Arc<Registry>,
    pub servo: Arc<ServoLock>,
    pub monitor: MonitorControl,
    pub config: Arc<Config>,
}

/// Route a parsed request to its handler
pub async fn dispatch<W>(
    state: &Arc<AppState>,
    route: Route,
    params: &HashMap<String, String>,
    body: &Body,
    writer: &mut W,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    match route {
        Route::Liveness => {
            http::write_json(
                writer,
                Status::OK,
                &json!({"message": "Fingerprint API Server Running"}),
            )
            .await
        }
        Route::ListFingerprints => list_fingerprints(state, writer).await,
        Route::EnrollFingerprint => enroll_fingerprint(state, body, writer).await,
        Route::DeleteFingerprint => delete_fingerprint(state, params, writer).await,
        Route::ServoUnlock => servo_unlock(state, writer).await,
        Route::ServoLock => servo_lock(state, writer).await,
        Route::ServoStatus => {
            http::write_json(writer, Status::OK, &json!({"status": state.servo.state()})).await
        }
        Route::MonitorStart => {
            state.monitor.set_enabled(true);
            http::write_json(
                writer,
                Status::OK,
                &json!({"message": "Fingerprint monitoring started."}),
            )
            .await
        }
        Route::MonitorStop => {
            state.monitor.set_enabled(false);
            http::write_json(
                writer,
                Status::OK,
                &json!({"message": "Fingerprint monitoring stopped."}),
            )
            .await
        }
        Route::MonitorStatus => {
            http::write_json(writer, Status::OK, &json!(state.monitor.status())).await
        }
        Route::ListLogs => list_logs(state, writer).await,
        Route::GetLog => get_log(state, params, writer).await,
    }
}

async fn list_fingerprints<W>(state: &Arc<AppState>, writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    http::write_json(writer, Status::OK, &json!(state.registry.as_map())).await
}

async fn delete_fingerprint<W>(
    state: &Arc<AppState>,
    params: &HashMap<String, String>,
    writer: &mut W,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let Some(slot) = params.get("id").and_then(|id| id.parse::<u16>().ok()) else {
        return http::write_error(writer, Status::BAD_REQUEST, "Invalid fingerprint ID format.")
            .await;
    };

    info!(slot, "delete fingerprint requested");

    let _suspend = state.monitor.suspend();

    let result = state.sensor.lock().await.delete(slot).await;

    match result {
        Ok(()) => {
            http::write_json(
                writer,
                Status::OK,
                &json!({"message": "Fingerprint deleted successfully."}),
            )
            .await
        }
        Err(e) if state.registry.get(slot).is_none() => {
            warn!(slot, error = %e, "delete failed for unknown slot");
            http::write_error(writer, Status::NOT_FOUND, "Fingerprint not found.").await
        }
        Err(e) => {
            error!(slot, error = %e, "delete failed");
            http::write_error(writer, Status::INTERNAL, &e.to_string()).await
        }
    }
}

async fn enroll_fingerprint<W>(
    state: &Arc<AppState>,
    body: &Body,
    writer: &mut W,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let name = match body {
        Body::Json(value) => value.get("name").and_then(|n| n.as_str()).map(str::to_string),
        _ => None,
    };
    let Some(name) = name else {
        return http::write_error(
            writer,
            Status::BAD_REQUEST,
            "Missing 'name' in request body.",
        )
        .await;
    };

    let Some(slot) = state
        .registry
        .next_free_slot(state.config.device.capacity)
    else {
        warn!("no free fingerprint slots left");
        return http::write_error(
            writer,
            Status::STORAGE_FULL,
            "Fingerprint storage full (application limit).",
        )
        .await;
    };

    info!(slot, name, "enrollment requested");

    let _suspend = state.monitor.suspend();

    http::write_sse_headers(writer).await?;

    let cancel = CancelToken::new();
    let (tx, mut rx) = mpsc::channel(1);

    let enroll_task = {
        let sensor = Arc::clone(&state.sensor);
        let cancel = cancel.clone();
        let name = name.clone();
        tokio::spawn(async move {
            sensor.lock().await.enroll(slot, &name, cancel, tx).await;
        })
    };

    let mut client_gone = false;

    while let Some(event) = rx.recv().await {
        if http::write_sse_event(writer, &event).await.is_err() {
            // A broken write is a client disconnect, not a server fault
            warn!(slot, "client disconnected during enrollment stream");
            cancel.cancel();
            client_gone = true;
            break;
        }

        if event.is_terminal() {
            break;
        }
    }

    // Unblock any in-flight send, then wait for the engine to release the
    // device before anything else may touch it
    drop(rx);
    if let Err(e) = enroll_task.await {
        error!(slot, error = %e, "enrollment task failed");
    }

    if client_gone {
        // The module may still be mid-enrollment on its side
        if let Err(e) = state.sensor.lock().await.cancel_operation().await {
            warn!(slot, error = %e, "post-disconnect cancel failed");
        }
    }

    info!(slot, "enrollment stream finished");
    Ok(())
}

async fn servo_unlock<W>(state: &Arc<AppState>, writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    info!("unlock requested");
    match state.servo.unlock().await {
        Ok(lock_state) => {
            http::write_json(
                writer,
                Status::OK,
                &json!({"message": "Servo unlocked.", "status": lock_state}),
            )
            .await
        }
        Err(e) => {
            error!(error = %e, "unlock failed");
            http::write_error(writer, Status::INTERNAL, "Failed to actuate lock.").await
        }
    }
}

async fn servo_lock<W>(state: &Arc<AppState>, writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    info!("lock requested");
    match state.servo.lock().await {
        Ok(lock_state) => {
            http::write_json(
                writer,
                Status::OK,
                &json!({"message": "Servo locked.", "status": lock_state}),
            )
            .await
        }
        Err(e) => {
            error!(error = %e, "lock failed");
            http::write_error(writer, Status::INTERNAL, "Failed to actuate lock.").await
        }
    }
}

async fn list_logs<W>(state: &Arc<AppState>, writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut entries = match tokio::fs::read_dir(&state.config.logs.dir).await {
        Ok(entries) => entries,
        Err(_) => {
            return http::write_error(writer, Status::NOT_FOUND, "Log directory does not exist.")
                .await;
        }
    };

    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    http::write_json(writer, Status::OK, &json!({"logs": names})).await
}

async fn get_log<W>(
    state: &Arc<AppState>,
    params: &HashMap<String, String>,
    writer: &mut W,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let Some(name) = params.get("name") else {
        return http::write_error(writer, Status::BAD_REQUEST, "Invalid filename.").await;
    };

    // Log names never leave the log directory
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return http::write_error(writer, Status::BAD_REQUEST, "Invalid filename.").await;
    }

    let path = state.config.logs.dir.join(name);

    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return http::write_error(writer, Status::NOT_FOUND, "Log file not found.").await;
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to open log file");
            return http::write_error(writer, Status::INTERNAL, "Failed to read log file.").await;
        }
    };

    let len = file.metadata().await?.len();
    http::write_file_head(writer, len).await?;
    tokio::io::copy(&mut file, writer).await?;

    Ok(())
}
