//! Daemon entry point: load config, wire the components, run until ctrl-c.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use fplock::api::{self, AppState};
use fplock::config::Config;
use fplock::monitor::{self, MonitorControl};
use fplock::registry::Registry;
use fplock::sensor::Sensor;
use fplock::servo::{LockActuator, NullActuator, ServoLock, SysfsPwmActuator};
use fplock::logging;
use fplock_transport::{TcpTransport, Transport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "fplock.toml".to_string());
    let config = Config::load(&config_path)?;

    let _log_guard = logging::init(&config.logs)?;
    info!(config = %config_path, "system starting up");

    if config.api.token.is_empty() {
        warn!("api.token is not set; every control request will be rejected");
    }

    // Byte link to the sensor module
    let mut transport = TcpTransport::new(config.bridge.host.clone(), config.bridge.port);
    transport
        .connect()
        .await
        .context("failed to reach the sensor serial bridge")?;

    let registry = Arc::new(Registry::load(&config.registry.path));
    info!(fingerprints = registry.len(), "registry loaded");

    let mut sensor = Sensor::new(
        Box::new(transport),
        config.device.address,
        Arc::clone(&registry),
    )
    .with_read_timeout(config.device.read_timeout())
    .with_enroll_count(config.device.enroll_count)
    .with_score_level(config.device.score_level)
    .with_capacity(config.device.capacity);

    // Optional boot-time identity check; a mismatch is loud but not fatal
    if let Some(expected) = &config.device.chip_sn {
        match sensor.read_chip_sn().await {
            Ok(sn) if &sn != expected => {
                error!(expected = %expected, actual = %sn, "chip serial number does not match")
            }
            Ok(_) => info!("chip serial number verified"),
            Err(e) => error!(error = %e, "failed to read chip serial number"),
        }
    }

    if let Err(e) = sensor.led_off().await {
        warn!(error = %e, "failed to turn off sensor led");
    }

    let sensor = Arc::new(Mutex::new(sensor));

    let actuator: Box<dyn LockActuator> = match &config.lock.pwm_path {
        Some(path) => Box::new(SysfsPwmActuator::new(path)),
        None => {
            warn!("lock.pwm_path not set, using no-op actuator");
            Box::new(NullActuator)
        }
    };
    let servo = Arc::new(ServoLock::new(
        actuator,
        config.lock.unlock_angle,
        config.lock.lock_angle,
    ));
    // Boot into the known-safe state
    if let Err(e) = servo.lock().await {
        error!(error = %e, "failed to lock the door at boot");
    }

    let monitor_control = MonitorControl::new(config.monitor.enabled_on_start);
    let monitor_task = tokio::spawn(monitor::run(
        Arc::clone(&sensor),
        Arc::clone(&servo),
        monitor_control.clone(),
        config.monitor.clone(),
        config.lock.auto_lock_delay(),
    ));

    let listener = TcpListener::bind((config.api.host.as_str(), config.api.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.api.host, config.api.port))?;

    let state = Arc::new(AppState {
        sensor,
        registry,
        servo,
        monitor: monitor_control.clone(),
        config: Arc::new(config),
    });

    tokio::select! {
        result = api::serve(state, listener) => {
            if let Err(e) = result {
                error!(error = %e, "api server failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    monitor_control.set_enabled(false);
    monitor_task.abort();
    info!("system shutdown");

    Ok(())
}
