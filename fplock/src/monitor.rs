//! Background identification loop
//!
//! One long-lived task polls the sensor and unlocks the door on a match.
//! The control handle carries two pieces of state: the user-facing enabled
//! flag and the gate the loop actually blocks on. Exclusive device
//! operations close the gate for the duration of a suspend guard; the guard
//! reopens it to whatever the enabled flag says on every exit path.
//!
//! Device access itself is serialized by the async mutex around the engine,
//! so the gate is a scheduling courtesy, not the safety mechanism.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use fplock_types::{IdentifyOutcome, LockState, MonitorStatus};

use crate::config::MonitorConfig;
use crate::sensor::Sensor;
use crate::servo::ServoLock;

/// Shared control handle for the monitoring loop
#[derive(Clone)]
pub struct MonitorControl {
    inner: Arc<Shared>,
}

struct Shared {
    /// User intent, toggled by the monitoring API
    should_run: AtomicBool,

    /// Gate the loop blocks on; false while suspended or disabled
    gate: watch::Sender<bool>,
}

impl MonitorControl {
    pub fn new(enabled: bool) -> Self {
        let (gate, _) = watch::channel(enabled);

        Self {
            inner: Arc::new(Shared {
                should_run: AtomicBool::new(enabled),
                gate,
            }),
        }
    }

    /// Toggle monitoring on or off (the API's start/stop)
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.should_run.store(enabled, Ordering::Release);
        self.inner.gate.send_replace(enabled);
        info!(enabled, "monitoring toggled");
    }

    /// User-facing enabled flag
    pub fn enabled(&self) -> bool {
        self.inner.should_run.load(Ordering::Acquire)
    }

    /// Whether the loop is currently allowed to scan
    pub fn gate_open(&self) -> bool {
        *self.inner.gate.borrow()
    }

    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            enabled: self.enabled(),
            active: self.gate_open(),
        }
    }

    /// Close the gate for an exclusive device operation
    ///
    /// The returned guard reopens the gate to the current enabled flag when
    /// dropped, so a stop issued during the exclusive operation sticks, and
    /// a handler failure can never leave monitoring wedged shut.
    pub fn suspend(&self) -> SuspendGuard {
        self.inner.gate.send_replace(false);
        debug!("monitoring suspended for exclusive operation");

        SuspendGuard {
            control: self.clone(),
        }
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.gate.subscribe()
    }
}

/// Scoped monitoring suspension; restores state on drop
pub struct SuspendGuard {
    control: MonitorControl,
}

impl Drop for SuspendGuard {
    fn drop(&mut self) {
        let enabled = self.control.enabled();
        self.control.inner.gate.send_replace(enabled);
        debug!(resumed = enabled, "monitoring suspension released");
    }
}

/// Run the monitoring loop until the control handle is dropped
///
/// Protocol failures are recoverable by design: log, back off, keep going.
pub async fn run(
    sensor: Arc<Mutex<Sensor>>,
    servo: Arc<ServoLock>,
    control: MonitorControl,
    config: MonitorConfig,
    auto_lock_delay: Duration,
) {
    info!("fingerprint monitoring task started");
    let mut gate = control.subscribe();

    loop {
        if gate.wait_for(|open| *open).await.is_err() {
            info!("monitor control dropped, stopping");
            return;
        }

        let result = { sensor.lock().await.identify().await };

        match result {
            Ok(IdentifyOutcome::Matched { slot, name, .. }) => {
                info!(
                    slot,
                    name = name.as_deref().unwrap_or("<unregistered>"),
                    "match, unlocking door"
                );

                match servo.unlock().await {
                    Err(e) => error!(error = %e, "unlock failed"),
                    Ok(_) => {
                        tokio::time::sleep(auto_lock_delay).await;

                        // Re-lock only if nothing else touched the state in
                        // the meantime
                        if control.gate_open() && servo.state() == LockState::Unlocked {
                            match servo.lock().await {
                                Ok(_) => info!("door auto-locked"),
                                Err(e) => error!(error = %e, "auto-lock failed"),
                            }
                        } else {
                            info!("state changed during unlock window, not auto-locking");
                        }
                    }
                }
            }
            Ok(IdentifyOutcome::NoMatch) => {}
            Err(e) => {
                warn!(error = %e, "identification failed, backing off");
                tokio::time::sleep(config.error_backoff()).await;
            }
        }

        tokio::time::sleep(config.poll_delay()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_initial_state() {
        let control = MonitorControl::new(true);
        assert_eq!(
            control.status(),
            MonitorStatus {
                enabled: true,
                active: true
            }
        );

        let control = MonitorControl::new(false);
        assert_eq!(
            control.status(),
            MonitorStatus {
                enabled: false,
                active: false
            }
        );
    }

    #[test]
    fn test_suspend_restores_prior_state() {
        let control = MonitorControl::new(true);

        {
            let _guard = control.suspend();
            assert!(!control.gate_open());
            assert!(control.enabled(), "suspension must not touch the enabled flag");
        }

        assert!(control.gate_open());
        assert!(control.enabled());
    }

    #[test]
    fn test_stop_during_suspension_sticks() {
        let control = MonitorControl::new(true);

        {
            let _guard = control.suspend();
            control.set_enabled(false);
        }

        // The guard restored to the *current* enabled flag, not a snapshot
        assert!(!control.enabled());
        assert!(!control.gate_open());
    }

    #[test]
    fn test_start_while_disabled_and_suspended() {
        let control = MonitorControl::new(false);

        {
            let _guard = control.suspend();
            control.set_enabled(true);
        }

        assert!(control.enabled());
        assert!(control.gate_open());
    }

    #[test]
    fn test_enabled_flag_preserved_across_failing_handler() {
        let control = MonitorControl::new(true);
        let before = control.enabled();

        let result: Result<(), &str> = (|| {
            let _guard = control.suspend();
            Err("handler failed")
        })();

        assert!(result.is_err());
        assert_eq!(control.enabled(), before);
        assert!(control.gate_open());
    }

    mod loop_behaviour {
        use super::*;
        use pretty_assertions::assert_eq;
        use crate::registry::Registry;
        use crate::sensor::tests::ack_frame;
        use crate::servo::{LockActuator, ServoLock};
        use async_trait::async_trait;
        use fplock_transport::MockTransport;
        use std::path::PathBuf;

        struct RecordingActuator {
            angles: Arc<parking_lot::Mutex<Vec<u16>>>,
        }

        #[async_trait]
        impl LockActuator for RecordingActuator {
            async fn move_to(&mut self, angle: u16) -> crate::servo::Result<()> {
                self.angles.lock().push(angle);
                Ok(())
            }
        }

        fn temp_registry() -> Arc<Registry> {
            let path: PathBuf = std::env::temp_dir().join(format!(
                "fplock-monitor-test-{}-{:?}.json",
                std::process::id(),
                std::thread::current().id()
            ));
            Arc::new(Registry::load(path))
        }

        #[tokio::test]
        async fn test_match_unlocks_then_auto_locks() {
            let (transport, handle) = MockTransport::new();
            let registry = temp_registry();
            registry.insert(5, "alice");

            // One matched identify plus its LED ack; the script then runs
            // dry, so later polls see timeouts and back off
            handle.push_frame(ack_frame(0x00, [0x00, 0x00, 0x05, 0x00, 0x64]));
            handle.push_frame(ack_frame(0x00, []));

            let sensor = Arc::new(Mutex::new(
                Sensor::new(Box::new(transport), 0xFFFF_FFFF, registry)
                    .with_read_timeout(Duration::from_millis(5)),
            ));

            let angles = Arc::new(parking_lot::Mutex::new(Vec::new()));
            let servo = Arc::new(ServoLock::new(
                Box::new(RecordingActuator {
                    angles: Arc::clone(&angles),
                }),
                145,
                0,
            ));

            let control = MonitorControl::new(true);
            let config = MonitorConfig {
                enabled_on_start: true,
                poll_delay_ms: 1,
                error_backoff_ms: 50,
            };

            let task = tokio::spawn(run(
                sensor,
                Arc::clone(&servo),
                control.clone(),
                config,
                Duration::from_millis(1),
            ));

            tokio::time::sleep(Duration::from_millis(100)).await;
            task.abort();

            // Unlock to 145, auto-lock back to 0
            assert_eq!(angles.lock().as_slice(), &[145, 0]);
            assert_eq!(servo.state(), LockState::Locked);
        }
    }
}
