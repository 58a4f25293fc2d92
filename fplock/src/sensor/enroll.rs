//! Enrollment state machine
//!
//! PS_AutoEnroll elicits a bounded sequence of acknowledgements, each
//! carrying a (phase, step) status pair. Every non-terminal ack becomes a
//! progress event on the caller's channel; the channel is bounded at one
//! event so nothing is buffered beyond the step in flight.

use bytes::{BufMut, BytesMut};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use fplock_core::{
    confirm,
    constants::enroll_phase::{
        ACCEPTED, AWAITING_FINGER, DUP_CHECK, DUP_CHECK_SUB, EXTRACTING, LIFT_CONFIRMED, MERGING,
        MERGING_SUB, STORED, STORED_SUB,
    },
    Command, EnrollFlags, Error as CoreError, Packet,
};
use fplock_types::EnrollEvent;

use crate::cancel::CancelToken;
use crate::sensor::Sensor;

impl Sensor {
    /// Enroll a new fingerprint into `slot`
    ///
    /// Emits one event per device acknowledgement and exactly one terminal
    /// event (`Success`, `Cancelled` or `Error`). The slot/name pair is
    /// committed to the registry only on the stored-template transition.
    /// The cancel token is checked before each acknowledgement read; it
    /// cannot interrupt a read already in flight.
    pub async fn enroll(
        &mut self,
        slot: u16,
        name: &str,
        cancel: CancelToken,
        events: mpsc::Sender<EnrollEvent>,
    ) {
        info!(slot, name, "starting enrollment");

        if slot >= self.capacity {
            let err = CoreError::SlotOutOfRange {
                slot,
                capacity: self.capacity,
            };
            emit(
                &events,
                EnrollEvent::Error {
                    message: err.to_string(),
                    code: None,
                },
            )
            .await;
            return;
        }

        let total = self.enroll_count;

        let mut params = BytesMut::with_capacity(5);
        params.put_u16(slot);
        params.put_u8(total);
        params.put_u16(EnrollFlags::daemon_default().bits());

        let packet = Packet::command(self.address, Command::AutoEnroll, &params);
        if let Err(e) = self.send_packet(&packet).await {
            emit(
                &events,
                EnrollEvent::Error {
                    message: e.to_string(),
                    code: None,
                },
            )
            .await;
            return;
        }

        // Initial ack + three acks per capture + merge, dup-check, store.
        // A module that keeps acking without ever reaching a terminal state
        // must not hold the device forever.
        let max_expected_acks = 1 + 3 * total as usize + 3;

        for _ in 0..max_expected_acks {
            if cancel.is_cancelled() {
                info!(slot, "enrollment cancelled");
                emit(
                    &events,
                    EnrollEvent::Cancelled {
                        message: "Enrollment process cancelled.".to_string(),
                    },
                )
                .await;
                return;
            }

            let (code, resp) = match self.read_ack().await {
                Ok(ack) => ack,
                Err(e) => {
                    warn!(slot, error = %e, "enrollment read failed");
                    emit(
                        &events,
                        EnrollEvent::Error {
                            message: e.to_string(),
                            code: e.device_code(),
                        },
                    )
                    .await;
                    return;
                }
            };

            if code != confirm::SUCCESS {
                let message = confirm::message(code);
                warn!(
                    slot,
                    code = format!("0x{code:02X}"),
                    message,
                    "enrollment rejected by module"
                );
                emit(
                    &events,
                    EnrollEvent::Error {
                        message,
                        code: Some(code),
                    },
                )
                .await;
                return;
            }

            let phase = resp.first().copied().unwrap_or(0);
            let step = resp.get(1).copied().unwrap_or(0);

            if (AWAITING_FINGER..=LIFT_CONFIRMED).contains(&phase) && step > total {
                emit(
                    &events,
                    EnrollEvent::Error {
                        message: format!(
                            "capture index {step} exceeds configured count {total}"
                        ),
                        code: None,
                    },
                )
                .await;
                return;
            }

            if phase == STORED && step == STORED_SUB {
                self.registry.insert(slot, name);
                info!(slot, name, "enrollment successful");
                emit(
                    &events,
                    EnrollEvent::Success {
                        message: format!("Enrollment successful for slot {slot} ({name})."),
                        id: slot,
                    },
                )
                .await;
                return;
            }

            if !emit(&events, progress_event(phase, step, total)).await {
                // Consumer hung up; there is nobody left to report to
                return;
            }
        }

        let err = CoreError::Protocol(
            "enrollment did not complete within the expected acknowledgement count".to_string(),
        );
        warn!(slot, "enrollment exceeded its expected acknowledgement count");
        emit(
            &events,
            EnrollEvent::Error {
                message: err.to_string(),
                code: None,
            },
        )
        .await;
    }
}

fn progress_event(phase: u8, step: u8, total: u8) -> EnrollEvent {
    let message = match (phase, step) {
        (ACCEPTED, 0) => format!("Command accepted. Place finger for capture 1/{total}."),
        (AWAITING_FINGER, n) => format!("Place finger for capture {n}/{total}."),
        (EXTRACTING, n) => format!("Generating features for capture {n}/{total}."),
        (LIFT_CONFIRMED, n) => format!("Capture {n} successful. Lift finger."),
        (MERGING, MERGING_SUB) => "Merging features to create template...".to_string(),
        (DUP_CHECK, DUP_CHECK_SUB) => {
            "Checking if fingerprint is already registered...".to_string()
        }
        (p1, p2) => format!("Enrollment step ongoing (P1=0x{p1:02X}, P2=0x{p2:02X})."),
    };

    let in_capture_cycle =
        (AWAITING_FINGER..=LIFT_CONFIRMED).contains(&phase) && step >= 1 && step <= total;

    EnrollEvent::Progress {
        message,
        code: confirm::SUCCESS,
        param1: phase,
        param2: step,
        current_capture: in_capture_cycle.then_some(step),
        total_captures: total,
    }
}

/// Send an event, reporting whether anyone is still listening
async fn emit(events: &mpsc::Sender<EnrollEvent>, event: EnrollEvent) -> bool {
    if events.send(event).await.is_err() {
        debug!("enrollment event consumer dropped");
        return false;
    }
    true
}
