//! Scripted in-memory transport for protocol tests
//!
//! Tests queue the byte stream the "device" will produce and inspect the
//! frames the engine sent. An exhausted script behaves like a silent device:
//! reads past the end time out.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use crate::{error::*, Transport};

#[derive(Default)]
struct MockState {
    incoming: VecDeque<u8>,
    sent: Vec<Bytes>,
    connected: bool,
}

/// Test-side handle: scripts responses, inspects sent frames
#[derive(Clone, Default)]
pub struct MockHandle {
    inner: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// Queue bytes the next reads will return (typically one encoded frame)
    pub fn push_frame(&self, frame: impl AsRef<[u8]>) {
        self.inner
            .lock()
            .unwrap()
            .incoming
            .extend(frame.as_ref().iter().copied());
    }

    /// Frames the engine has sent so far
    pub fn sent(&self) -> Vec<Bytes> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Number of unread scripted bytes
    pub fn remaining(&self) -> usize {
        self.inner.lock().unwrap().incoming.len()
    }
}

/// Engine-side scripted transport
pub struct MockTransport {
    inner: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a connected transport plus its scripting handle
    pub fn new() -> (Self, MockHandle) {
        let inner = Arc::new(Mutex::new(MockState {
            connected: true,
            ..MockState::default()
        }));

        let handle = MockHandle {
            inner: Arc::clone(&inner),
        };

        (Self { inner }, handle)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<()> {
        self.inner.lock().unwrap().connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.inner.lock().unwrap().connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.lock().unwrap().connected
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        if !state.connected {
            return Err(Error::NotConnected);
        }
        state.sent.push(Bytes::copy_from_slice(data));
        Ok(())
    }

    async fn read_exact(&mut self, n: usize, _deadline: Duration) -> Result<BytesMut> {
        let mut state = self.inner.lock().unwrap();
        if !state.connected {
            return Err(Error::NotConnected);
        }

        if state.incoming.len() < n {
            // Script exhausted: the device went silent
            state.incoming.clear();
            return Err(Error::ReadTimeout);
        }

        let mut buf = BytesMut::with_capacity(n);
        for _ in 0..n {
            buf.extend_from_slice(&[state.incoming.pop_front().unwrap()]);
        }

        Ok(buf)
    }

    fn remote_addr(&self) -> String {
        "mock".to_string()
    }
}
