// In-memory transport: records every write, can be told to fail specific calls.
// Backs `--dry-run` and the link/ramp tests.

use std::collections::{BTreeSet, VecDeque};
use std::io;
use tracing::debug;

use super::error::{Result, VescError};
use super::transport::Transport;

/// Something that happened on the mock wire, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Write(Vec<u8>),
    Close,
}

#[derive(Debug)]
pub struct MockTransport {
    open: bool,
    events: Vec<MockEvent>,
    write_calls: usize,
    failing_calls: BTreeSet<usize>,
    fail_from: Option<usize>,
    rx: VecDeque<u8>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            open: true,
            events: Vec::new(),
            write_calls: 0,
            failing_calls: BTreeSet::new(),
            fail_from: None,
            rx: VecDeque::new(),
        }
    }

    /// Fail the given write calls (0-based, counting failed attempts too)
    pub fn failing_on(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.failing_calls.extend(calls);
        self
    }

    /// Fail every write call from `call` onwards
    pub fn failing_from(mut self, call: usize) -> Self {
        self.fail_from = Some(call);
        self
    }

    /// Queue bytes to be returned by `read`
    pub fn push_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    pub fn events(&self) -> &[MockEvent] {
        &self.events
    }

    /// Bytes of every successful write, in order
    pub fn writes(&self) -> Vec<&[u8]> {
        self.events
            .iter()
            .filter_map(|event| match event {
                MockEvent::Write(bytes) => Some(bytes.as_slice()),
                MockEvent::Close => None,
            })
            .collect()
    }

    /// Number of `write_frame` calls, including failed ones
    pub fn write_calls(&self) -> usize {
        self.write_calls
    }

    pub fn close_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, MockEvent::Close))
            .count()
    }

    fn should_fail(&self, call: usize) -> bool {
        self.failing_calls.contains(&call) || self.fail_from.is_some_and(|from| call >= from)
    }
}

impl Transport for MockTransport {
    fn write_frame(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.open {
            return Err(VescError::Closed);
        }

        let call = self.write_calls;
        self.write_calls += 1;

        if self.should_fail(call) {
            debug!("Mock write #{} failing", call);
            return Err(VescError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "mock write timed out",
            )));
        }

        debug!("Mock write #{}: {:02X?}", call, bytes);
        self.events.push(MockEvent::Write(bytes.to_vec()));
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.open {
            return Err(VescError::Closed);
        }
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn close(&mut self) {
        // Only the first close is an event; repeats are no-ops
        if self.open {
            self.open = false;
            self.events.push(MockEvent::Close);
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
