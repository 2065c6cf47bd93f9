// High-level VESC command link
//
// Combines the packet codec and a transport: encode a set-point, write it,
// retry once on a failed write, and guarantee a zero-duty stop on teardown.

use std::thread::sleep;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::error::{Result, VescError};
use super::packet::{Frame, encode_alive, encode_duty_cycle};
use super::transport::{SerialTransport, Transport};
use crate::config::{DEFAULT_TIMEOUT, RETRY_BACKOFF, WRITE_RETRIES};

/// Write policy for the link
#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    /// Extra attempts after a failed write
    pub write_retries: u32,
    /// Pause before each retry
    pub retry_backoff: Duration,
    /// Per-operation timeout handed to the serial port
    pub timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            write_retries: WRITE_RETRIES,
            retry_backoff: RETRY_BACKOFF,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Single-writer command link to one VESC
pub struct VescLink<T: Transport> {
    transport: T,
    config: LinkConfig,
    last_duty: Option<f64>,
}

impl VescLink<SerialTransport> {
    /// Open the serial device and wrap it in a link
    pub fn open(port: &str, baud_rate: u32, config: LinkConfig) -> Result<Self> {
        info!("Opening VESC link on {} at {} baud", port, baud_rate);
        let transport = SerialTransport::open(port, baud_rate, config.timeout)?;
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> VescLink<T> {
    pub fn new(transport: T, config: LinkConfig) -> Self {
        Self {
            transport,
            config,
            last_duty: None,
        }
    }

    /// Command a duty cycle in [-1.0, 1.0]
    ///
    /// Out-of-range values fail before anything is written.
    pub fn set_duty_cycle(&mut self, duty: f64) -> Result<()> {
        let frame = encode_duty_cycle(duty)?;
        debug!("Setting duty cycle {:.5}", duty);
        self.send(&frame)?;
        self.last_duty = Some(duty);
        Ok(())
    }

    /// Reset the firmware's command timeout without changing the set-point
    pub fn send_alive(&mut self) -> Result<()> {
        self.send(&encode_alive())
    }

    /// Command zero duty
    pub fn stop(&mut self) -> Result<()> {
        info!("Stopping motor");
        self.set_duty_cycle(0.0)
    }

    /// Write a frame, retrying failed writes per `LinkConfig`
    pub fn send(&mut self, frame: &Frame) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.transport.write_frame(frame.as_bytes()) {
                Ok(()) => return Ok(()),
                Err(VescError::Io(e)) if attempt < self.config.write_retries => {
                    attempt += 1;
                    warn!(
                        "Write failed ({}), retry {}/{} in {:?}",
                        e, attempt, self.config.write_retries, self.config.retry_backoff
                    );
                    sleep(self.config.retry_backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Best-effort zero-duty write followed by close
    ///
    /// Errors are logged, not returned: this runs on paths that are already
    /// reporting a failure.
    pub fn emergency_stop(&mut self) {
        if !self.transport.is_open() {
            return;
        }
        warn!("Emergency stop: commanding zero duty");
        if let Err(e) = self.set_duty_cycle(0.0) {
            error!("Emergency zero-duty write failed: {}", e);
        }
        self.close();
    }

    /// Release the transport (idempotent)
    pub fn close(&mut self) {
        if self.transport.is_open() {
            info!("Closing VESC link");
            self.transport.close();
        }
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Last duty cycle successfully written
    pub fn last_duty(&self) -> Option<f64> {
        self.last_duty
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Drop for VescLink<T> {
    fn drop(&mut self) {
        // Never leave the motor at a non-zero set-point
        self.emergency_stop();
    }
}
