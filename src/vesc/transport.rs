// Serial byte-stream transport for the VESC link
//
// No protocol knowledge lives here: frames arrive as finished byte slices.

use serialport::{self, SerialPort, SerialPortInfo};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::debug;

use super::error::{Result, VescError};

/// A byte sink/source the link can drive
///
/// Implementations are used from a single execution context; none of them
/// synchronize internally.
pub trait Transport {
    /// Write every byte and flush; blocks until queued or the write times out
    fn write_frame(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read whatever is available within the timeout; `Ok(0)` on timeout
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Release the underlying handle (idempotent)
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Transport backed by an OS serial device
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

impl SerialTransport {
    /// Open the device at `port_name`; `timeout` bounds every read and write
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let connection_error = |source| VescError::Connection {
            port: port_name.to_string(),
            baud_rate,
            source,
        };

        if baud_rate == 0 {
            return Err(connection_error(serialport::Error::new(
                serialport::ErrorKind::InvalidInput,
                "baud rate must be non-zero",
            )));
        }

        let port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(connection_error)?;

        debug!("Opened {} at {} baud", port_name, baud_rate);
        Ok(Self {
            port: Some(port),
            name: port_name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Transport for SerialTransport {
    fn write_frame(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(VescError::Closed)?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let port = self.port.as_mut().ok_or(VescError::Closed)?;
        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(VescError::Io(e)),
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Closed {}", self.name);
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

/// Enumerate serial devices visible to the OS
pub fn list_ports() -> std::result::Result<Vec<SerialPortInfo>, serialport::Error> {
    serialport::available_ports()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device_is_connection_error() {
        let result = SerialTransport::open(
            "/dev/this-device-does-not-exist",
            115_200,
            Duration::from_millis(100),
        );
        match result {
            Err(VescError::Connection {
                port, baud_rate, ..
            }) => {
                assert_eq!(port, "/dev/this-device-does-not-exist");
                assert_eq!(baud_rate, 115_200);
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("opening a missing device should fail"),
        }
    }

    #[test]
    fn test_zero_baud_rejected() {
        let result = SerialTransport::open("/dev/ttyACM1", 0, Duration::from_millis(100));
        assert!(matches!(
            result,
            Err(VescError::Connection { baud_rate: 0, .. })
        ));
    }
}
