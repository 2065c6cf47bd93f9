// Error types for the VESC serial link

/// Problems with the framing envelope itself
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Payload of {len} bytes does not fit in a VESC frame")]
    PayloadTooLarge { len: usize },

    #[error("Empty payload (a frame needs at least a packet id)")]
    EmptyPayload,

    #[error("Frame length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Invalid start byte: 0x{0:02X}")]
    BadStart(u8),

    #[error("Invalid end byte: 0x{0:02X}")]
    BadEnd(u8),

    #[error("Checksum mismatch: expected 0x{expected:04X}, got 0x{actual:04X}")]
    ChecksumMismatch { expected: u16, actual: u16 },
}

/// Error types for VESC communication
#[derive(Debug, thiserror::Error)]
pub enum VescError {
    #[error("Duty cycle {duty} is outside [-1.0, 1.0]")]
    OutOfRange { duty: f64 },

    #[error("Failed to open {port} at {baud_rate} baud: {source}")]
    Connection {
        port: String,
        baud_rate: u32,
        #[source]
        source: serialport::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial connection is closed")]
    Closed,

    #[error("Ramp interrupted by operator")]
    Interrupted,

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

pub type Result<T> = std::result::Result<T, VescError>;
