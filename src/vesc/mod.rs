// VESC serial command link
//
// Provides:
// - VESC packet framing (start/length/CRC-16/end) and command encoding
// - Serial transport over the serialport crate, plus an in-memory mock
// - High-level link with write retry and zero-duty shutdown

mod error;
mod link;
pub mod mock;
pub mod packet;
pub mod transport;

pub use error::{FrameError, Result, VescError};
pub use link::{LinkConfig, VescLink};
pub use mock::{MockEvent, MockTransport};
pub use packet::{CommPacketId, Frame, decode_duty_cycle, encode_alive, encode_duty_cycle};
pub use transport::{SerialTransport, Transport, list_ports};
