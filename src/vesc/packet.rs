// VESC serial packet codec
//
// Packet format: [Start, Length..., PacketId, Data..., CRC hi, CRC lo, 0x03]
//
// Start byte selects the width of the length field:
//   0x02 -> 1 byte, 0x03 -> 2 bytes, 0x04 -> 3 bytes (all big-endian)
// Length and CRC both cover PacketId + Data.

use crc::{CRC_16_XMODEM, Crc};

use super::error::{FrameError, Result, VescError};

/// Start bytes for short, long and huge packets
pub const START_SHORT: u8 = 0x02;
pub const START_LONG: u8 = 0x03;
pub const START_HUGE: u8 = 0x04;

/// Terminator byte
pub const END_BYTE: u8 = 0x03;

/// Duty cycle is sent as an int32 scaled by this factor
pub const DUTY_SCALE: f64 = 100_000.0;

/// Largest payload the 3-byte length field can describe
pub const MAX_PAYLOAD_LEN: usize = 0xFF_FFFF;

/// CRC-16/XMODEM: poly 0x1021, init 0, no reflection (the CCITT variant VESC firmware uses)
const CRC_VESC: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Command ids (subset of the firmware's COMM_PACKET_ID table)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommPacketId {
    SetDuty = 5,
    Alive = 30,
}

/// Compute the packet checksum over packet id + data
pub fn crc16(data: &[u8]) -> u16 {
    CRC_VESC.checksum(data)
}

/// One fully framed packet, ready to hand to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
    header_len: usize,
}

impl Frame {
    /// Wrap a payload (packet id + data) in the start/length/CRC/end envelope
    pub fn new(payload: &[u8]) -> std::result::Result<Self, FrameError> {
        match payload.len() {
            0 => Err(FrameError::EmptyPayload),
            1..=0xFF => Ok(Self::short(payload)),
            len @ 0x100..=0xFFFF => {
                Ok(Self::assemble(START_LONG, &(len as u16).to_be_bytes(), payload))
            }
            len @ 0x1_0000..=MAX_PAYLOAD_LEN => {
                Ok(Self::assemble(START_HUGE, &(len as u32).to_be_bytes()[1..], payload))
            }
            len => Err(FrameError::PayloadTooLarge { len }),
        }
    }

    /// Build a short frame; caller guarantees 1..=255 payload bytes
    fn short(payload: &[u8]) -> Self {
        debug_assert!(!payload.is_empty() && payload.len() <= 0xFF);
        Self::assemble(START_SHORT, &[payload.len() as u8], payload)
    }

    fn assemble(start: u8, length: &[u8], payload: &[u8]) -> Self {
        let header_len = 1 + length.len();
        let mut bytes = Vec::with_capacity(header_len + payload.len() + 3);

        bytes.push(start);
        bytes.extend_from_slice(length);
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(&crc16(payload).to_be_bytes());
        bytes.push(END_BYTE);

        Self { bytes, header_len }
    }

    /// Validate a complete frame received from (or captured on) the wire
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, FrameError> {
        let start = *bytes.first().ok_or(FrameError::LengthMismatch {
            expected: 1,
            actual: 0,
        })?;

        let header_len = match start {
            START_SHORT => 2,
            START_LONG => 3,
            START_HUGE => 4,
            other => return Err(FrameError::BadStart(other)),
        };

        if bytes.len() < header_len {
            return Err(FrameError::LengthMismatch {
                expected: header_len,
                actual: bytes.len(),
            });
        }

        let payload_len = bytes[1..header_len]
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);
        if payload_len == 0 {
            return Err(FrameError::EmptyPayload);
        }

        let expected = header_len + payload_len + 3;
        if bytes.len() != expected {
            return Err(FrameError::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        let end = bytes[expected - 1];
        if end != END_BYTE {
            return Err(FrameError::BadEnd(end));
        }

        let payload = &bytes[header_len..header_len + payload_len];
        let received = u16::from_be_bytes([bytes[expected - 3], bytes[expected - 2]]);
        let computed = crc16(payload);
        if received != computed {
            return Err(FrameError::ChecksumMismatch {
                expected: computed,
                actual: received,
            });
        }

        Ok(Self {
            bytes: bytes.to_vec(),
            header_len,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Packet id + data (the bytes covered by length and CRC)
    pub fn payload(&self) -> &[u8] {
        &self.bytes[self.header_len..self.bytes.len() - 3]
    }

    pub fn packet_id(&self) -> u8 {
        self.payload()[0]
    }

    /// Data bytes following the packet id
    pub fn data(&self) -> &[u8] {
        &self.payload()[1..]
    }

    pub fn checksum(&self) -> u16 {
        let n = self.bytes.len();
        u16::from_be_bytes([self.bytes[n - 3], self.bytes[n - 2]])
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Build a COMM_SET_DUTY frame
///
/// Values outside [-1.0, 1.0] (and NaN/infinite values) are rejected rather than
/// clamped, so a bad set-point surfaces at the caller instead of being attenuated.
pub fn encode_duty_cycle(duty: f64) -> Result<Frame> {
    if !duty.is_finite() || duty.abs() > 1.0 {
        return Err(VescError::OutOfRange { duty });
    }

    // `as` truncates toward zero
    let scaled = (duty * DUTY_SCALE) as i32;

    let mut payload = [0u8; 5];
    payload[0] = CommPacketId::SetDuty as u8;
    payload[1..].copy_from_slice(&scaled.to_be_bytes());

    Ok(Frame::short(&payload))
}

/// Build a COMM_ALIVE frame (resets the firmware's command timeout)
pub fn encode_alive() -> Frame {
    Frame::short(&[CommPacketId::Alive as u8])
}

/// Recover the duty cycle carried by a COMM_SET_DUTY frame
pub fn decode_duty_cycle(frame: &Frame) -> Option<f64> {
    if frame.packet_id() != CommPacketId::SetDuty as u8 {
        return None;
    }
    let data: [u8; 4] = frame.data().try_into().ok()?;
    Some(i32::from_be_bytes(data) as f64 / DUTY_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_known_answer() {
        // CRC-16/XMODEM check value
        assert_eq!(crc16(b"123456789"), 0x31C3);
        assert_eq!(crc16(&[0x05, 0x00, 0x00, 0xC3, 0x50]), 0x3AA5);
    }

    #[test]
    fn test_duty_frame_bytes() {
        let frame = encode_duty_cycle(0.5).unwrap();
        assert_eq!(
            frame.as_bytes(),
            &[0x02, 0x05, 0x05, 0x00, 0x00, 0xC3, 0x50, 0x3A, 0xA5, 0x03]
        );

        let zero = encode_duty_cycle(0.0).unwrap();
        assert_eq!(
            zero.as_bytes(),
            &[0x02, 0x05, 0x05, 0x00, 0x00, 0x00, 0x00, 0x23, 0x57, 0x03]
        );

        let full = encode_duty_cycle(1.0).unwrap();
        assert_eq!(
            full.as_bytes(),
            &[0x02, 0x05, 0x05, 0x00, 0x01, 0x86, 0xA0, 0x10, 0xB3, 0x03]
        );

        let reverse = encode_duty_cycle(-1.0).unwrap();
        assert_eq!(
            reverse.as_bytes(),
            &[0x02, 0x05, 0x05, 0xFF, 0xFE, 0x79, 0x60, 0x4E, 0xC0, 0x03]
        );
    }

    #[test]
    fn test_frame_structure() {
        let frame = encode_duty_cycle(0.5).unwrap();
        // Start (1) + Length (1) + Id (1) + Data (4) + CRC (2) + End (1) = 10 bytes
        assert_eq!(frame.len(), 10);
        assert_eq!(frame.as_bytes()[0], START_SHORT);
        assert_eq!(frame.as_bytes()[1], 5); // id + 4 data bytes
        assert_eq!(frame.packet_id(), CommPacketId::SetDuty as u8);
        assert_eq!(i32::from_be_bytes(frame.data().try_into().unwrap()), 50_000);
        assert_eq!(frame.checksum(), crc16(frame.payload()));
        assert_eq!(*frame.as_bytes().last().unwrap(), END_BYTE);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        for duty in [-1.0, -0.73, -0.1, 0.0, 0.05, 0.333, 0.5, 0.99999, 1.0] {
            assert_eq!(
                encode_duty_cycle(duty).unwrap(),
                encode_duty_cycle(duty).unwrap()
            );
        }
    }

    #[test]
    fn test_range_validation() {
        for duty in [1.5, -2.0, 1.000001, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(
                matches!(encode_duty_cycle(duty), Err(VescError::OutOfRange { .. })),
                "duty {} should be rejected",
                duty
            );
        }
        for duty in [1.0, -1.0, 0.0, -0.0] {
            assert!(encode_duty_cycle(duty).is_ok());
        }
    }

    #[test]
    fn test_scaling_recovers_duty() {
        for duty in [-0.96875, -0.5, -0.25, 0.0, 0.1, 0.123456, 0.5, 0.75, 1.0] {
            let frame = encode_duty_cycle(duty).unwrap();
            let decoded = decode_duty_cycle(&frame).unwrap();
            assert!(
                (decoded - duty).abs() <= 1e-5,
                "{} decoded as {}",
                duty,
                decoded
            );
        }
    }

    #[test]
    fn test_scaling_truncates_toward_zero() {
        let pos = encode_duty_cycle(0.123456789).unwrap();
        assert_eq!(i32::from_be_bytes(pos.data().try_into().unwrap()), 12_345);
        let neg = encode_duty_cycle(-0.123456789).unwrap();
        assert_eq!(i32::from_be_bytes(neg.data().try_into().unwrap()), -12_345);
    }

    #[test]
    fn test_alive_frame() {
        let frame = encode_alive();
        assert_eq!(frame.as_bytes(), &[0x02, 0x01, 0x1E, 0xF3, 0xFF, 0x03]);
        assert!(frame.data().is_empty());
        assert_eq!(decode_duty_cycle(&frame), None);
    }

    #[test]
    fn test_long_frame_envelope() {
        let payload = vec![0xAB; 300];
        let frame = Frame::new(&payload).unwrap();
        assert_eq!(frame.as_bytes()[0], START_LONG);
        assert_eq!(&frame.as_bytes()[1..3], &[0x01, 0x2C]); // 300
        assert_eq!(frame.len(), 1 + 2 + 300 + 2 + 1);
        assert_eq!(frame.payload(), payload.as_slice());

        let parsed = Frame::parse(frame.as_bytes()).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_huge_frame_envelope() {
        let payload = vec![0x11; 70_000];
        let frame = Frame::new(&payload).unwrap();
        assert_eq!(frame.as_bytes()[0], START_HUGE);
        assert_eq!(&frame.as_bytes()[1..4], &[0x01, 0x11, 0x70]); // 70000
        assert_eq!(frame.payload().len(), 70_000);
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert_eq!(Frame::new(&[]), Err(FrameError::EmptyPayload));
    }

    #[test]
    fn test_parse_rejects_corruption() {
        let good = encode_duty_cycle(0.25).unwrap();
        assert_eq!(Frame::parse(good.as_bytes()).unwrap(), good);

        let mut bad_crc = good.as_bytes().to_vec();
        bad_crc[4] ^= 0x01;
        assert!(matches!(
            Frame::parse(&bad_crc),
            Err(FrameError::ChecksumMismatch { .. })
        ));

        let mut bad_end = good.as_bytes().to_vec();
        *bad_end.last_mut().unwrap() = 0x00;
        assert_eq!(Frame::parse(&bad_end), Err(FrameError::BadEnd(0x00)));

        let mut bad_start = good.as_bytes().to_vec();
        bad_start[0] = 0x7E;
        assert_eq!(Frame::parse(&bad_start), Err(FrameError::BadStart(0x7E)));

        assert_eq!(
            Frame::parse(&good.as_bytes()[..6]),
            Err(FrameError::LengthMismatch {
                expected: 10,
                actual: 6
            })
        );
        assert!(Frame::parse(&[]).is_err());
    }
}
