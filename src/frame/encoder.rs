//! # Frame Encoder
//!
//! Serializes a [`SensorReading`] back into the device's wire layout.
//!
//! The sensor never receives frames, so this is used to build replay
//! captures and test fixtures that the decoder accepts.

use bytes::{BufMut, BytesMut};

use super::crc::crc8_payload;
use super::protocol::*;

/// Encode a reading into a complete frame
///
/// The `checksum` field of `reading` is ignored; the frame always carries the
/// checksum of its own payload.
///
/// # Arguments
///
/// * `reading` - Reading to serialize
///
/// # Returns
///
/// * `RawFrame` - Complete 284-byte frame
///
/// # Examples
///
/// ```
/// use emporia_vue::frame::decoder::validate_frame;
/// use emporia_vue::frame::encoder::encode_reading;
/// use emporia_vue::frame::protocol::SensorReading;
///
/// let reading = SensorReading { is_unread: true, sequence_num: 1, ..Default::default() };
/// let frame = encode_reading(&reading);
/// assert!(validate_frame(&frame).is_ok());
/// ```
pub fn encode_reading(reading: &SensorReading) -> RawFrame {
    let mut buf = BytesMut::with_capacity(FRAME_SIZE);

    buf.put_u8(u8::from(reading.is_unread));
    buf.put_u8(0); // checksum, filled in below
    buf.put_u8(reading.unknown);
    buf.put_u8(reading.sequence_num);

    for entry in &reading.power {
        buf.put_i32_le(entry.black);
        buf.put_i32_le(entry.red);
        buf.put_i32_le(entry.blue);
    }

    for &voltage in &reading.voltage {
        buf.put_u16_le(voltage);
    }

    buf.put_u16_le(reading.frequency);

    for &degrees in &reading.degrees {
        buf.put_u16_le(degrees);
    }

    for &current in &reading.current {
        buf.put_u16_le(current);
    }

    buf.put_u16_le(reading.end);

    let mut frame = [0u8; FRAME_SIZE];
    frame.copy_from_slice(&buf);
    frame[OFFSET_CHECKSUM] = crc8_payload(&frame[FRAME_HEADER_SIZE..]);
    frame
}
