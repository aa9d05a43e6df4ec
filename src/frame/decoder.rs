//! # Frame Decoder
//!
//! Decodes and validates raw sensor frames.

use bytes::Buf;
use thiserror::Error;

use super::crc::crc8_payload;
use super::protocol::*;

/// Reason a frame was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameRejection {
    /// Trailing marker is not zero, the frame is misaligned or corrupt
    #[error("malformed reading, should end in null bytes but is {end}")]
    Malformed { end: u16 },

    /// The device has not produced a new reading since the last poll
    #[error("reading is marked as already read")]
    Stale,

    /// Checksum does not match the payload
    #[error("bad checksum {actual:02x}, expected {expected:02x}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

impl FrameRejection {
    /// Whether this rejection is unexpected and worth reporting at error level.
    ///
    /// Stale readings and checksum mismatches happen during normal operation.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, FrameRejection::Malformed { .. })
    }
}

/// Extract all fields of a frame without validating it
///
/// # Arguments
///
/// * `frame` - Complete raw frame
///
/// # Returns
///
/// * `SensorReading` - Decoded fields
pub fn decode_reading(frame: &RawFrame) -> SensorReading {
    let mut buf = &frame[..];
    let mut reading = SensorReading::default();

    reading.is_unread = buf.get_u8() != 0;
    reading.checksum = buf.get_u8();
    reading.unknown = buf.get_u8();
    reading.sequence_num = buf.get_u8();

    for entry in reading.power.iter_mut() {
        entry.black = buf.get_i32_le();
        entry.red = buf.get_i32_le();
        entry.blue = buf.get_i32_le();
    }

    for voltage in reading.voltage.iter_mut() {
        *voltage = buf.get_u16_le();
    }

    reading.frequency = buf.get_u16_le();

    for degrees in reading.degrees.iter_mut() {
        *degrees = buf.get_u16_le();
    }

    for current in reading.current.iter_mut() {
        *current = buf.get_u16_le();
    }

    reading.end = buf.get_u16_le();

    debug_assert!(!buf.has_remaining());
    reading
}

/// Decode a frame and check it is a fresh, intact reading
///
/// Checks run in order and stop at the first failure:
///
/// 1. trailing marker must be zero
/// 2. reading must be marked unread
/// 3. checksum must match the payload
///
/// # Arguments
///
/// * `frame` - Complete raw frame
///
/// # Returns
///
/// * `Result<SensorReading, FrameRejection>` - Validated reading, or the
///   first check that failed
///
/// # Examples
///
/// ```
/// use emporia_vue::frame::decoder::{validate_frame, FrameRejection};
/// use emporia_vue::frame::protocol::FRAME_SIZE;
///
/// let frame = [0u8; FRAME_SIZE];
/// assert_eq!(validate_frame(&frame), Err(FrameRejection::Stale));
/// ```
pub fn validate_frame(frame: &RawFrame) -> Result<SensorReading, FrameRejection> {
    let reading = decode_reading(frame);

    if reading.end != 0 {
        return Err(FrameRejection::Malformed { end: reading.end });
    }

    if !reading.is_unread {
        return Err(FrameRejection::Stale);
    }

    let expected = crc8_payload(&frame[FRAME_HEADER_SIZE..]);
    if reading.checksum != expected {
        return Err(FrameRejection::ChecksumMismatch {
            expected,
            actual: reading.checksum,
        });
    }

    Ok(reading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encoder::encode_reading;

    fn sample_reading() -> SensorReading {
        let mut reading = SensorReading {
            is_unread: true,
            sequence_num: 42,
            voltage: [5421, 5433, 12],
            frequency: 10582,
            degrees: [180, 0],
            ..SensorReading::default()
        };
        reading.power[0] = PowerEntry {
            black: 1000,
            red: -250,
            blue: 7,
        };
        reading.power[18] = PowerEntry {
            black: i32::MIN,
            red: i32::MAX,
            blue: -1,
        };
        reading.current[0] = 321;
        reading.current[18] = u16::MAX;
        reading
    }

    #[test]
    fn test_decode_fields_at_documented_offsets() {
        let mut frame = [0u8; FRAME_SIZE];
        frame[OFFSET_IS_UNREAD] = 1;
        frame[OFFSET_SEQUENCE_NUM] = 7;
        frame[OFFSET_POWER..OFFSET_POWER + 4].copy_from_slice(&1234i32.to_le_bytes());
        frame[OFFSET_POWER + 4..OFFSET_POWER + 8].copy_from_slice(&(-5i32).to_le_bytes());
        frame[OFFSET_VOLTAGE + 2..OFFSET_VOLTAGE + 4].copy_from_slice(&5500u16.to_le_bytes());
        frame[OFFSET_CURRENT + 6..OFFSET_CURRENT + 8].copy_from_slice(&77u16.to_le_bytes());

        let reading = decode_reading(&frame);
        assert!(reading.is_unread);
        assert_eq!(reading.sequence_num, 7);
        assert_eq!(reading.power[0].black, 1234);
        assert_eq!(reading.power[0].red, -5);
        assert_eq!(reading.voltage[WireColor::Red.index()], 5500);
        assert_eq!(reading.current[3], 77);
        assert_eq!(reading.end, 0);
    }

    #[test]
    fn test_validate_accepts_encoded_reading() {
        let reading = sample_reading();
        let frame = encode_reading(&reading);

        let decoded = validate_frame(&frame).expect("frame should validate");
        assert_eq!(decoded.sequence_num, 42);
        assert_eq!(decoded.power[0], reading.power[0]);
        assert_eq!(decoded.power[18], reading.power[18]);
        assert_eq!(decoded.voltage, reading.voltage);
        assert_eq!(decoded.current, reading.current);
        assert_eq!(decoded.frequency, 10582);
    }

    #[test]
    fn test_non_zero_end_is_malformed_even_with_good_checksum() {
        let reading = SensorReading {
            end: 0x0101,
            ..sample_reading()
        };
        // The encoder computes a matching checksum over the bad marker
        let frame = encode_reading(&reading);

        assert_eq!(
            validate_frame(&frame),
            Err(FrameRejection::Malformed { end: 0x0101 })
        );
    }

    #[test]
    fn test_non_zero_end_takes_priority_over_stale() {
        let mut frame = [0u8; FRAME_SIZE];
        frame[OFFSET_END] = 1;

        let result = validate_frame(&frame);
        assert_eq!(result, Err(FrameRejection::Malformed { end: 1 }));
        assert!(result.unwrap_err().is_error());
    }

    #[test]
    fn test_read_flag_cleared_is_stale() {
        let reading = SensorReading {
            is_unread: false,
            ..sample_reading()
        };
        let frame = encode_reading(&reading);

        let result = validate_frame(&frame);
        assert_eq!(result, Err(FrameRejection::Stale));
        assert!(!result.unwrap_err().is_error());
    }

    #[test]
    fn test_stale_takes_priority_over_checksum() {
        let mut frame = encode_reading(&SensorReading {
            is_unread: false,
            ..sample_reading()
        });
        frame[OFFSET_CHECKSUM] ^= 0xFF;

        assert_eq!(validate_frame(&frame), Err(FrameRejection::Stale));
    }

    #[test]
    fn test_corrupt_checksum_byte_is_rejected() {
        let mut frame = encode_reading(&sample_reading());
        let good = frame[OFFSET_CHECKSUM];
        frame[OFFSET_CHECKSUM] = good.wrapping_add(1);

        assert_eq!(
            validate_frame(&frame),
            Err(FrameRejection::ChecksumMismatch {
                expected: good,
                actual: good.wrapping_add(1),
            })
        );
    }

    #[test]
    fn test_single_payload_bit_flip_is_rejected() {
        let frame = encode_reading(&sample_reading());

        // Stay clear of the end marker so the checksum is what catches it
        for offset in FRAME_HEADER_SIZE..OFFSET_END {
            let mut corrupted = frame;
            corrupted[offset] ^= 0x10;
            assert!(
                matches!(
                    validate_frame(&corrupted),
                    Err(FrameRejection::ChecksumMismatch { .. })
                ),
                "corruption at offset {} was not detected",
                offset
            );
        }
    }

    #[test]
    fn test_header_is_not_covered_by_checksum() {
        let mut frame = encode_reading(&sample_reading());
        // Any non-zero value counts as unread
        frame[OFFSET_IS_UNREAD] = 0x80;

        assert!(validate_frame(&frame).is_ok());
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            FrameRejection::Malformed { end: 3 }.to_string(),
            "malformed reading, should end in null bytes but is 3"
        );
        assert_eq!(
            FrameRejection::ChecksumMismatch {
                expected: 0x0a,
                actual: 0xff
            }
            .to_string(),
            "bad checksum ff, expected 0a"
        );
    }
}
