//! # Frame Checksum
//!
//! CRC-8 checksum used by the Vue sensor co-processor.
//!
//! **Polynomial**: 0x07 (x^8 + x^2 + x + 1)
//! **Initial Value**: 0x00
//! **Final XOR**: 0x06
//!
//! The checksum covers the frame payload only, i.e. everything after the
//! two header bytes (`is_unread` and `checksum`).

/// CRC-8 polynomial
const CRC8_POLY: u8 = 0x07;

/// Value XORed into the CRC after the last payload byte
const CRC8_FINAL_XOR: u8 = 0x06;

/// Precomputed CRC8 lookup table for fast calculation
const CRC8_TABLE: [u8; 256] = generate_crc8_table();

/// Generate CRC8 lookup table at compile time
const fn generate_crc8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate the frame checksum over a payload using the lookup table
///
/// # Arguments
///
/// * `payload` - Frame bytes after the 2-byte header
///
/// # Returns
///
/// * `u8` - Expected value of the frame's `checksum` field
///
/// # Examples
///
/// ```
/// use emporia_vue::frame::crc::crc8_payload;
///
/// let crc = crc8_payload(b"123456789");
/// assert_eq!(crc, 0xF2);
/// ```
pub fn crc8_payload(payload: &[u8]) -> u8 {
    let mut crc: u8 = 0;

    for &byte in payload {
        crc = CRC8_TABLE[(byte ^ crc) as usize];
    }

    crc ^ CRC8_FINAL_XOR
}

/// Calculate the frame checksum bit by bit (slow, for verification)
#[allow(dead_code)]
fn crc8_payload_slow(payload: &[u8]) -> u8 {
    let mut crc: u8 = 0;

    for &byte in payload {
        crc ^= byte;

        for _ in 0..8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc ^ CRC8_FINAL_XOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc8_empty_payload_is_final_xor() {
        assert_eq!(crc8_payload(&[]), CRC8_FINAL_XOR);
    }

    #[test]
    fn test_crc8_table_matches_device_table() {
        // Spot checks against the table shipped in the device firmware
        assert_eq!(CRC8_TABLE[0x00], 0x00);
        assert_eq!(CRC8_TABLE[0x01], 0x07);
        assert_eq!(CRC8_TABLE[0x02], 0x0E);
        assert_eq!(CRC8_TABLE[0x10], 0x70);
        assert_eq!(CRC8_TABLE[0x40], 0xC7);
        assert_eq!(CRC8_TABLE[0x80], 0x89);
        assert_eq!(CRC8_TABLE[0xD0], 0x3E);
        assert_eq!(CRC8_TABLE[0xFF], 0xF3);
    }

    #[test]
    fn test_crc8_check_value() {
        // CRC-8/SMBUS check value is 0xF4, plus the device's final XOR
        assert_eq!(crc8_payload(b"123456789"), 0xF4 ^ 0x06);
    }

    #[test]
    fn test_crc8_lookup_table_matches_slow() {
        let test_data = [
            vec![0x01, 0x02, 0x03],
            vec![0xFF, 0xFE, 0xFD],
            vec![0x00, 0x2A, 0x10, 0x00, 0xE8, 0x03],
            vec![0x00; 282],
            vec![0xFF; 10],
        ];

        for data in test_data.iter() {
            assert_eq!(
                crc8_payload(data),
                crc8_payload_slow(data),
                "CRC mismatch for data: {:?}",
                data
            );
        }
    }

    #[test]
    fn test_crc8_is_deterministic() {
        let data: Vec<u8> = (0..=255u8).collect();
        assert_eq!(crc8_payload(&data), crc8_payload(&data));
    }

    #[test]
    fn test_crc8_detects_every_single_bit_flip() {
        let data: Vec<u8> = (0..64u8).map(|b| b.wrapping_mul(37)).collect();
        let reference = crc8_payload(&data);

        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut corrupted = data.clone();
                corrupted[byte] ^= 1 << bit;
                assert_ne!(
                    crc8_payload(&corrupted),
                    reference,
                    "flip of bit {} in byte {} went undetected",
                    bit,
                    byte
                );
            }
        }
    }
}
