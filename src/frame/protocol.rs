//! # Frame Protocol Constants and Types
//!
//! Core definitions for the binary reading the Vue sensor co-processor
//! exposes on every poll.
//!
//! ## Frame Layout
//!
//! All multi-byte fields are little-endian and the structure is packed.
//!
//! | Offset | Size | Field |
//! |-------:|-----:|-------|
//! | 0 | 1 | `is_unread` |
//! | 1 | 1 | `checksum` |
//! | 2 | 1 | `unknown` |
//! | 3 | 1 | `sequence_num` |
//! | 4 | 228 | `power[19]` (black, red, blue as `i32`) |
//! | 232 | 6 | `voltage[3]` |
//! | 238 | 2 | `frequency` |
//! | 240 | 4 | `degrees[2]` |
//! | 244 | 38 | `current[19]` |
//! | 282 | 2 | `end` |

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Total frame size in bytes
pub const FRAME_SIZE: usize = 284;

/// Header bytes excluded from the checksum (`is_unread`, `checksum`)
pub const FRAME_HEADER_SIZE: usize = 2;

/// Number of voltage input wires
pub const NUM_WIRES: usize = 3;

/// Number of CT clamp ports
pub const NUM_CT_PORTS: usize = 19;

/// Number of mains clamp ports (A, B, C) at the start of the port range
pub const NUM_MAINS_PORTS: u8 = 3;

/// Bytes per power entry (three `i32`)
pub const POWER_ENTRY_SIZE: usize = 12;

pub const OFFSET_IS_UNREAD: usize = 0;
pub const OFFSET_CHECKSUM: usize = 1;
pub const OFFSET_UNKNOWN: usize = 2;
pub const OFFSET_SEQUENCE_NUM: usize = 3;
pub const OFFSET_POWER: usize = 4;
pub const OFFSET_VOLTAGE: usize = OFFSET_POWER + NUM_CT_PORTS * POWER_ENTRY_SIZE;
pub const OFFSET_FREQUENCY: usize = OFFSET_VOLTAGE + NUM_WIRES * 2;
pub const OFFSET_DEGREES: usize = OFFSET_FREQUENCY + 2;
pub const OFFSET_CURRENT: usize = OFFSET_DEGREES + 2 * 2;
pub const OFFSET_END: usize = OFFSET_CURRENT + NUM_CT_PORTS * 2;

/// Power correction divisor for the mains clamps (ports A, B, C)
pub const MAINS_CORRECTION_FACTOR: f32 = 5.5;

/// Power correction divisor for the branch circuit clamps (ports 1-16)
pub const BRANCH_CORRECTION_FACTOR: f32 = 22.0;

/// Raw frame buffer as read from the bus
pub type RawFrame = [u8; FRAME_SIZE];

/// Input wire a phase's voltage is sampled on.
///
/// The discriminant is the wire's index into [`SensorReading::voltage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireColor {
    #[serde(alias = "BLACK")]
    Black = 0,
    #[serde(alias = "RED")]
    Red = 1,
    #[serde(alias = "BLUE")]
    Blue = 2,
}

impl WireColor {
    /// All wire colors in frame order.
    pub const ALL: [WireColor; NUM_WIRES] = [WireColor::Black, WireColor::Red, WireColor::Blue];

    /// Index of this wire in the frame's voltage array.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for WireColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WireColor::Black => "BLACK",
            WireColor::Red => "RED",
            WireColor::Blue => "BLUE",
        };
        f.write_str(name)
    }
}

/// CT clamp port, i.e. the index into the frame's power and current arrays.
///
/// Ports 0-2 are the mains clamps labelled `A`, `B` and `C` on the device;
/// ports 3-18 are the branch circuit clamps labelled `1` to `16`.
///
/// # Examples
///
/// ```
/// use emporia_vue::frame::protocol::CtPort;
///
/// let port: CtPort = "B".parse().unwrap();
/// assert_eq!(port.index(), 1);
///
/// let port: CtPort = "16".parse().unwrap();
/// assert_eq!(port.index(), 18);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct CtPort(u8);

impl CtPort {
    /// Creates a port from a raw array index.
    ///
    /// The index is not range checked; use [`CtPort::from_str`] for
    /// user-supplied labels.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Raw index into the frame's power and current arrays.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this port is one of the mains clamps (A, B, C).
    #[must_use]
    pub fn is_mains(self) -> bool {
        self.0 < NUM_MAINS_PORTS
    }

    /// Whether this port exists in the frame.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.index() < NUM_CT_PORTS
    }

    /// Divisor converting raw power for this port's clamp model.
    ///
    /// Mains clamps and branch clamps have different turns ratios.
    #[must_use]
    pub fn correction_factor(self) -> f32 {
        if self.is_mains() {
            MAINS_CORRECTION_FACTOR
        } else {
            BRANCH_CORRECTION_FACTOR
        }
    }
}

impl FromStr for CtPort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        match label.to_ascii_uppercase().as_str() {
            "A" => Ok(Self(0)),
            "B" => Ok(Self(1)),
            "C" => Ok(Self(2)),
            _ => match label.parse::<u8>() {
                Ok(n @ 1..=16) => Ok(Self(n + NUM_MAINS_PORTS - 1)),
                _ => Err(format!(
                    "invalid CT port '{}', expected A, B, C or 1-16",
                    label
                )),
            },
        }
    }
}

impl TryFrom<String> for CtPort {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for CtPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => f.write_str("A"),
            1 => f.write_str("B"),
            2 => f.write_str("C"),
            n => write!(f, "{}", n - NUM_MAINS_PORTS + 1),
        }
    }
}

/// Raw power of one CT port correlated against each voltage wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerEntry {
    pub black: i32,
    pub red: i32,
    pub blue: i32,
}

impl PowerEntry {
    /// Raw power correlated against the given wire.
    #[must_use]
    pub fn for_wire(&self, wire: WireColor) -> i32 {
        match wire {
            WireColor::Black => self.black,
            WireColor::Red => self.red,
            WireColor::Blue => self.blue,
        }
    }
}

/// Decoded sensor reading
///
/// Created fresh on every poll and dropped once it has been distributed to
/// the channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorReading {
    /// Set by the device when this content has not been consumed yet
    pub is_unread: bool,

    /// CRC-8 over the frame payload
    pub checksum: u8,

    /// Undocumented byte, covered by the checksum
    pub unknown: u8,

    /// Per-frame counter assigned by the device
    pub sequence_num: u8,

    /// Raw power per CT port
    pub power: [PowerEntry; NUM_CT_PORTS],

    /// Raw voltage per wire, indexed by [`WireColor::index`]
    pub voltage: [u16; NUM_WIRES],

    /// Raw line frequency
    pub frequency: u16,

    /// Raw phase angles of the red and blue wires relative to black
    pub degrees: [u16; 2],

    /// Raw current per CT port
    pub current: [u16; NUM_CT_PORTS],

    /// Trailing marker, zero in a well-formed frame
    pub end: u16,
}

impl Default for SensorReading {
    fn default() -> Self {
        Self {
            is_unread: false,
            checksum: 0,
            unknown: 0,
            sequence_num: 0,
            power: [PowerEntry::default(); NUM_CT_PORTS],
            voltage: [0; NUM_WIRES],
            frequency: 0,
            degrees: [0; 2],
            current: [0; NUM_CT_PORTS],
            end: 0,
        }
    }
}
