//! Capability masks shared by devices and use cases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Direction/voice capability of an endpoint or use case.
///
/// The bit layout matches the `ACDBID id:mask` field of descriptor text:
/// RX = 1, TX = 2, VOICE = 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(u8);

impl Capability {
    pub const NONE: Self = Self(0);
    pub const RX: Self = Self(1);
    pub const TX: Self = Self(2);
    pub const VOICE: Self = Self(4);

    const ALL_BITS: u8 = 0b111;

    /// Build from a raw mask, dropping unknown bits.
    pub fn from_bits_truncate(bits: u32) -> Self {
        Self((bits & Self::ALL_BITS as u32) as u8)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set in `self`.
    pub fn contains(self, other: Self) -> bool {
        !other.is_empty() && self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Devices that carry voice (or declare nothing) take part in any scope.
    pub fn is_voice_or_empty(self) -> bool {
        self.is_empty() || self.contains(Self::VOICE)
    }
}

impl BitOr for Capability {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Capability {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let parts: Vec<&str> = [(Self::RX, "RX"), (Self::TX, "TX"), (Self::VOICE, "VOICE")]
            .iter()
            .filter(|(cap, _)| self.contains(*cap))
            .map(|(_, label)| *label)
            .collect();
        write!(f, "{}", parts.join("|"))
    }
}
