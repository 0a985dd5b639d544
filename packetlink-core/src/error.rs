//! Error types for packet operations
//!
//! Framing faults are a bit set rather than a single variant: one operation
//! can report several independent faults at once (an oversized payload is
//! both `LENGTH` and `MEMORY` for a small buffer).

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

/// Set of framing faults reported by the codec, assembler and buffer pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PacketError(u32);

impl PacketError {
    /// No fault
    pub const SUCCESS: Self = Self(0);

    /// Capacity or lifecycle violation (buffer too small, not generated)
    pub const MEMORY: Self = Self(1 << 0);

    /// Lifecycle-order violation (double generate, byte after completion)
    pub const STATE: Self = Self(1 << 1);

    /// Payload exceeds the protocol maximum
    pub const LENGTH: Self = Self(1 << 2);

    /// Module id not in the registry
    pub const MODULE: Self = Self(1 << 3);

    /// Bad start symbol
    pub const START_SYM: Self = Self(1 << 4);

    /// Checksum mismatch
    pub const CHECKSUM: Self = Self(1 << 5);

    /// Bad end symbol
    pub const END_SYM: Self = Self(1 << 6);

    /// Fewer bytes than the declared frame length
    pub const INCOMPLETE: Self = Self(1 << 7);

    const NAMES: [(Self, &'static str); 8] = [
        (Self::MEMORY, "MEMORY"),
        (Self::STATE, "STATE"),
        (Self::LENGTH, "LENGTH"),
        (Self::MODULE, "MODULE"),
        (Self::START_SYM, "START_SYM"),
        (Self::CHECKSUM, "CHECKSUM"),
        (Self::END_SYM, "END_SYM"),
        (Self::INCOMPLETE, "INCOMPLETE"),
    ];

    /// Build from the raw bit word
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bit word
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// True when no fault bit is set
    pub const fn is_success(&self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set in `self`
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// True when `self` and `other` share any bit
    pub const fn intersects(&self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// `Ok(value)` when no fault is set, `Err(self)` otherwise
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_success() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    /// Iterate the names of the set faults
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        Self::NAMES
            .iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
    }
}

impl BitOr for PacketError {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PacketError {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            return f.write_str("SUCCESS");
        }
        let mut first = true;
        for name in self.names() {
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(name)?;
            first = false;
        }
        // Bits with no name still have to show up somewhere
        let known = Self::NAMES.iter().fold(0, |acc, (flag, _)| acc | flag.0);
        let unknown = self.0 & !known;
        if unknown != 0 {
            if !first {
                f.write_str(" | ")?;
            }
            write!(f, "{:#x}", unknown)?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PacketError {}

/// Errors raised while validating a [`LinkConfig`](crate::config::LinkConfig)
#[cfg_attr(feature = "std", derive(thiserror::Error))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Block length larger than the configured ceiling
    #[cfg_attr(feature = "std", error("Block length {0} exceeds maximum block length {1}"))]
    BlockTooLarge(usize, usize),

    /// Ceiling would allow frames the protocol cannot describe
    #[cfg_attr(feature = "std", error("Maximum block length {0} exceeds protocol payload limit {1}"))]
    MaxBlockTooLarge(usize, usize),

    /// No module id is accepted
    #[cfg_attr(feature = "std", error("Module registry is empty"))]
    EmptyRegistry,

    /// Stalled-frame timeout of zero would drop every partial frame
    #[cfg_attr(feature = "std", error("Receive timeout must be greater than zero"))]
    ZeroTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_combined_faults() {
        let err = PacketError::LENGTH | PacketError::MEMORY;
        assert!(err.contains(PacketError::LENGTH));
        assert!(err.contains(PacketError::MEMORY));
        assert!(!err.contains(PacketError::MODULE));
        assert!(err.intersects(PacketError::MEMORY | PacketError::STATE));
        assert_eq!(err.to_string(), "MEMORY | LENGTH");
    }

    #[test]
    fn test_success() {
        let mut err = PacketError::SUCCESS;
        assert!(err.is_success());
        assert_eq!(err.to_string(), "SUCCESS");
        assert_eq!(err.into_result(7), Ok(7));

        err |= PacketError::CHECKSUM;
        assert_eq!(err.into_result(()), Err(PacketError::CHECKSUM));
    }

    #[test]
    fn test_unknown_bits_displayed() {
        let err = PacketError::from_bits(PacketError::END_SYM.bits() | 0x1000);
        assert_eq!(err.to_string(), "END_SYM | 0x1000");
    }
}
