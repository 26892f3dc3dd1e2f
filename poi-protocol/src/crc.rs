//! CRC-32/IEEE for sub-frame integrity
//!
//! Reflected polynomial 0xEDB88320, initial value 0xFFFFFFFF, final
//! inversion. Bitwise rather than table driven: sub-frames are at most a few
//! hundred bytes and the table would cost 1 KiB of flash.

const POLY: u32 = 0xEDB8_8320;

/// Running CRC-32 over one or more slices
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    /// Start a new checksum
    pub const fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    /// Feed more bytes
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.state ^= byte as u32;
            for _ in 0..8 {
                if self.state & 1 != 0 {
                    self.state = (self.state >> 1) ^ POLY;
                } else {
                    self.state >>= 1;
                }
            }
        }
    }

    /// Final checksum value
    pub fn finish(self) -> u32 {
        !self.state
    }
}

/// One-shot CRC-32 over a single slice
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        // Standard CRC-32 check value for "123456789"
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_empty() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let mut crc = Crc32::new();
        crc.update(&data[..10]);
        crc.update(&data[10..]);
        assert_eq!(crc.finish(), crc32(data));
        assert_eq!(crc32(data), 0x414F_A339);
    }
}
