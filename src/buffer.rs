use crate::error::{EcError, EcResult};
use byteorder::{BigEndian, ByteOrder};

/// Size of a single windowed write.
pub const WINDOW_BYTES: usize = 8;

/// Growable output storage for the range encoder.
///
/// `bytes.len()` is the storage size; only `[0, offs)` is committed. Bytes past
/// `offs` are scratch space that windowed writes may clobber.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    bytes: Vec<u8>,
    offs: usize,
    limit: Option<usize>,
}

impl OutputBuffer {
    pub fn empty(limit: Option<usize>) -> Self {
        Self {
            bytes: Vec::new(),
            offs: 0,
            limit,
        }
    }

    pub fn with_capacity(capacity: usize, limit: Option<usize>) -> EcResult<Self> {
        let mut buffer = Self::empty(limit);
        buffer.grow_to(capacity)?;
        Ok(buffer)
    }

    pub fn storage(&self) -> usize {
        self.bytes.len()
    }

    pub fn offs(&self) -> usize {
        self.offs
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.offs]
    }

    pub fn clear(&mut self) {
        self.offs = 0;
    }

    fn grow_to(&mut self, storage: usize) -> EcResult<()> {
        let current = self.bytes.len();
        if storage <= current {
            return Ok(());
        }
        if self.limit.is_some_and(|limit| storage > limit) {
            log::warn!(
                "output buffer growth to {} bytes refused (limit {:?})",
                storage,
                self.limit
            );
            return Err(EcError::AllocationFailed { requested: storage });
        }
        self.bytes
            .try_reserve_exact(storage - current)
            .map_err(|_| {
                log::warn!("output buffer allocation of {} bytes failed", storage);
                EcError::AllocationFailed { requested: storage }
            })?;
        self.bytes.resize(storage, 0);
        log::debug!("output buffer grown {} -> {} bytes", current, storage);
        Ok(())
    }

    /// Ensures a full eight byte window fits at the write offset, doubling
    /// storage (plus eight) when it does not.
    pub fn reserve_window(&mut self) -> EcResult<()> {
        if self.offs + WINDOW_BYTES > self.bytes.len() {
            self.grow_to(2 * self.bytes.len() + WINDOW_BYTES)?;
        }
        Ok(())
    }

    /// Grows storage to exactly `offs + additional` if it is smaller.
    pub fn reserve_exact(&mut self, additional: usize) -> EcResult<()> {
        let needed = self.offs + additional;
        if needed > self.bytes.len() {
            self.grow_to(needed)?;
        }
        Ok(())
    }

    /// Writes the low `num_bytes` bytes of `output` big-endian at the write
    /// offset, after adding `carry` into the bytes already committed.
    /// Call [`reserve_window`](Self::reserve_window) first.
    pub fn write_window(&mut self, output: u64, num_bytes: usize, carry: bool) -> EcResult<()> {
        debug_assert!((1..=WINDOW_BYTES).contains(&num_bytes));
        debug_assert!(self.offs + WINDOW_BYTES <= self.bytes.len());
        if carry {
            self.propagate_carry(self.offs)?;
        }
        let reg = output << ((WINDOW_BYTES - num_bytes) << 3);
        BigEndian::write_u64(&mut self.bytes[self.offs..self.offs + WINDOW_BYTES], reg);
        self.offs += num_bytes;
        Ok(())
    }

    /// Appends one byte, first adding `carry` into the committed bytes.
    /// Storage must already be reserved.
    pub fn push_byte(&mut self, byte: u8, carry: bool) -> EcResult<()> {
        debug_assert!(self.offs < self.bytes.len());
        if carry {
            self.propagate_carry(self.offs)?;
        }
        self.bytes[self.offs] = byte;
        self.offs += 1;
        Ok(())
    }

    fn propagate_carry(&mut self, end: usize) -> EcResult<usize> {
        let Some(pos) = self.bytes[..end].iter().rposition(|&b| b != 0xFF) else {
            log::warn!("carry ran past the start of a {} byte stream", end);
            return Err(EcError::CarryUnderflow);
        };
        self.bytes[pos] += 1;
        self.bytes[pos + 1..end].fill(0);
        let touched = end - pos;
        if touched > 1 {
            log::trace!("carry rippled through {} bytes ending at {}", touched, end);
        }
        Ok(touched)
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.bytes.truncate(self.offs);
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_policy() {
        let mut buf = OutputBuffer::with_capacity(0, None).unwrap();
        assert_eq!(buf.storage(), 0);

        buf.reserve_window().unwrap();
        assert_eq!(buf.storage(), 8);

        buf.write_window(0x0102_0304_0506, 6, false).unwrap();
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 5, 6]);

        buf.reserve_window().unwrap();
        assert_eq!(buf.storage(), 24);
        buf.write_window(0x0708, 2, false).unwrap();
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_window_does_not_grow_when_room() {
        let mut buf = OutputBuffer::with_capacity(64, None).unwrap();
        buf.reserve_window().unwrap();
        assert_eq!(buf.storage(), 64);
    }

    #[test]
    fn test_carry_ripples_backward() {
        let mut buf = OutputBuffer::with_capacity(16, None).unwrap();
        buf.write_window(0x12_FF_FF_FF, 4, false).unwrap();
        buf.write_window(0x34, 1, true).unwrap();
        assert_eq!(buf.as_slice(), &[0x13, 0x00, 0x00, 0x00, 0x34]);
    }

    #[test]
    fn test_push_byte_with_carry() {
        let mut buf = OutputBuffer::with_capacity(8, None).unwrap();
        buf.push_byte(0x7F, false).unwrap();
        buf.push_byte(0xFF, false).unwrap();
        buf.push_byte(0x01, true).unwrap();
        assert_eq!(buf.as_slice(), &[0x80, 0x00, 0x01]);
    }

    #[test]
    fn test_carry_underflow_leaves_bytes() {
        let mut buf = OutputBuffer::with_capacity(8, None).unwrap();
        buf.push_byte(0xFF, false).unwrap();
        buf.push_byte(0xFF, false).unwrap();
        assert_eq!(buf.push_byte(0x00, true), Err(EcError::CarryUnderflow));
        assert_eq!(buf.as_slice(), &[0xFF, 0xFF]);

        let mut empty = OutputBuffer::with_capacity(8, None).unwrap();
        assert_eq!(empty.push_byte(0x00, true), Err(EcError::CarryUnderflow));
        assert_eq!(empty.offs(), 0);
    }

    #[test]
    fn test_storage_limit() {
        let mut buf = OutputBuffer::with_capacity(8, Some(16)).unwrap();
        buf.write_window(0xAABB_CCDD, 4, false).unwrap();
        buf.push_byte(0xEE, false).unwrap();
        buf.push_byte(0xFF, false).unwrap();
        // 2 * 8 + 8 = 24 exceeds the limit
        assert_eq!(
            buf.reserve_window(),
            Err(EcError::AllocationFailed { requested: 24 })
        );
        assert_eq!(buf.storage(), 8);
        assert_eq!(buf.as_slice(), &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

        assert!(buf.reserve_exact(2).is_ok());
        assert_eq!(buf.storage(), 8);
        assert!(buf.reserve_exact(10).is_ok());
        assert_eq!(buf.storage(), 16);
        assert!(buf.reserve_exact(11).is_err());
    }

    #[test]
    fn test_into_bytes_truncates() {
        let mut buf = OutputBuffer::with_capacity(32, None).unwrap();
        buf.write_window(0xC0, 1, false).unwrap();
        buf.clear();
        buf.write_window(0xABCD, 2, false).unwrap();
        assert_eq!(buf.into_bytes(), vec![0xAB, 0xCD]);
    }
}
