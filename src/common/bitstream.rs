use super::error::{QRError, QRResult};

// Bit stream
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStream {
    data: Vec<u8>,
    // Bit length
    len: usize,
    // Max bit capacity
    capacity: usize,
}

impl BitStream {
    pub fn new(capacity: usize) -> Self {
        Self { data: Vec::with_capacity((capacity + 7) >> 3), len: 0, capacity }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.len
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn push(&mut self, bit: bool) -> QRResult<()> {
        if self.len >= self.capacity {
            return Err(QRError::DataTooLong);
        }
        let offset = self.len & 7;
        if offset == 0 {
            self.data.push(0);
        }
        if bit {
            let pos = self.len >> 3;
            self.data[pos] |= 0b1000_0000 >> offset;
        }
        self.len += 1;
        Ok(())
    }

    // Appends the lowest `size` bits of `bits`, most significant first
    pub fn push_bits(&mut self, bits: u32, size: usize) -> QRResult<()> {
        debug_assert!(size <= 32, "Bit count exceeds 32: {size}");
        debug_assert!(
            size == 32 || bits >> size == 0,
            "Bits don't fit in size: Size {size}, Bits {bits}"
        );
        if self.len + size > self.capacity {
            return Err(QRError::DataTooLong);
        }
        for i in (0..size).rev() {
            self.push((bits >> i) & 1 == 1)?;
        }
        Ok(())
    }

    pub fn extend(&mut self, bytes: &[u8]) -> QRResult<()> {
        for &b in bytes {
            self.push_bits(b as u32, 8)?;
        }
        Ok(())
    }

    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| (self.data[i >> 3] >> (7 - (i & 7))) & 1 == 1)
    }
}

#[cfg(test)]
mod bit_stream_tests {
    use super::BitStream;
    use crate::common::error::QRError;

    #[test]
    fn test_len() {
        let mut bs = BitStream::new(152);
        assert_eq!(bs.len(), 0);
        bs.push_bits(0, 0).unwrap();
        assert_eq!(bs.len(), 0);
        bs.push_bits(0b1000, 4).unwrap();
        assert_eq!(bs.len(), 4);
        bs.push_bits(0b1000, 8).unwrap();
        assert_eq!(bs.len(), 12);
        bs.push_bits(0b1111111, 7).unwrap();
        assert_eq!(bs.len(), 19);
        assert_eq!(bs.remaining(), 133);
    }

    #[test]
    fn test_push() {
        let mut bs = BitStream::new(2);
        bs.push(false).unwrap();
        assert_eq!(bs.data(), &[0b00000000]);
        bs.push(true).unwrap();
        assert_eq!(bs.data(), &[0b01000000]);
    }

    #[test]
    fn test_push_bits_across_bytes() {
        let mut bs = BitStream::new(24);
        bs.push_bits(0b0100, 4).unwrap();
        bs.push_bits(0b0000_0001, 8).unwrap();
        bs.push_bits(0x31, 8).unwrap();
        assert_eq!(bs.data(), &[0x40, 0x13, 0x10]);
        assert_eq!(bs.bits().take(5).collect::<Vec<_>>(), vec![false, true, false, false, false]);
    }

    #[test]
    fn test_capacity_overflow() {
        let mut bs = BitStream::new(8);
        bs.push_bits(0xFF, 8).unwrap();
        assert_eq!(bs.push(true), Err(QRError::DataTooLong));
        assert_eq!(bs.len(), 8);
    }
}
