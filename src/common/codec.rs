use tracing::trace;

use super::bitstream::BitStream;
use super::error::{QRError, QRResult};
use super::metadata::{ECLevel, Version};

// Mode
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Mode {
    Numeric = 0b0001,
    Alphanumeric = 0b0010,
    Byte = 0b0100,
}

pub static MODES: [Mode; 3] = [Mode::Numeric, Mode::Alphanumeric, Mode::Byte];

impl Mode {
    pub fn contains(self, byte: u8) -> bool {
        match self {
            Self::Numeric => byte.is_ascii_digit(),
            Self::Alphanumeric => Self::alphanumeric_digit(byte).is_some(),
            Self::Byte => true,
        }
    }

    fn alphanumeric_digit(byte: u8) -> Option<u32> {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'A'..=b'Z' => byte - b'A' + 10,
            b' ' => 36,
            b'$' => 37,
            b'%' => 38,
            b'*' => 39,
            b'+' => 40,
            b'-' => 41,
            b'.' => 42,
            b'/' => 43,
            b':' => 44,
            _ => return None,
        };
        Some(digit as u32)
    }

    // Bits used by `len` characters, excluding the segment header
    pub fn encoded_len(self, len: usize) -> usize {
        match self {
            Self::Numeric => len / 3 * 10 + [0, 4, 7][len % 3],
            Self::Alphanumeric => len / 2 * 11 + (len & 1) * 6,
            Self::Byte => len * 8,
        }
    }

    // Approximate per character cost in sixths of a bit, used by the
    // segmentation search
    fn char_cost(self) -> usize {
        match self {
            Self::Numeric => 20,
            Self::Alphanumeric => 33,
            Self::Byte => 48,
        }
    }
}


// Segment
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Segment<'a> {
    pub mode: Mode,
    pub len_bits: usize,
    pub data: &'a [u8],
}

impl<'a> Segment<'a> {
    pub fn new(mode: Mode, len_bits: usize, data: &'a [u8]) -> Self {
        Self { mode, len_bits, data }
    }

    pub fn bit_len(&self) -> usize {
        MODE_BITS + self.len_bits + self.mode.encoded_len(self.data.len())
    }

    fn push_to(&self, out: &mut BitStream) -> QRResult<()> {
        debug_assert!(
            self.data.len() < 1 << self.len_bits,
            "Segment too long for its character count field: {}",
            self.data.len()
        );
        out.push_bits(self.mode as u32, MODE_BITS)?;
        out.push_bits(self.data.len() as u32, self.len_bits)?;
        match self.mode {
            Mode::Numeric => {
                for chunk in self.data.chunks(3) {
                    let value = chunk.iter().fold(0, |acc, &b| acc * 10 + (b - b'0') as u32);
                    out.push_bits(value, [0, 4, 7, 10][chunk.len()])?;
                }
            }
            Mode::Alphanumeric => {
                for chunk in self.data.chunks(2) {
                    let value = chunk.iter().try_fold(0, |acc, &b| {
                        Mode::alphanumeric_digit(b).map(|d| acc * 45 + d)
                    });
                    let value = value.ok_or(QRError::InvalidChar)?;
                    out.push_bits(value, [0, 6, 11][chunk.len()])?;
                }
            }
            Mode::Byte => out.extend(self.data)?,
        }
        Ok(())
    }
}


// Segmentation
//------------------------------------------------------------------------------

// Dynamic programming over the three modes. For every character the cheapest
// way to end in each mode is kept together with the mode it came from.
pub fn compute_optimal_segments(data: &[u8], ver: Version) -> Vec<Segment<'_>> {
    debug_assert!(!data.is_empty(), "Empty data");

    let header_cost = |m: Mode| (MODE_BITS + ver.char_cnt_bits(m)) * 6;
    let mut prev_cost = MODES.map(header_cost);
    let mut back = Vec::with_capacity(data.len());
    for &b in data {
        let mut cur_cost = [usize::MAX; 3];
        let mut from = [0usize; 3];
        for (j, &to_mode) in MODES.iter().enumerate() {
            if !to_mode.contains(b) {
                continue;
            }
            for (k, &from_mode) in MODES.iter().enumerate() {
                if prev_cost[k] == usize::MAX {
                    continue;
                }
                let mut cost = if to_mode == from_mode {
                    prev_cost[k]
                } else {
                    prev_cost[k].div_ceil(6) * 6 + header_cost(to_mode)
                };
                cost += to_mode.char_cost();
                if cost < cur_cost[j] {
                    cur_cost[j] = cost;
                    from[j] = k;
                }
            }
        }
        back.push(from);
        prev_cost = cur_cost;
    }

    let mut mode_idx = (0..3).min_by_key(|&i| prev_cost[i]).unwrap_or(2);
    let mut char_modes = vec![Mode::Byte; data.len()];
    for i in (0..data.len()).rev() {
        char_modes[i] = MODES[mode_idx];
        mode_idx = back[i][mode_idx];
    }
    build_segments(ver, &char_modes, data)
}

fn build_segments<'a>(ver: Version, char_modes: &[Mode], data: &'a [u8]) -> Vec<Segment<'a>> {
    let mut segs = Vec::new();
    let mut start = 0;
    for i in 1..=data.len() {
        if i == data.len() || char_modes[i] != char_modes[start] {
            let mode = char_modes[start];
            segs.push(Segment::new(mode, ver.char_cnt_bits(mode), &data[start..i]));
            start = i;
        }
    }
    segs
}

#[cfg(test)]
mod segmentation_tests {
    use super::{build_segments, compute_optimal_segments, Mode, Segment, Version};

    #[test]
    fn test_build_segments() {
        let data = b"AAAAA11111aaa";
        let ver = Version::new(1).unwrap();
        let mut char_modes = vec![Mode::Alphanumeric; 5];
        char_modes.extend([Mode::Numeric; 5]);
        char_modes.extend([Mode::Byte; 3]);
        let segs = build_segments(ver, &char_modes, data);
        assert_eq!(
            segs,
            vec![
                Segment::new(Mode::Alphanumeric, 9, &data[..5]),
                Segment::new(Mode::Numeric, 10, &data[5..10]),
                Segment::new(Mode::Byte, 8, &data[10..]),
            ]
        );
    }

    #[test]
    fn test_digits_only_stay_numeric() {
        let segs = compute_optimal_segments(b"356938035643809", Version::new(1).unwrap());
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].mode, Mode::Numeric);
    }

    #[test]
    fn test_newline_joined_identifiers() {
        let data = b"356938035643809\n356938035643817";
        let segs = compute_optimal_segments(data, Version::new(2).unwrap());
        let modes = segs.iter().map(|s| s.mode).collect::<Vec<_>>();
        assert_eq!(modes, vec![Mode::Numeric, Mode::Byte, Mode::Numeric]);
        assert_eq!(segs[1].data, b"\n");
    }

    #[test]
    fn test_short_runs_fold_into_byte() {
        let segs = compute_optimal_segments(b"a1b", Version::new(1).unwrap());
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].mode, Mode::Byte);
    }
}

// Encoder
//------------------------------------------------------------------------------

// Encodes data into the smallest version that fits
pub fn encode(data: &[u8], ecl: ECLevel) -> QRResult<(BitStream, Version)> {
    if data.is_empty() {
        return Err(QRError::EmptyData);
    }
    let mut segs = Vec::new();
    let mut sz = 0;
    for ver in Version::all() {
        // Character count field widths only change at versions 1, 10 & 27
        if matches!(*ver, 1 | 10 | 27) {
            segs = compute_optimal_segments(data, ver);
            sz = segs.iter().map(Segment::bit_len).sum();
        }
        if sz <= ver.data_bit_capacity(ecl) {
            trace!(version = *ver, bits = sz, "Selected smallest fitting version");
            return Ok((write_segments(&segs, ver, ecl)?, ver));
        }
    }
    Err(QRError::DataTooLong)
}

pub fn encode_with_version(data: &[u8], ver: Version, ecl: ECLevel) -> QRResult<BitStream> {
    if data.is_empty() {
        return Err(QRError::EmptyData);
    }
    let segs = compute_optimal_segments(data, ver);
    let sz: usize = segs.iter().map(Segment::bit_len).sum();
    if sz > ver.data_bit_capacity(ecl) {
        return Err(QRError::DataTooLong);
    }
    write_segments(&segs, ver, ecl)
}

fn write_segments(segs: &[Segment], ver: Version, ecl: ECLevel) -> QRResult<BitStream> {
    let mut bs = BitStream::new(ver.data_bit_capacity(ecl));
    for seg in segs {
        seg.push_to(&mut bs)?;
    }
    push_terminator(&mut bs)?;
    pad_remaining_capacity(&mut bs)?;
    Ok(bs)
}

fn push_terminator(bs: &mut BitStream) -> QRResult<()> {
    let size = bs.remaining().min(4);
    bs.push_bits(0, size)
}

fn pad_remaining_capacity(bs: &mut BitStream) -> QRResult<()> {
    let offset = bs.len() & 7;
    if offset > 0 {
        bs.push_bits(0, 8 - offset)?;
    }
    for pad in PADDING_CODEWORDS.iter().cycle().take(bs.remaining() >> 3) {
        bs.push_bits(*pad as u32, 8)?;
    }
    Ok(())
}


// Global constants
//------------------------------------------------------------------------------

const MODE_BITS: usize = 4;

static PADDING_CODEWORDS: [u8; 2] = [0b1110_1100, 0b0001_0001];
