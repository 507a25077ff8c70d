use std::ops::Deref;

use super::error::{QRError, QRResult};
use super::metadata::Color;
use crate::builder::QR;

#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord)]
pub struct MaskPattern(u8);

impl MaskPattern {
    pub fn new(pattern: u8) -> Self {
        debug_assert!(pattern < 8, "Invalid masking pattern");
        Self(pattern & 0b111)
    }
}

impl TryFrom<u8> for MaskPattern {
    type Error = QRError;

    fn try_from(pattern: u8) -> QRResult<Self> {
        if pattern < 8 {
            Ok(Self(pattern))
        } else {
            Err(QRError::InvalidMaskingPattern)
        }
    }
}

impl Deref for MaskPattern {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

mod mask_functions {
    pub fn checkerboard(r: i16, c: i16) -> bool {
        (r + c) & 1 == 0
    }

    pub fn horizontal_lines(r: i16, _: i16) -> bool {
        r & 1 == 0
    }

    pub fn vertical_lines(_: i16, c: i16) -> bool {
        c % 3 == 0
    }

    pub fn diagonal_lines(r: i16, c: i16) -> bool {
        (r + c) % 3 == 0
    }

    pub fn large_checkerboard(r: i16, c: i16) -> bool {
        ((r >> 1) + (c / 3)) & 1 == 0
    }

    pub fn fields(r: i16, c: i16) -> bool {
        ((r * c) & 1) + ((r * c) % 3) == 0
    }

    pub fn diamonds(r: i16, c: i16) -> bool {
        (((r * c) & 1) + ((r * c) % 3)) & 1 == 0
    }

    pub fn meadow(r: i16, c: i16) -> bool {
        (((r + c) & 1) + ((r * c) % 3)) & 1 == 0
    }
}

impl MaskPattern {
    pub fn mask_function(self) -> fn(i16, i16) -> bool {
        match self.0 {
            0b000 => mask_functions::checkerboard,
            0b001 => mask_functions::horizontal_lines,
            0b010 => mask_functions::vertical_lines,
            0b011 => mask_functions::diagonal_lines,
            0b100 => mask_functions::large_checkerboard,
            0b101 => mask_functions::fields,
            0b110 => mask_functions::diamonds,
            _ => mask_functions::meadow,
        }
    }
}


// Mask selection
//------------------------------------------------------------------------------

pub fn apply_best_mask(qr: &mut QR) -> MaskPattern {
    let best = (0..8)
        .map(MaskPattern)
        .min_by_key(|&m| {
            let mut candidate = qr.clone();
            candidate.apply_mask(m);
            compute_total_penalty(&candidate)
        })
        .unwrap_or(MaskPattern(0));
    qr.apply_mask(best);
    best
}

pub fn compute_total_penalty(qr: &QR) -> u32 {
    let w = qr.width() as i16;
    let rows = (0..w).map(|r| (0..w).map(|c| *qr.get(r, c)).collect::<Vec<_>>());
    let cols = (0..w).map(|c| (0..w).map(|r| *qr.get(r, c)).collect::<Vec<_>>());
    let lines = rows.chain(cols).collect::<Vec<_>>();

    let run_pen = lines.iter().map(|l| compute_run_penalty(l)).sum::<u32>();
    let finder_pen = lines.iter().map(|l| compute_finder_pattern_penalty(l)).sum::<u32>();
    run_pen + finder_pen + compute_block_penalty(qr) + compute_balance_penalty(qr)
}

// Five or more same coloured modules in a line
fn compute_run_penalty(line: &[Color]) -> u32 {
    let mut pen = 0;
    let mut run = 0;
    let mut last = None;
    for &clr in line {
        if Some(clr) == last {
            run += 1;
        } else {
            if run >= 5 {
                pen += run - 2;
            }
            last = Some(clr);
            run = 1;
        }
    }
    if run >= 5 {
        pen += run - 2;
    }
    pen
}

// 2x2 blocks of one colour
fn compute_block_penalty(qr: &QR) -> u32 {
    let mut pen = 0;
    let w = qr.width() as i16;
    for r in 0..w - 1 {
        for c in 0..w - 1 {
            let clr = *qr.get(r, c);
            if clr == *qr.get(r + 1, c) && clr == *qr.get(r, c + 1) && clr == *qr.get(r + 1, c + 1)
            {
                pen += 3;
            }
        }
    }
    pen
}

// Dark-light-dark-dark-dark-light-dark with four light modules on one side.
// Modules outside the symbol count as light.
fn compute_finder_pattern_penalty(line: &[Color]) -> u32 {
    let w = line.len() as i32;
    let at = |i: i32| if i < 0 || i >= w { Color::Light } else { line[i as usize] };
    let mut pen = 0;
    for start in -4..w {
        let window = (0..11).map(|k| at(start + k));
        if window.clone().eq(FINDER_LIKE_LEFT.iter().copied())
            || window.eq(FINDER_LIKE_RIGHT.iter().copied())
        {
            pen += 40;
        }
    }
    pen
}

// Deviation of the dark ratio from 50%, in steps of 5%
fn compute_balance_penalty(qr: &QR) -> u32 {
    let total = qr.width() * qr.width();
    let dark = qr.count_dark_modules();
    let deviation = (dark * 20).abs_diff(total * 10);
    (deviation / total) as u32 * 10
}

#[cfg(test)]
mod penalty_tests {
    use super::{compute_finder_pattern_penalty, compute_run_penalty};
    use crate::common::metadata::Color::{Dark as D, Light as L};

    #[test]
    fn test_run_penalty() {
        assert_eq!(compute_run_penalty(&[D, D, D, D]), 0);
        assert_eq!(compute_run_penalty(&[D, D, D, D, D]), 3);
        assert_eq!(compute_run_penalty(&[L, L, L, L, L, L, D, D, D, D, D, D, D]), 4 + 5);
    }

    #[test]
    fn test_finder_pattern_penalty() {
        let line = [L, L, L, L, D, L, D, D, D, L, D];
        assert_eq!(compute_finder_pattern_penalty(&line), 40 + 40);
        let line = [D, D, L, L, D, D, D, D, L, L, D];
        assert_eq!(compute_finder_pattern_penalty(&line), 0);
    }
}

// Global constants
//------------------------------------------------------------------------------

use Color::{Dark as D, Light as L};

static FINDER_LIKE_LEFT: [Color; 11] = [L, L, L, L, D, L, D, D, D, L, D];

static FINDER_LIKE_RIGHT: [Color; 11] = [D, L, D, D, D, L, D, L, L, L, L];
