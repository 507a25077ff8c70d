use super::metadata::Version;

// Iterator for placing data in encoding region of QR
//------------------------------------------------------------------------------

// Walks column pairs from the right edge, alternating upward and downward,
// skipping the vertical timing column. Yields every coordinate of the
// symbol, function modules included; callers skip occupied modules.
pub struct EncRegionIter {
    right: i16,
    vert: i16,
    offset: i16,
    width: i16,
}

impl EncRegionIter {
    pub const fn new(version: Version) -> Self {
        let w = version.width() as i16;
        Self { right: w - 1, vert: 0, offset: 0, width: w }
    }
}

impl Iterator for EncRegionIter {
    type Item = (i16, i16);

    fn next(&mut self) -> Option<Self::Item> {
        if self.right < 1 {
            return None;
        }
        let c = self.right - self.offset;
        let upward = (self.right + 1) & 2 == 0;
        let r = if upward { self.width - 1 - self.vert } else { self.vert };

        self.offset += 1;
        if self.offset == 2 {
            self.offset = 0;
            self.vert += 1;
            if self.vert == self.width {
                self.vert = 0;
                self.right -= 2;
                if self.right == 6 {
                    self.right = 5;
                }
            }
        }
        Some((r, c))
    }
}

#[cfg(test)]
mod iter_tests {
    use std::collections::HashSet;

    use super::EncRegionIter;
    use crate::common::metadata::Version;

    #[test]
    fn test_starts_bottom_right_going_up() {
        let ver = Version::new(1).unwrap();
        let coords = EncRegionIter::new(ver).take(4).collect::<Vec<_>>();
        assert_eq!(coords, vec![(20, 20), (20, 19), (19, 20), (19, 19)]);
    }

    #[test]
    fn test_turns_down_on_next_column_pair() {
        let ver = Version::new(1).unwrap();
        let coords = EncRegionIter::new(ver).skip(42).take(2).collect::<Vec<_>>();
        assert_eq!(coords, vec![(0, 18), (0, 17)]);
    }

    #[test]
    fn test_covers_every_module_but_timing_column() {
        for v in [1, 2, 7, 40] {
            let ver = Version::new(v).unwrap();
            let w = ver.width() as i16;
            let coords = EncRegionIter::new(ver).collect::<Vec<_>>();
            let unique = coords.iter().copied().collect::<HashSet<_>>();
            assert_eq!(coords.len(), unique.len());
            assert_eq!(coords.len(), (w * (w - 1)) as usize);
            assert!(coords.iter().all(|&(_, c)| c != 6));
        }
    }
}
