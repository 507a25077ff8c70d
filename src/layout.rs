use std::ops::Range;

use serde::Deserialize;

use crate::error::ValidationError;

/// A4 portrait, millimetres
pub const PAGE_WIDTH_MM: f64 = 210.0;

pub const PAGE_HEIGHT_MM: f64 = 297.0;

// Grid geometry
//------------------------------------------------------------------------------

/// Fixed grid of square cells repeated on every page.
///
/// Lengths are millimetres measured from the top left corner of the page.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    pub items_per_page: usize,
    pub columns: usize,
    pub rows: usize,
    pub cell_width: f64,
    pub cell_height: f64,
    pub margin_x: f64,
    pub margin_y: f64,
    pub gap_x: f64,
    pub gap_y: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::SIX
    }
}

impl GridConfig {
    /// 2 x 3 cells of 55 mm on A4
    pub const SIX: Self = Self {
        items_per_page: 6,
        columns: 2,
        rows: 3,
        cell_width: 55.0,
        cell_height: 55.0,
        margin_x: 20.0,
        margin_y: 25.0,
        gap_x: 25.0,
        gap_y: 40.0,
    };

    /// 2 x 4 cells of 45 mm on A4
    pub const EIGHT: Self = Self {
        items_per_page: 8,
        columns: 2,
        rows: 4,
        cell_width: 45.0,
        cell_height: 45.0,
        margin_x: 30.0,
        margin_y: 25.0,
        gap_x: 60.0,
        gap_y: 20.0,
    };

    /// 2 x 5 cells of 34 mm on A4
    pub const TEN: Self = Self {
        items_per_page: 10,
        columns: 2,
        rows: 5,
        cell_width: 34.0,
        cell_height: 34.0,
        margin_x: 35.0,
        margin_y: 22.0,
        gap_x: 66.0,
        gap_y: 18.0,
    };

    pub fn preset(items_per_page: usize) -> Result<Self, ValidationError> {
        match items_per_page {
            6 => Ok(Self::SIX),
            8 => Ok(Self::EIGHT),
            10 => Ok(Self::TEN),
            n => Err(ValidationError::InvalidGrid(format!(
                "no preset for {n} items per page, expected 6, 8 or 10"
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |msg: String| Err(ValidationError::InvalidGrid(msg));
        if self.columns == 0 || self.rows == 0 {
            return invalid("columns and rows must be positive".into());
        }
        if self.items_per_page != self.columns * self.rows {
            return invalid(format!(
                "items_per_page {} != columns {} x rows {}",
                self.items_per_page, self.columns, self.rows
            ));
        }
        let lengths = [
            ("cell_width", self.cell_width),
            ("cell_height", self.cell_height),
            ("margin_x", self.margin_x),
            ("margin_y", self.margin_y),
            ("gap_x", self.gap_x),
            ("gap_y", self.gap_y),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{name} must be a non-negative length, got {value}"));
            }
        }
        if self.cell_width == 0.0 || self.cell_height == 0.0 {
            return invalid("cells must have a positive size".into());
        }
        // The QR image is drawn as a cell_width square
        if self.cell_width != self.cell_height {
            return invalid(format!(
                "cells must be square, got {} x {} mm",
                self.cell_width, self.cell_height
            ));
        }
        let (w, h) = (self.content_width(), self.content_height());
        if w > PAGE_WIDTH_MM || h > PAGE_HEIGHT_MM {
            return invalid(format!(
                "grid needs {w} x {h} mm, the page is {PAGE_WIDTH_MM} x {PAGE_HEIGHT_MM} mm"
            ));
        }
        Ok(())
    }

    /// Right edge of the last column
    pub fn content_width(&self) -> f64 {
        let n = self.columns as f64;
        self.margin_x + n * self.cell_width + (n - 1.0) * self.gap_x
    }

    /// Bottom edge of the last row
    pub fn content_height(&self) -> f64 {
        let n = self.rows as f64;
        self.margin_y + n * self.cell_height + (n - 1.0) * self.gap_y
    }
}

// Placement
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub index: usize,
    pub page: usize,
    pub column: usize,
    pub row: usize,
    pub x: f64,
    pub y: f64,
}

impl Placement {
    /// First item on its page, where the header is drawn
    pub fn starts_page(&self) -> bool {
        self.column == 0 && self.row == 0
    }
}

impl GridConfig {
    /// Cells fill left to right, then top to bottom, then the next page.
    pub fn place(&self, index: usize) -> Placement {
        let slot = index % self.items_per_page;
        let column = slot % self.columns;
        let row = slot / self.columns;
        Placement {
            index,
            page: index / self.items_per_page,
            column,
            row,
            x: self.margin_x + column as f64 * (self.cell_width + self.gap_x),
            y: self.margin_y + row as f64 * (self.cell_height + self.gap_y),
        }
    }

    pub fn paginate(&self, count: usize) -> Vec<Placement> {
        (0..count).map(|i| self.place(i)).collect()
    }

    pub fn page_count(&self, count: usize) -> usize {
        count.div_ceil(self.items_per_page)
    }

    /// Item index range of every page
    pub fn pages(&self, count: usize) -> Vec<Range<usize>> {
        (0..self.page_count(count))
            .map(|p| p * self.items_per_page..((p + 1) * self.items_per_page).min(count))
            .collect()
    }
}

#[cfg(test)]
mod layout_tests {
    use test_case::test_case;

    use super::{GridConfig, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
    use crate::error::ValidationError;

    #[test]
    fn test_seventeen_items_on_six_per_page() {
        let grid = GridConfig::SIX;
        let pages = grid.pages(17);
        assert_eq!(pages.iter().map(|p| p.len()).collect::<Vec<_>>(), vec![6, 6, 5]);

        let p = grid.place(6);
        assert_eq!((p.page, p.column, p.row), (1, 0, 0));
        assert!(p.starts_page());
        assert_eq!((p.x, p.y), (20.0, 25.0));
    }

    #[test]
    fn test_original_six_grid_positions() {
        let grid = GridConfig::SIX;
        let xy = grid.paginate(6).iter().map(|p| (p.x, p.y)).collect::<Vec<_>>();
        assert_eq!(
            xy,
            vec![(20.0, 25.0), (100.0, 25.0), (20.0, 120.0), (100.0, 120.0), (20.0, 215.0), (100.0, 215.0)]
        );
    }

    #[test_case(0, 0)]
    #[test_case(1, 1)]
    #[test_case(8, 1)]
    #[test_case(9, 2)]
    #[test_case(80, 10)]
    fn test_page_count(count: usize, exp: usize) {
        assert_eq!(GridConfig::EIGHT.page_count(count), exp);
    }

    #[test_case(6)]
    #[test_case(8)]
    #[test_case(10)]
    fn test_presets_fit_a4(n: usize) {
        let grid = GridConfig::preset(n).unwrap();
        grid.validate().unwrap();
        assert_eq!(grid.items_per_page, n);
        assert!(grid.content_width() <= PAGE_WIDTH_MM);
        // Room for the three label lines below the last row
        assert!(grid.content_height() + 17.0 <= PAGE_HEIGHT_MM);
    }

    #[test]
    fn test_unknown_preset() {
        assert!(matches!(GridConfig::preset(7), Err(ValidationError::InvalidGrid(_))));
    }

    #[test]
    fn test_validate() {
        let grid = GridConfig { items_per_page: 5, ..GridConfig::SIX };
        assert!(grid.validate().is_err());
        let grid = GridConfig { gap_x: -1.0, ..GridConfig::SIX };
        assert!(grid.validate().is_err());
        let grid = GridConfig { columns: 0, items_per_page: 0, ..GridConfig::SIX };
        assert!(grid.validate().is_err());
    }

    #[test_case(GridConfig { cell_height: 40.0, ..GridConfig::SIX }; "tall gap under image")]
    #[test_case(GridConfig { cell_width: 40.0, ..GridConfig::SIX }; "image over caption")]
    #[test_case(GridConfig { gap_x: 120.0, ..GridConfig::SIX }; "too wide")]
    #[test_case(GridConfig { margin_y: 60.0, ..GridConfig::SIX }; "too tall")]
    fn test_validate_geometry(grid: GridConfig) {
        assert!(matches!(grid.validate(), Err(ValidationError::InvalidGrid(_))));
    }
}

#[cfg(test)]
mod layout_proptests {
    use proptest::prelude::*;

    use super::GridConfig;

    proptest! {
        #[test]
        fn proptest_pages_are_full_but_the_last(count in 0usize..500, preset in prop_oneof![Just(6usize), Just(8), Just(10)]) {
            let grid = GridConfig::preset(preset).unwrap();
            let pages = grid.pages(count);
            prop_assert_eq!(pages.iter().map(|p| p.len()).sum::<usize>(), count);
            if let Some((_, init)) = pages.split_last() {
                prop_assert!(init.iter().all(|p| p.len() == preset));
            }
            for p in grid.paginate(count) {
                prop_assert_eq!(p.starts_page(), p.index % preset == 0);
                prop_assert!(pages[p.page].contains(&p.index));
            }
        }
    }
}
