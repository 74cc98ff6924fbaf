//! Composite pixel masks.
//!
//! A mask marks pixels as invalid (beam block, detector seams, hot spots).
//! It is built from circular and rectangular regions and consulted by both
//! the radial averager and the center refiner.

use std::ops::Range;

use nalgebra::DMatrix;

/// Invalid-pixel map with the same shape as the image it applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    invalid: DMatrix<bool>,
}

impl Mask {
    /// A mask of the given shape with every pixel valid.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            invalid: DMatrix::from_element(rows, cols, false),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.invalid.shape()
    }

    /// Invalidate every pixel within `radius` of `(row, col)`, boundary included.
    pub fn with_circle(mut self, row: f64, col: f64, radius: f64) -> Self {
        let (rows, cols) = self.shape();
        if rows == 0 || cols == 0 || !(radius >= 0.0) {
            return self;
        }
        let r0 = (row - radius).floor().max(0.0) as usize;
        let r1 = (row + radius).ceil().min((rows - 1) as f64);
        let c0 = (col - radius).floor().max(0.0) as usize;
        let c1 = (col + radius).ceil().min((cols - 1) as f64);
        if r1 < 0.0 || c1 < 0.0 {
            return self;
        }
        for i in r0..=r1 as usize {
            for j in c0..=c1 as usize {
                if (i as f64 - row).hypot(j as f64 - col) <= radius {
                    self.invalid[(i, j)] = true;
                }
            }
        }
        self
    }

    /// Invalidate a rectangular block; ranges are clamped to the mask.
    pub fn with_rectangle(mut self, rows: Range<usize>, cols: Range<usize>) -> Self {
        let (nrows, ncols) = self.shape();
        for i in rows.start.min(nrows)..rows.end.min(nrows) {
            for j in cols.start.min(ncols)..cols.end.min(ncols) {
                self.invalid[(i, j)] = true;
            }
        }
        self
    }

    #[inline]
    pub fn is_masked(&self, row: usize, col: usize) -> bool {
        self.invalid[(row, col)]
    }

    pub fn masked_count(&self) -> usize {
        self.invalid.iter().filter(|&&m| m).count()
    }
}
