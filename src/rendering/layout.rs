/// Cell geometry for painting a module grid

use crate::{Error, Result, MAX_TARGET_SIZE_PX};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// How a grid of `module_count` modules maps onto pixels.
///
/// Every module becomes a `cell_size × cell_size` square; the image side is
/// `module_count * cell_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLayout {
    pub module_count: u32,
    pub cell_size: u32,
}

impl CellLayout {
    /// Fit `module_count` cells into `target_size_px`, rounding the cell size
    /// down. Targets smaller than the module count still get 1px cells.
    ///
    /// The resulting side never exceeds [`MAX_TARGET_SIZE_PX`], so the RGBA
    /// buffer length always fits in a `usize`.
    pub fn compute(module_count: usize, target_size_px: u32) -> Result<Self> {
        if module_count == 0 {
            return Err(Error::InvalidGrid("module count must be at least 1".into()));
        }
        if target_size_px == 0 {
            return Err(Error::InvalidConfig("target size must be greater than 0".into()));
        }
        if target_size_px > MAX_TARGET_SIZE_PX {
            return Err(Error::InvalidConfig(format!(
                "target size {}px exceeds the maximum of {}px",
                target_size_px, MAX_TARGET_SIZE_PX
            )));
        }
        let module_count = u32::try_from(module_count)
            .map_err(|_| Error::InvalidGrid(format!("module count {} is too large", module_count)))?;

        let cell_size = (target_size_px / module_count).max(1);
        let side = module_count
            .checked_mul(cell_size)
            .filter(|side| *side <= MAX_TARGET_SIZE_PX)
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "{} modules need more than {}px per side",
                    module_count, MAX_TARGET_SIZE_PX
                ))
            })?;
        let layout = Self { module_count, cell_size };
        layout.buffer_len().ok_or_else(|| {
            Error::InvalidConfig(format!("a {}px square bitmap is too large to allocate", side))
        })?;

        Ok(layout)
    }

    /// RGBA8 byte length of the painted image, `None` on overflow
    pub fn buffer_len(&self) -> Option<usize> {
        let side = usize::try_from(self.actual_size()).ok()?;
        side.checked_mul(side)?.checked_mul(4)
    }

    /// Side length of the painted image
    pub fn actual_size(&self) -> u32 {
        self.module_count * self.cell_size
    }

    /// True when the requested size was too small for one pixel per module
    pub fn is_degraded(&self, target_size_px: u32) -> bool {
        target_size_px < self.module_count
    }

    pub fn cell_rect(&self, row: u32, col: u32) -> Rect {
        self.run_rect(row, col, 1)
    }

    /// Rect covering `len` consecutive cells of `row` starting at `col`
    pub fn run_rect(&self, row: u32, col: u32, len: u32) -> Rect {
        Rect {
            x: col * self.cell_size,
            y: row * self.cell_size,
            width: len * self.cell_size,
            height: self.cell_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_size_rounds_down() {
        let l = CellLayout::compute(21, 300).unwrap();
        assert_eq!(l.cell_size, 14);
        assert_eq!(l.actual_size(), 294);
        assert!(!l.is_degraded(300));
    }

    #[test]
    fn tiny_targets_clamp_to_one_pixel() {
        let l = CellLayout::compute(25, 10).unwrap();
        assert_eq!(l.cell_size, 1);
        assert_eq!(l.actual_size(), 25);
        assert!(l.is_degraded(10));
    }

    #[test]
    fn rejects_empty_inputs() {
        assert!(matches!(CellLayout::compute(0, 100), Err(Error::InvalidGrid(_))));
        assert!(matches!(CellLayout::compute(21, 0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn oversized_targets_are_rejected() {
        let max = CellLayout::compute(21, MAX_TARGET_SIZE_PX).unwrap();
        assert!(max.actual_size() <= MAX_TARGET_SIZE_PX);
        assert_eq!(max.buffer_len(), Some(max.actual_size() as usize * max.actual_size() as usize * 4));

        for target in [MAX_TARGET_SIZE_PX + 1, 100_000, u32::MAX] {
            assert!(matches!(
                CellLayout::compute(21, target),
                Err(Error::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn huge_grids_are_rejected_even_at_one_pixel_cells() {
        let n = MAX_TARGET_SIZE_PX as usize + 1;
        assert!(matches!(CellLayout::compute(n, 10), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn run_rects_span_cells() {
        let l = CellLayout::compute(10, 40).unwrap();
        assert_eq!(l.cell_rect(1, 2), Rect { x: 8, y: 4, width: 4, height: 4 });
        assert_eq!(l.run_rect(0, 3, 3), Rect { x: 12, y: 0, width: 12, height: 4 });
    }
}
