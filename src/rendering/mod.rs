//! Rendering pipeline: cell layout, paint display list, RGBA raster

pub mod layout;
pub mod paint;
pub mod raster;

use crate::Color;
use layout::CellLayout;
use paint::PaintCommand;

/// A rasterized symbol
///
/// `pixels` is tightly packed RGBA8, row-major, `width * height * 4` bytes.
/// The display list that produced the pixels is kept so vector exporters can
/// re-express the same picture without sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    layout: CellLayout,
    commands: Vec<PaintCommand>,
}

impl Bitmap {
    pub(crate) fn blank(layout: CellLayout) -> Self {
        let side = layout.actual_size();
        Self {
            width: side,
            height: side,
            pixels: vec![0; side as usize * side as usize * 4],
            layout,
            commands: Vec::new(),
        }
    }

    /// Pixels per module edge
    pub fn cell_size(&self) -> u32 {
        self.layout.cell_size
    }

    pub fn module_count(&self) -> u32 {
        self.layout.module_count
    }

    pub fn display_list(&self) -> &[PaintCommand] {
        &self.commands
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.pixels[i..i + 4];
        Some(Color::rgba(p[0], p[1], p[2], p[3]))
    }

    /// Number of pixels exactly equal to `color`
    pub fn count_pixels(&self, color: Color) -> usize {
        let px = color.to_array();
        self.pixels.chunks_exact(4).filter(|c| *c == px).count()
    }

    /// Packed RGB8 copy, dropping alpha
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(4)
            .flat_map(|c| [c[0], c[1], c[2]])
            .collect()
    }
}
