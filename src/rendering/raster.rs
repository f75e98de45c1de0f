/// Rasterizer: module grid → RGBA bitmap

use log::{debug, warn};

use super::layout::CellLayout;
use super::paint::{paint_grid, PaintCommand};
use super::Bitmap;
use crate::{Error, RasterConfig, Result, SymbolGrid};

/// Paint `grid` into a bitmap of side `module_count * floor(target / module_count)`.
///
/// Deterministic: identical inputs produce byte-identical pixels.
pub fn rasterize(grid: &SymbolGrid, config: &RasterConfig) -> Result<Bitmap> {
    if grid.module_count() == 0 {
        return Err(Error::InvalidGrid("module count must be at least 1".into()));
    }
    if config.target_size_px == 0 {
        return Err(Error::InvalidConfig("target size must be greater than 0".into()));
    }

    let layout = CellLayout::compute(grid.module_count(), config.target_size_px)?;
    if layout.is_degraded(config.target_size_px) {
        warn!(
            "target size {}px is smaller than {} modules; using 1px cells",
            config.target_size_px, layout.module_count
        );
    }

    let commands = paint_grid(grid, &layout, config.foreground, config.background);
    let mut bitmap = Bitmap::blank(layout);
    for cmd in &commands {
        execute(&mut bitmap, cmd);
    }
    bitmap.commands = commands;

    debug!(
        "rasterized {}x{} modules at {}px/cell into {}x{}",
        layout.module_count, layout.module_count, layout.cell_size, bitmap.width, bitmap.height
    );
    Ok(bitmap)
}

fn execute(bitmap: &mut Bitmap, cmd: &PaintCommand) {
    match cmd {
        PaintCommand::Clear { color } => {
            let px = color.to_array();
            for chunk in bitmap.pixels.chunks_exact_mut(4) {
                chunk.copy_from_slice(&px);
            }
        }
        PaintCommand::SolidRect { rect, color } => {
            let px = color.to_array();
            let stride = bitmap.width as usize * 4;
            let x0 = rect.x.min(bitmap.width) as usize;
            let x1 = (rect.x + rect.width).min(bitmap.width) as usize;
            let y0 = rect.y.min(bitmap.height) as usize;
            let y1 = (rect.y + rect.height).min(bitmap.height) as usize;
            for y in y0..y1 {
                let row = &mut bitmap.pixels[y * stride + x0 * 4..y * stride + x1 * 4];
                for chunk in row.chunks_exact_mut(4) {
                    chunk.copy_from_slice(&px);
                }
            }
        }
    }
}
