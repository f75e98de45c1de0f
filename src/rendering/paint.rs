/// Display list produced from a module grid

use super::layout::{CellLayout, Rect};
use crate::{Color, SymbolGrid};

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    /// Fill the whole canvas
    Clear { color: Color },
    SolidRect { rect: Rect, color: Color },
}

/// Build the display list for `grid`: one clear, then one rect per
/// horizontal run of dark modules. Runs never overlap.
pub fn paint_grid(
    grid: &SymbolGrid,
    layout: &CellLayout,
    foreground: Color,
    background: Color,
) -> Vec<PaintCommand> {
    let n = grid.module_count();
    let mut commands = vec![PaintCommand::Clear { color: background }];

    for row in 0..n {
        let mut col = 0;
        while col < n {
            if !grid.dark(row, col) {
                col += 1;
                continue;
            }
            let start = col;
            while col < n && grid.dark(row, col) {
                col += 1;
            }
            // n fits in u32, checked by CellLayout::compute
            let rect = layout.run_rect(row as u32, start as u32, (col - start) as u32);
            commands.push(PaintCommand::SolidRect { rect, color: foreground });
        }
    }

    commands
}
