use ab_glyph::FontArc;
use image::RgbaImage;
use rand::Rng;

use crate::{
    composite,
    model::{Rgb, StickerOptions},
    template::Slot,
    text,
};

/// Occupancy cell size in canvas pixels.
pub const GRID_CELL: u32 = 100;
/// Candidate positions tried per sticker before it is dropped.
pub const MAX_ATTEMPTS: u32 = 50;

/// Coarse reservation grid over the canvas; lives for one compose call.
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    cols: u32,
    rows: u32,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    pub fn new(width: u32, height: u32) -> Self {
        let cols = width.div_ceil(GRID_CELL).max(1);
        let rows = height.div_ceil(GRID_CELL).max(1);
        Self {
            cols,
            rows,
            cells: vec![false; (cols as usize) * (rows as usize)],
        }
    }

    /// Mark every cell the slot rectangle touches.
    pub fn reserve_slot(&mut self, slot: &Slot) {
        if slot.width() == 0 || slot.height() == 0 {
            return;
        }
        let c0 = slot.left / GRID_CELL;
        let c1 = ((slot.right - 1) / GRID_CELL).min(self.cols - 1);
        let r0 = slot.top / GRID_CELL;
        let r1 = ((slot.bottom - 1) / GRID_CELL).min(self.rows - 1);
        for row in r0..=r1 {
            for col in c0..=c1 {
                self.cells[(row * self.cols + col) as usize] = true;
            }
        }
    }

    /// Whether the cell containing canvas point `(x, y)` is unreserved.
    pub fn is_free(&self, x: u32, y: u32) -> bool {
        !self.cells[self.cell_index(x, y)]
    }

    pub fn reserve_point(&mut self, x: u32, y: u32) {
        let idx = self.cell_index(x, y);
        self.cells[idx] = true;
    }

    pub fn cell_of(&self, x: u32, y: u32) -> (u32, u32) {
        (
            (x / GRID_CELL).min(self.cols - 1),
            (y / GRID_CELL).min(self.rows - 1),
        )
    }

    fn cell_index(&self, x: u32, y: u32) -> usize {
        let (col, row) = self.cell_of(x, y);
        (row * self.cols + col) as usize
    }
}

/// A successfully placed sticker; `x`/`y` is the pre-rotation top-left
/// position the candidate draw chose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Place each sticker independently: up to [`MAX_ATTEMPTS`] uniform draws
/// over the positions where the measured glyph box fits, accepting the first
/// whose grid cell is unreserved. Exhaustion drops the sticker silently; the
/// canvas is untouched for dropped stickers.
pub fn place_stickers<R: Rng>(
    canvas: &mut RgbaImage,
    opts: &StickerOptions,
    color: Rgb,
    occupied: &[Slot],
    font: &FontArc,
    rng: &mut R,
) -> Vec<Placement> {
    let (cw, ch) = canvas.dimensions();
    let mut grid = OccupancyGrid::new(cw, ch);
    for slot in occupied {
        grid.reserve_slot(slot);
    }

    let mut placed = Vec::new();
    for sticker in &opts.texts {
        if sticker.trim().is_empty() {
            continue;
        }
        let (sw, sh) = text::measure(font, sticker, opts.size);
        if sw > cw || sh > ch {
            tracing::debug!(text = %sticker, "sticker larger than canvas, dropped");
            continue;
        }

        let mut chosen = None;
        for _ in 0..MAX_ATTEMPTS {
            let x = rng.gen_range(0..=cw - sw);
            let y = rng.gen_range(0..=ch - sh);
            if grid.is_free(x, y) {
                chosen = Some((x, y));
                break;
            }
        }
        let Some((x, y)) = chosen else {
            tracing::debug!(text = %sticker, attempts = MAX_ATTEMPTS, "sticker placement exhausted, dropped");
            continue;
        };

        grid.reserve_point(x, y);
        let buf = text::render(font, sticker, opts.size, color, opts.opacity);
        let buf = text::rotate(&buf, opts.rotation);
        composite::overlay(canvas, &buf, i64::from(x), i64::from(y));
        placed.push(Placement {
            x,
            y,
            width: sw,
            height: sh,
        });
    }
    placed
}
