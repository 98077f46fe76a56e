// Block wipe: viewport grid geometry and the diagonal fall-away schedule.

use std::time::Duration;

use crate::config::{OverlayTiming, GRID_BREAKPOINTS, WIDE_VIEWPORT_COLUMNS};

/// Grid covering the viewport, fixed for the overlay's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    pub columns: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub viewport_height: u32,
}

/// One falling block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WipeCell {
    pub row: u32,
    pub col: u32,
    pub x: u32,
    pub y: u32,
    pub delay: Duration,
    /// Vertical travel that takes the cell past the bottom edge.
    pub fall_distance: u32,
}

impl GridSpec {
    /// Compute square cells for the viewport. Rows overshoot the height by at
    /// least one cell so the last row never leaves a gap at the bottom.
    pub fn compute(viewport_width: u32, viewport_height: u32) -> Self {
        let columns = columns_for_width(viewport_width);
        let cell_width = viewport_width.div_ceil(columns).max(1);
        let cell_height = cell_width;
        let rows = viewport_height.div_ceil(cell_height).saturating_add(1);

        Self {
            columns,
            rows,
            cell_width,
            cell_height,
            viewport_height,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Largest `row + col` in the grid.
    pub fn max_diagonal(&self) -> u32 {
        (self.columns - 1).saturating_add(self.rows - 1)
    }

    /// Cells in row-major order with their diagonal stagger applied.
    pub fn cells(&self, stagger: Duration) -> Vec<WipeCell> {
        let fall_distance = self.viewport_height.saturating_add(self.cell_height);
        let mut cells = Vec::with_capacity(self.cell_count());
        for row in 0..self.rows {
            for col in 0..self.columns {
                cells.push(WipeCell {
                    row,
                    col,
                    x: col * self.cell_width,
                    y: row * self.cell_height,
                    delay: stagger * (row + col),
                    fall_distance,
                });
            }
        }
        cells
    }

    /// Time until the last cell has finished falling.
    pub fn wipe_duration(&self, timing: &OverlayTiming) -> Duration {
        timing.block_stagger * self.max_diagonal() + timing.block_drop
    }
}

pub fn columns_for_width(viewport_width: u32) -> u32 {
    GRID_BREAKPOINTS
        .iter()
        .find(|(max_width, _)| viewport_width < *max_width)
        .map(|(_, columns)| *columns)
        .unwrap_or(WIDE_VIEWPORT_COLUMNS)
}
