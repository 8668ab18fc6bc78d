use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use super::{Point, RenderSurface, draw_label};
use crate::config::{LabelRecord, LayoutConfig};

/// Labels per page, laid out in rows and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub columns: usize,
    pub rows: usize,
}

/// Where one label lands: page, then row and column within the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub page: usize,
    pub row: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetSummary {
    pub labels: usize,
    pub pages: usize,
}

impl Grid {
    /// How many labels fit across and down the page inside the margins.
    pub fn for_page(config: &LayoutConfig) -> Result<Grid> {
        let pitch = config.label_size + config.gap;
        let columns = ((config.page_width - 2.0 * config.margin) / pitch).floor().max(0.0) as usize;
        let rows = ((config.page_height - 2.0 * config.margin) / pitch).floor().max(0.0) as usize;

        if columns == 0 || rows == 0 {
            bail!(
                "a {:.1}pt label does not fit on a {:.1}x{:.1}pt page",
                config.label_size,
                config.page_width,
                config.page_height
            );
        }
        Ok(Grid { columns, rows })
    }

    pub fn capacity(&self) -> usize {
        self.columns * self.rows
    }

    /// Row-major cell for the label at `position`.
    pub fn cell(&self, position: usize) -> GridCell {
        let index = position % self.capacity();
        GridCell {
            page: position / self.capacity(),
            row: index / self.columns,
            column: index % self.columns,
        }
    }

    /// Bottom-left corner of the label in `cell`.
    pub fn origin(&self, cell: GridCell, config: &LayoutConfig) -> Point {
        let pitch = config.label_size + config.gap;
        Point {
            x: config.margin + cell.column as f64 * pitch,
            y: config.page_height - config.margin - (cell.row + 1) as f64 * pitch,
        }
    }

    pub fn pages_for(&self, labels: usize) -> usize {
        labels.div_ceil(self.capacity()).max(1)
    }
}

/// Draw every record at its grid cell, starting a new page whenever the
/// current one is full.
pub fn compose_sheet<S: RenderSurface + ?Sized>(
    surface: &mut S,
    records: &[LabelRecord],
    config: &LayoutConfig,
) -> Result<SheetSummary> {
    let grid = Grid::for_page(config)?;
    info!(columns = grid.columns, rows = grid.rows, labels = records.len(), "composing label sheet");

    let mut page = 0;
    for (position, record) in records.iter().enumerate() {
        let cell = grid.cell(position);
        if cell.page != page {
            surface.show_page();
            page = cell.page;
            info!(page = page + 1, "starting new page");
        }
        let layout = draw_label(&mut *surface, grid.origin(cell, config), record, config)
            .with_context(|| format!("Failed to draw label {}", position + 1))?;
        debug!(
            position,
            row = cell.row,
            column = cell.column,
            title_baseline = layout.title_baseline,
            title_fits = layout.title_fits,
            body_font_size = ?layout.body_font_size,
            divider_y = layout.divider_y,
            "placed label"
        );
    }

    Ok(SheetSummary { labels: records.len(), pages: grid.pages_for(records.len()) })
}
