use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_GRID_CELLS;
use crate::error::{GridError, Result};

/// Paper and square measurements that define a grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfiguration {
    pub square_size: f64,
    pub paper_width: f64,
    pub paper_height: f64,
}

impl GridConfiguration {
    /// Validates the measurements. Rejects non-finite or non-positive values,
    /// configurations whose square does not fit the paper at least once in
    /// each direction, and grids with more than `MAX_GRID_CELLS` squares.
    pub fn new(square_size: f64, paper_width: f64, paper_height: f64) -> Result<Self> {
        for (name, v) in [
            ("square size", square_size),
            ("paper width", paper_width),
            ("paper height", paper_height),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(GridError::InvalidConfiguration(format!(
                    "{name} must be a positive number, got {v}"
                )));
            }
        }
        let cfg = GridConfiguration {
            square_size,
            paper_width,
            paper_height,
        };
        let dims = cfg.dims();
        if dims.is_degenerate() {
            return Err(GridError::InvalidConfiguration(format!(
                "square size {square_size} exceeds paper {paper_width}×{paper_height}"
            )));
        }
        if dims.total() > MAX_GRID_CELLS {
            return Err(GridError::InvalidConfiguration(format!(
                "{}×{} grid has more than {MAX_GRID_CELLS} squares",
                dims.columns, dims.rows
            )));
        }
        Ok(cfg)
    }

    pub fn dims(&self) -> GridDims {
        compute_grid(self.paper_width, self.paper_height, self.square_size)
    }

    /// Width over height of the paper; the crop region must match it.
    pub fn aspect_ratio(&self) -> f64 {
        self.paper_width / self.paper_height
    }
}

/// Column and row counts of a grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDims {
    pub columns: u32,
    pub rows: u32,
}

impl GridDims {
    pub fn total(&self) -> u64 {
        u64::from(self.columns) * u64::from(self.rows)
    }

    pub fn is_degenerate(&self) -> bool {
        self.columns == 0 || self.rows == 0
    }

    pub fn contains(&self, cell: GridCell) -> bool {
        cell.row < self.rows && cell.col < self.columns
    }
}

/// `columns = floor(paper_width / square_size)`, `rows = floor(paper_height / square_size)`.
/// Anything that does not yield a finite non-negative count collapses to 0.
pub fn compute_grid(paper_width: f64, paper_height: f64, square_size: f64) -> GridDims {
    let count = |len: f64| -> u32 {
        let n = (len / square_size).floor();
        if n.is_finite() && n > 0.0 {
            n.min(u32::MAX as f64) as u32
        } else {
            0
        }
    };
    GridDims {
        columns: count(paper_width),
        rows: count(paper_height),
    }
}

/// One grid square. Serialized as the composite key `"row-col"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub row: u32,
    pub col: u32,
}

impl GridCell {
    pub fn new(row: u32, col: u32) -> Self {
        GridCell { row, col }
    }

    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.col)
    }
}

impl FromStr for GridCell {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || GridError::Validation(format!("malformed cell key '{s}'"));
        let (r, c) = s.split_once('-').ok_or_else(bad)?;
        let row = r.trim().parse::<u32>().map_err(|_| bad())?;
        let col = c.trim().parse::<u32>().map_err(|_| bad())?;
        Ok(GridCell { row, col })
    }
}

/// Pixel rectangle of a cell in canvas space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CellRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CellRect {
    /// Closed containment on all four edges.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// `width = canvas_width / columns`, `height = canvas_height / rows`,
/// `x = col * width`, `y = row * height`.
/// Returns `None` for a degenerate grid or a cell outside it.
pub fn compute_cell_rect(
    canvas_width: f64,
    canvas_height: f64,
    dims: GridDims,
    cell: GridCell,
) -> Option<CellRect> {
    if dims.is_degenerate() || !dims.contains(cell) {
        return None;
    }
    let width = canvas_width / dims.columns as f64;
    let height = canvas_height / dims.rows as f64;
    Some(CellRect {
        x: cell.col as f64 * width,
        y: cell.row as f64 * height,
        width,
        height,
    })
}

/// A grid bound to a concrete canvas size. The overlay renderer and the
/// hit-tester both derive their rectangles from this, so they agree exactly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLayout {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub dims: GridDims,
}

impl GridLayout {
    pub fn new(canvas_width: f64, canvas_height: f64, dims: GridDims) -> Self {
        GridLayout {
            canvas_width,
            canvas_height,
            dims,
        }
    }

    pub fn cell_width(&self) -> f64 {
        self.canvas_width / self.dims.columns as f64
    }

    pub fn cell_height(&self) -> f64 {
        self.canvas_height / self.dims.rows as f64
    }

    pub fn cell_rect(&self, cell: GridCell) -> Option<CellRect> {
        compute_cell_rect(self.canvas_width, self.canvas_height, self.dims, cell)
    }

    /// Every cell with its rectangle, in row-major order. Empty for a degenerate grid.
    pub fn cells(&self) -> Vec<(GridCell, CellRect)> {
        let mut out = Vec::with_capacity(self.dims.total().min(MAX_GRID_CELLS) as usize);
        for row in 0..self.dims.rows {
            for col in 0..self.dims.columns {
                let cell = GridCell { row, col };
                if let Some(rect) = self.cell_rect(cell) {
                    out.push((cell, rect));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn landscape_sheet_with_two_inch_squares() {
        let dims = compute_grid(24.0, 18.0, 2.0);
        assert_eq!(dims, GridDims { columns: 12, rows: 9 });
        assert_eq!(dims.total(), 108);
    }

    #[test]
    fn counts_floor_partial_squares() {
        let dims = compute_grid(18.0, 24.0, 5.0);
        assert_eq!((dims.columns, dims.rows), (3, 4));
        let dims = compute_grid(7.9, 3.99, 0.5);
        assert_eq!((dims.columns, dims.rows), (15, 7));
    }

    #[test]
    fn oversized_square_is_degenerate() {
        let dims = compute_grid(10.0, 30.0, 12.0);
        assert_eq!(dims.columns, 0);
        assert!(dims.is_degenerate());
        assert!(compute_cell_rect(100.0, 100.0, dims, GridCell::new(0, 0)).is_none());
        assert!(GridLayout::new(100.0, 100.0, dims).cells().is_empty());
    }

    #[test]
    fn zero_or_negative_square_yields_no_cells() {
        assert_eq!(compute_grid(10.0, 10.0, 0.0), GridDims::default());
        assert_eq!(compute_grid(10.0, 10.0, -1.0), GridDims::default());
    }

    #[test]
    fn configuration_rejects_bad_measurements() {
        assert!(matches!(
            GridConfiguration::new(0.0, 18.0, 24.0),
            Err(GridError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            GridConfiguration::new(2.0, f64::NAN, 24.0),
            Err(GridError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            GridConfiguration::new(30.0, 18.0, 24.0),
            Err(GridError::InvalidConfiguration(_))
        ));
        let cfg = GridConfiguration::new(2.0, 18.0, 24.0).unwrap();
        assert_eq!(cfg.dims(), GridDims { columns: 9, rows: 12 });
        assert!((cfg.aspect_ratio() - 0.75).abs() < EPS);
    }

    #[test]
    fn huge_grids_are_rejected_without_overflow() {
        let dims = compute_grid(70000.0, 70000.0, 1.0);
        assert_eq!(dims.total(), 4_900_000_000);
        assert!(matches!(
            GridConfiguration::new(1.0, 70000.0, 70000.0),
            Err(GridError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            GridConfiguration::new(0.001, 100.0, 100.0),
            Err(GridError::InvalidConfiguration(_))
        ));
        let widest = GridConfiguration::new(0.5, 100.0, 100.0).unwrap();
        assert_eq!(widest.dims().total(), 40_000);
    }

    #[test]
    fn cell_count_matches_distinct_rectangles() {
        for (pw, ph, sq) in [(24.0, 18.0, 2.0), (18.0, 24.0, 1.5), (11.0, 8.5, 0.5), (5.0, 5.0, 5.0)] {
            let dims = compute_grid(pw, ph, sq);
            assert_eq!(dims.columns, (pw / sq).floor() as u32);
            assert_eq!(dims.rows, (ph / sq).floor() as u32);
            let cells = GridLayout::new(1234.0, 987.0, dims).cells();
            assert_eq!(cells.len() as u64, dims.total());
            let mut keys: Vec<String> = cells.iter().map(|(c, _)| c.key()).collect();
            keys.sort();
            keys.dedup();
            assert_eq!(keys.len() as u64, dims.total());
        }
    }

    #[test]
    fn rectangles_partition_the_canvas() {
        let layout = GridLayout::new(1000.0, 750.0, compute_grid(24.0, 18.0, 2.0));
        let cells = layout.cells();
        for row in 0..layout.dims.rows {
            let sum: f64 = cells
                .iter()
                .filter(|(c, _)| c.row == row)
                .map(|(_, r)| r.width)
                .sum();
            assert!((sum - 1000.0).abs() < 1e-6);
        }
        for col in 0..layout.dims.columns {
            let sum: f64 = cells
                .iter()
                .filter(|(c, _)| c.col == col)
                .map(|(_, r)| r.height)
                .sum();
            assert!((sum - 750.0).abs() < 1e-6);
        }
        // interiors never overlap
        for (i, (_, a)) in cells.iter().enumerate() {
            for (_, b) in cells.iter().skip(i + 1) {
                let ox = (a.x + a.width).min(b.x + b.width) - a.x.max(b.x);
                let oy = (a.y + a.height).min(b.y + b.height) - a.y.max(b.y);
                assert!(ox <= EPS || oy <= EPS);
            }
        }
    }

    #[test]
    fn cell_rect_follows_formula() {
        let dims = GridDims { columns: 4, rows: 3 };
        let r = compute_cell_rect(800.0, 600.0, dims, GridCell::new(2, 3)).unwrap();
        assert_eq!(r, CellRect { x: 600.0, y: 400.0, width: 200.0, height: 200.0 });
        assert!(compute_cell_rect(800.0, 600.0, dims, GridCell::new(3, 0)).is_none());
    }

    #[test]
    fn cell_keys_round_trip_through_text() {
        let cell = GridCell::new(7, 11);
        assert_eq!(cell.key(), "7-11");
        assert_eq!("7-11".parse::<GridCell>().unwrap(), cell);
        assert!("7".parse::<GridCell>().is_err());
        assert!("a-1".parse::<GridCell>().is_err());
        assert!("-1-2".parse::<GridCell>().is_err());
    }
}
