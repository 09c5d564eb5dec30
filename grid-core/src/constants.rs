//! Defaults shared by every front-end.
//! Paper and square sizes are expressed in inches.

/// Square size used when a project document omits it.
pub const DEFAULT_SQUARE_SIZE: f64 = 2.0;
/// Paper width used when a project document omits it.
pub const DEFAULT_PAPER_WIDTH: f64 = 18.0;
/// Paper height used when a project document omits it.
pub const DEFAULT_PAPER_HEIGHT: f64 = 24.0;
pub const DEFAULT_IMPORT_TITLE: &str = "Imported Project";
pub const DEFAULT_EXPORT_TITLE: &str = "Untitled Project";

/// Initial values of the settings form (landscape sheet).
pub const FORM_SQUARE_SIZE: f64 = 2.0;
pub const FORM_PAPER_WIDTH: f64 = 24.0;
pub const FORM_PAPER_HEIGHT: f64 = 18.0;
pub const SQUARE_SIZE_MIN: f64 = 0.5;
pub const SQUARE_SIZE_MAX: f64 = 4.0;
pub const PAPER_SIZE_MIN: f64 = 1.0;
pub const PAPER_SIZE_MAX: f64 = 100.0;
/// Upper bound on squares per grid; the form ranges top out at 200×200.
pub const MAX_GRID_CELLS: u64 = 250_000;

pub const ZOOM_MIN: f64 = 0.5;
pub const ZOOM_MAX: f64 = 2.0;
pub const ZOOM_STEP: f64 = 0.1;

/// Longest side of the zoomed cell view (px).
pub const CELL_VIEW_MAX_DIMENSION: u32 = 1000;
/// Divisions of the reference sub-grid drawn over a zoomed cell.
pub const CELL_SUBGRID_DIVISIONS: u32 = 4;

pub const STORAGE_KEY: &str = "grid-drawing-storage";
