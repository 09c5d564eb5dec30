//! Geometry engine for proportional grid drawing: grid math, hit-testing,
//! crop seeding, completion tracking and the project session store.

pub mod completion;
pub mod constants;
pub mod crop;
pub mod error;
pub mod geometry;
pub mod hit_test;
pub mod labels;
pub mod rotation;
pub mod session;
pub mod snapshot;

pub use completion::CompletionMap;
pub use crop::{CropRegion, initial_crop};
pub use error::{GridError, Result};
pub use geometry::{
    CellRect, GridCell, GridConfiguration, GridDims, GridLayout, compute_cell_rect, compute_grid,
};
pub use hit_test::{ViewTransform, locate_cell};
pub use labels::{cell_label, column_letters};
pub use rotation::Rotation;
pub use session::{ImageSlot, LoadTicket, Session, Stage};
pub use snapshot::{GridSettings, ProjectSnapshot, export_file_name};
