//! Raster side of the grid engine: the zoomed cell view, the grid overlay,
//! crop previews and the printable page. Every renderer takes pixmaps and
//! parameters and returns a new pixmap; nothing here touches a display.

pub mod cell;
pub mod data_url;
pub mod overlay;
pub mod print;
pub mod raster;
pub mod text;

pub use cell::{cell_output_size, render_cell};
pub use data_url::{decode_data_url, encode_data_url, png_data_url};
pub use overlay::{OverlayOptions, append_footer, render_crop_preview, render_overlay};
pub use print::print_document;
pub use raster::{crop_raster, encode_png, pixmap_from_rgba, pixmap_to_rgba, rotate_raster};
pub use text::{LabelFonts, TextLayer, TextRun};
