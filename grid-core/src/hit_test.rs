use crate::constants::{ZOOM_MAX, ZOOM_MIN, ZOOM_STEP};
use crate::geometry::{CellRect, GridCell};

/// Maps device pointer coordinates onto the canvas backing store.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    /// Top-left corner of the displayed canvas in pointer space.
    pub origin: (f64, f64),
    /// Displayed width over backing-store width, before zoom.
    pub scale: f64,
    pub zoom: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        ViewTransform {
            origin: (0.0, 0.0),
            scale: 1.0,
            zoom: 1.0,
        }
    }
}

impl ViewTransform {
    /// Scale that fits an image of `image_width` pixels to the container width.
    pub fn fit_width(container_width: f64, image_width: f64) -> f64 {
        if image_width > 0.0 && container_width > 0.0 {
            container_width / image_width
        } else {
            1.0
        }
    }

    /// `local = (pointer - origin) / (scale * zoom)`; `None` when the view has collapsed.
    pub fn to_local(&self, pointer_x: f64, pointer_y: f64) -> Option<(f64, f64)> {
        let k = self.scale * self.zoom;
        if !k.is_finite() || k <= 0.0 {
            return None;
        }
        Some((
            (pointer_x - self.origin.0) / k,
            (pointer_y - self.origin.1) / k,
        ))
    }

    pub fn zoom_in(&mut self) {
        self.zoom = round_zoom(self.zoom + ZOOM_STEP).min(ZOOM_MAX);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = round_zoom(self.zoom - ZOOM_STEP).max(ZOOM_MIN);
    }
}

// keeps repeated 0.1 steps on exact tenths
fn round_zoom(z: f64) -> f64 {
    (z * 10.0).round() / 10.0
}

/// Finds the cell under the pointer.
///
/// Edges are inclusive on both sides, so a point on a shared edge matches two
/// cells; `cells` is scanned in order and the first match wins. With the
/// row-major order produced by `GridLayout::cells` this resolves shared edges
/// to the lower row and the lower column.
pub fn locate_cell(
    pointer: (f64, f64),
    view: &ViewTransform,
    cells: &[(GridCell, CellRect)],
) -> Option<GridCell> {
    if cells.is_empty() {
        return None;
    }
    let (x, y) = view.to_local(pointer.0, pointer.1)?;
    cells
        .iter()
        .find(|(_, rect)| rect.contains(x, y))
        .map(|(cell, _)| *cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{compute_grid, GridDims, GridLayout};

    fn layout() -> GridLayout {
        GridLayout::new(1200.0, 900.0, compute_grid(24.0, 18.0, 2.0))
    }

    #[test]
    fn every_cell_center_resolves_to_itself() {
        let cells = layout().cells();
        let view = ViewTransform::default();
        for (cell, rect) in &cells {
            assert_eq!(locate_cell(rect.center(), &view, &cells), Some(*cell));
        }
    }

    #[test]
    fn centers_resolve_under_scale_zoom_and_offset() {
        let cells = layout().cells();
        let view = ViewTransform {
            origin: (35.0, 120.0),
            scale: 0.4,
            zoom: 1.7,
        };
        let k = view.scale * view.zoom;
        for (cell, rect) in &cells {
            let (cx, cy) = rect.center();
            let pointer = (cx * k + view.origin.0, cy * k + view.origin.1);
            assert_eq!(locate_cell(pointer, &view, &cells), Some(*cell));
        }
    }

    #[test]
    fn shared_edges_resolve_to_lower_indices() {
        let cells = layout().cells();
        let view = ViewTransform::default();
        // vertical edge between columns 0 and 1, inside row 0
        assert_eq!(locate_cell((100.0, 50.0), &view, &cells), Some(GridCell::new(0, 0)));
        // horizontal edge between rows 2 and 3
        assert_eq!(locate_cell((150.0, 300.0), &view, &cells), Some(GridCell::new(2, 1)));
        // corner shared by four cells
        assert_eq!(locate_cell((200.0, 200.0), &view, &cells), Some(GridCell::new(1, 1)));
        // far edges still belong to the last row/column
        assert_eq!(locate_cell((1200.0, 900.0), &view, &cells), Some(GridCell::new(8, 11)));
    }

    #[test]
    fn outside_points_and_missing_grids_yield_none() {
        let cells = layout().cells();
        let view = ViewTransform::default();
        assert_eq!(locate_cell((-1.0, 10.0), &view, &cells), None);
        assert_eq!(locate_cell((10.0, 900.5), &view, &cells), None);
        assert_eq!(locate_cell((10.0, 10.0), &view, &[]), None);
        let degenerate = GridLayout::new(100.0, 100.0, GridDims::default()).cells();
        assert_eq!(locate_cell((10.0, 10.0), &view, &degenerate), None);
        let collapsed = ViewTransform { scale: 0.0, ..ViewTransform::default() };
        assert_eq!(locate_cell((10.0, 10.0), &collapsed, &cells), None);
    }

    #[test]
    fn hit_testing_is_idempotent() {
        let cells = layout().cells();
        let view = ViewTransform { origin: (3.0, 4.0), scale: 0.5, zoom: 1.2 };
        let first = locate_cell((321.0, 123.0), &view, &cells);
        for _ in 0..3 {
            assert_eq!(locate_cell((321.0, 123.0), &view, &cells), first);
        }
    }

    #[test]
    fn zoom_is_clamped_to_range() {
        let mut view = ViewTransform::default();
        for _ in 0..20 {
            view.zoom_in();
        }
        assert_eq!(view.zoom, 2.0);
        for _ in 0..30 {
            view.zoom_out();
        }
        assert_eq!(view.zoom, 0.5);
        view.zoom_in();
        assert_eq!(view.zoom, 0.6);
    }

    #[test]
    fn fit_width_scales_to_container() {
        assert_eq!(ViewTransform::fit_width(600.0, 1200.0), 0.5);
        assert_eq!(ViewTransform::fit_width(600.0, 0.0), 1.0);
    }
}
