use grid_core::{CellRect, GridError, Result, Rotation};
use tiny_skia::{FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform};

use crate::raster::rotate_raster;

const SUBGRID_RGBA: [u8; 4] = [255, 255, 255, 128];
const SUBGRID_WIDTH: f32 = 2.0;

/// Unrotated output size for a cell: longer side `max_dimension`, shorter
/// side scaled to keep the cell's aspect ratio.
pub fn cell_output_size(cell_width: f64, cell_height: f64, max_dimension: u32) -> Option<(u32, u32)> {
    if !(cell_width > 0.0 && cell_height > 0.0) || max_dimension == 0 {
        return None;
    }
    let max = max_dimension as f64;
    let aspect = cell_width / cell_height;
    let (w, h) = if aspect > 1.0 {
        (max, max / aspect)
    } else {
        (max * aspect, max)
    };
    Some(((w.round() as u32).max(1), (h.round() as u32).max(1)))
}

/// Renders one cell of `source` for the detail view.
///
/// The cell is sampled from the full-resolution source, overlaid with a
/// `subgrid`×`subgrid` reference grid and turned by `rotation`; 90° and 270°
/// swap the output axes.
pub fn render_cell(
    source: Option<&Pixmap>,
    rect: &CellRect,
    rotation: Rotation,
    max_dimension: u32,
    subgrid: u32,
) -> Result<Pixmap> {
    let source =
        source.ok_or_else(|| GridError::Render("source image is not loaded yet".to_string()))?;
    let (sw, sh) = (source.width() as f64, source.height() as f64);
    // half a pixel of slack for rounding in the caller's layout
    if rect.x < -0.5 || rect.y < -0.5 || rect.x + rect.width > sw + 0.5 || rect.y + rect.height > sh + 0.5 {
        return Err(GridError::Render(
            "cell selection does not fit the current image".to_string(),
        ));
    }
    let (w, h) = cell_output_size(rect.width, rect.height, max_dimension)
        .ok_or_else(|| GridError::Render("cell has no area".to_string()))?;

    let mut out =
        Pixmap::new(w, h).ok_or_else(|| GridError::Render("pixmap alloc failed".to_string()))?;
    let sx = w as f64 / rect.width;
    let sy = h as f64 / rect.height;
    let transform = Transform::from_translate(-rect.x as f32, -rect.y as f32)
        .post_scale(sx as f32, sy as f32);
    let paint = PixmapPaint {
        quality: FilterQuality::Bicubic,
        ..PixmapPaint::default()
    };
    out.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);

    draw_subgrid(&mut out, subgrid);
    rotate_raster(&out, rotation)
}

fn draw_subgrid(pixmap: &mut Pixmap, divisions: u32) {
    if divisions < 2 {
        return;
    }
    let (w, h) = (pixmap.width() as f32, pixmap.height() as f32);
    let mut pb = PathBuilder::new();
    for i in 1..divisions {
        let t = i as f32 / divisions as f32;
        pb.move_to(t * w, 0.0);
        pb.line_to(t * w, h);
        pb.move_to(0.0, t * h);
        pb.line_to(w, t * h);
    }
    let Some(path) = pb.finish() else {
        return;
    };
    let mut paint = Paint::default();
    let [r, g, b, a] = SUBGRID_RGBA;
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    let stroke = Stroke {
        width: SUBGRID_WIDTH,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::pixmap_from_rgba;

    /// Left half red, right half blue.
    fn halves(w: u32, h: u32) -> Pixmap {
        let mut rgba = Vec::new();
        for _ in 0..h {
            for x in 0..w {
                if x < w / 2 {
                    rgba.extend_from_slice(&[255, 0, 0, 255]);
                } else {
                    rgba.extend_from_slice(&[0, 0, 255, 255]);
                }
            }
        }
        pixmap_from_rgba(w, h, &rgba).unwrap()
    }

    fn rect(x: f64, y: f64, width: f64, height: f64) -> CellRect {
        CellRect { x, y, width, height }
    }

    #[test]
    fn output_keeps_cell_aspect() {
        assert_eq!(cell_output_size(100.0, 100.0, 1000), Some((1000, 1000)));
        assert_eq!(cell_output_size(300.0, 100.0, 100), Some((100, 33)));
        assert_eq!(cell_output_size(50.0, 100.0, 100), Some((50, 100)));
        assert_eq!(cell_output_size(0.0, 100.0, 100), None);
        assert_eq!(cell_output_size(10.0, 10.0, 0), None);
    }

    #[test]
    fn missing_source_is_a_render_error() {
        let r = render_cell(None, &rect(0.0, 0.0, 10.0, 10.0), Rotation::Deg0, 100, 4);
        assert!(matches!(r, Err(GridError::Render(_))));
    }

    #[test]
    fn stale_selection_is_rejected() {
        let src = halves(100, 100);
        let r = render_cell(Some(&src), &rect(80.0, 0.0, 50.0, 50.0), Rotation::Deg0, 100, 4);
        assert!(matches!(r, Err(GridError::Render(_))));
    }

    #[test]
    fn samples_the_selected_cell() {
        let src = halves(200, 100);
        let out = render_cell(Some(&src), &rect(100.0, 0.0, 100.0, 100.0), Rotation::Deg0, 40, 4)
            .unwrap();
        assert_eq!((out.width(), out.height()), (40, 40));
        let px = out.pixel(5, 5).unwrap();
        assert!(px.blue() > 200 && px.red() < 50);
    }

    #[test]
    fn quarter_turn_swaps_output_axes() {
        let src = halves(200, 100);
        let whole = rect(0.0, 0.0, 200.0, 100.0);
        let flat = render_cell(Some(&src), &whole, Rotation::Deg0, 100, 4).unwrap();
        assert_eq!((flat.width(), flat.height()), (100, 50));
        let turned = render_cell(Some(&src), &whole, Rotation::Deg90, 100, 4).unwrap();
        assert_eq!((turned.width(), turned.height()), (50, 100));
        // clockwise: the red left half ends up on top
        assert!(turned.pixel(5, 5).unwrap().red() > 200);
        assert!(turned.pixel(5, 95).unwrap().blue() > 200);
        let half = render_cell(Some(&src), &whole, Rotation::Deg180, 100, 4).unwrap();
        assert_eq!((half.width(), half.height()), (100, 50));
        assert!(half.pixel(5, 5).unwrap().blue() > 200);
    }

    #[test]
    fn subgrid_lines_are_drawn() {
        let black = pixmap_from_rgba(8, 8, &[0, 0, 0, 255].repeat(64)).unwrap();
        let out = render_cell(Some(&black), &rect(0.0, 0.0, 8.0, 8.0), Rotation::Deg0, 100, 4)
            .unwrap();
        assert!(out.pixel(25, 10).unwrap().red() > 60);
        assert!(out.pixel(10, 50).unwrap().red() > 60);
        assert!(out.pixel(10, 10).unwrap().red() < 10);
    }
}
