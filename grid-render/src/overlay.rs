use grid_core::{CompletionMap, CropRegion, GridDims, GridError, GridLayout, Result, cell_label};
use tiny_skia::{Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform};

use crate::text::{LabelFonts, TextLayer, TextRun};

pub const LINE_OPACITY_MIN: f32 = 0.1;
pub const LINE_OPACITY_MAX: f32 = 0.8;
pub const LINE_THICKNESS_MIN: f32 = 0.5;
pub const LINE_THICKNESS_MAX: f32 = 2.0;
/// Height of the title/notes band appended below printed overlays (px).
pub const FOOTER_HEIGHT: u32 = 40;
pub const FOOTER_FONT_SIZE: f32 = 14.0;
pub const LABEL_MIN_FONT_SIZE: f32 = 8.0;

/// Grid overlay styling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayOptions {
    pub show_completed: bool,
    pub show_labels: bool,
    pub line_opacity: f32,
    pub line_thickness: f32,
    pub line_rgb: [u8; 3],
    pub completed_rgb: [u8; 3],
    pub completed_opacity: f32,
}

impl OverlayOptions {
    /// On-screen drawing view.
    pub fn screen() -> Self {
        OverlayOptions {
            show_completed: true,
            show_labels: false,
            line_opacity: 0.7,
            line_thickness: 2.0,
            line_rgb: [255, 255, 255],
            completed_rgb: [0, 255, 0],
            completed_opacity: 0.3,
        }
    }

    /// Paper output: faint thin lines, labels on.
    pub fn print() -> Self {
        OverlayOptions {
            show_completed: false,
            show_labels: true,
            line_opacity: 0.3,
            line_thickness: 0.5,
            line_rgb: [0, 0, 0],
            completed_rgb: [0, 255, 0],
            completed_opacity: 0.15,
        }
    }

    pub fn with_line_opacity(mut self, opacity: f32) -> Self {
        self.line_opacity = opacity;
        self.clamped()
    }

    pub fn with_line_thickness(mut self, thickness: f32) -> Self {
        self.line_thickness = thickness;
        self.clamped()
    }

    /// Pulls opacity and thickness back into their supported ranges.
    /// Non-finite values fall back to the lower bound.
    pub fn clamped(mut self) -> Self {
        self.line_opacity = clamp_or_min(self.line_opacity, LINE_OPACITY_MIN, LINE_OPACITY_MAX);
        self.line_thickness =
            clamp_or_min(self.line_thickness, LINE_THICKNESS_MIN, LINE_THICKNESS_MAX);
        self
    }
}

fn clamp_or_min(v: f32, min: f32, max: f32) -> f32 {
    if v.is_finite() { v.clamp(min, max) } else { min }
}

fn alpha_u8(opacity: f32) -> u8 {
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Composites `image` with grid lines, completed-cell fills and cell labels.
///
/// The output has the image's native size. A degenerate grid yields the
/// image alone.
pub fn render_overlay(
    image: &Pixmap,
    dims: GridDims,
    completion: &CompletionMap,
    options: &OverlayOptions,
    fonts: &LabelFonts,
) -> Result<Pixmap> {
    let options = options.clamped();
    let mut out = image.clone();
    if dims.is_degenerate() {
        return Ok(out);
    }
    let (w, h) = (image.width() as f64, image.height() as f64);
    let layout = GridLayout::new(w, h, dims);
    let (cw, ch) = (layout.cell_width(), layout.cell_height());

    let mut pb = PathBuilder::new();
    for col in 0..=dims.columns {
        let x = (col as f64 * cw) as f32;
        pb.move_to(x, 0.0);
        pb.line_to(x, h as f32);
    }
    for row in 0..=dims.rows {
        let y = (row as f64 * ch) as f32;
        pb.move_to(0.0, y);
        pb.line_to(w as f32, y);
    }
    if let Some(path) = pb.finish() {
        let mut paint = Paint::default();
        let [r, g, b] = options.line_rgb;
        paint.set_color_rgba8(r, g, b, alpha_u8(options.line_opacity));
        paint.anti_alias = true;
        let stroke = Stroke {
            width: options.line_thickness,
            ..Stroke::default()
        };
        out.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    if options.show_completed {
        let mut paint = Paint::default();
        let [r, g, b] = options.completed_rgb;
        paint.set_color_rgba8(r, g, b, alpha_u8(options.completed_opacity));
        for cell in completion.completed_cells(dims) {
            let Some(rect) = layout.cell_rect(cell) else {
                continue;
            };
            if let Some(rect) = Rect::from_xywh(
                rect.x as f32,
                rect.y as f32,
                rect.width as f32,
                rect.height as f32,
            ) {
                out.fill_rect(rect, &paint, Transform::identity(), None);
            }
        }
    }

    if options.show_labels {
        let size = ((cw / 8.0).floor() as f32).max(LABEL_MIN_FONT_SIZE);
        let mut layer = TextLayer::new();
        for (cell, rect) in layout.cells() {
            layer.push(TextRun {
                x: rect.x as f32 + 2.0,
                y: rect.y as f32 + 2.0,
                size,
                text: cell_label(cell),
                rgb: options.line_rgb,
                opacity: options.line_opacity,
                max_width: Some((rect.width as f32 - 4.0).max(1.0)),
            });
        }
        layer.render(&mut out, fonts)?;
    }
    Ok(out)
}

/// Appends a white band of `FOOTER_HEIGHT` below `overlay` holding `text`.
/// Empty text returns the overlay unchanged.
pub fn append_footer(overlay: &Pixmap, text: &str, fonts: &LabelFonts) -> Result<Pixmap> {
    if text.trim().is_empty() {
        return Ok(overlay.clone());
    }
    let (w, h) = (overlay.width(), overlay.height());
    let mut out = Pixmap::new(w, h + FOOTER_HEIGHT)
        .ok_or_else(|| GridError::Render("pixmap alloc failed".to_string()))?;
    out.draw_pixmap(0, 0, overlay.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
    if let Some(band) = Rect::from_xywh(0.0, h as f32, w as f32, FOOTER_HEIGHT as f32) {
        let mut paint = Paint::default();
        paint.set_color_rgba8(255, 255, 255, 255);
        out.fill_rect(band, &paint, Transform::identity(), None);
    }
    let mut layer = TextLayer::new();
    layer.push(TextRun {
        x: 10.0,
        y: h as f32 + 10.0,
        size: FOOTER_FONT_SIZE,
        text: text.to_string(),
        rgb: [0, 0, 0],
        opacity: 1.0,
        max_width: Some((w as f32 - 20.0).max(1.0)),
    });
    layer.render(&mut out, fonts)?;
    Ok(out)
}

/// Source image with everything outside `region` dimmed and the region outlined.
pub fn render_crop_preview(image: &Pixmap, region: &CropRegion) -> Result<Pixmap> {
    let mut out = image.clone();
    let (w, h) = (image.width() as f32, image.height() as f32);
    let (x0, y0) = (region.x as f32, region.y as f32);
    let (x1, y1) = ((region.x + region.width) as f32, (region.y + region.height) as f32);

    let mut shade = Paint::default();
    shade.set_color_rgba8(0, 0, 0, 128);
    let bands = [
        Rect::from_ltrb(0.0, 0.0, w, y0),
        Rect::from_ltrb(0.0, y1, w, h),
        Rect::from_ltrb(0.0, y0, x0, y1),
        Rect::from_ltrb(x1, y0, w, y1),
    ];
    for band in bands.into_iter().flatten() {
        out.fill_rect(band, &shade, Transform::identity(), None);
    }

    if let Some(outline) = Rect::from_ltrb(x0, y0, x1, y1) {
        let path = PathBuilder::from_rect(outline);
        let mut paint = Paint::default();
        paint.set_color_rgba8(255, 255, 255, 255);
        paint.anti_alias = true;
        let stroke = Stroke {
            width: 2.0,
            ..Stroke::default()
        };
        out.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
    Ok(out)
}
