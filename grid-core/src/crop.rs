use serde::{Deserialize, Serialize};

/// Crop rectangle in natural image pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Largest centered region of aspect `target_aspect` (width / height) that fits the image.
///
/// A relatively wider image keeps its full height and is centered horizontally;
/// otherwise the full width is kept and the region is centered vertically.
pub fn initial_crop(image_width: f64, image_height: f64, target_aspect: f64) -> CropRegion {
    if image_width <= 0.0 || image_height <= 0.0 || !(target_aspect > 0.0) {
        return CropRegion::default();
    }
    if image_width / image_height > target_aspect {
        let width = image_height * target_aspect;
        CropRegion {
            x: (image_width - width) / 2.0,
            y: 0.0,
            width,
            height: image_height,
        }
    } else {
        let height = image_width / target_aspect;
        CropRegion {
            x: 0.0,
            y: (image_height - height) / 2.0,
            width: image_width,
            height,
        }
    }
}

impl CropRegion {
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Translated by `(dx, dy)`, kept entirely inside the image.
    pub fn moved_by(&self, dx: f64, dy: f64, image_width: f64, image_height: f64) -> CropRegion {
        CropRegion {
            x: (self.x + dx).clamp(0.0, (image_width - self.width).max(0.0)),
            y: (self.y + dy).clamp(0.0, (image_height - self.height).max(0.0)),
            ..*self
        }
    }

    /// Resized by `factor` about its own center, keeping its aspect ratio.
    /// The size is capped so the region still fits the image, then shifted
    /// back inside the bounds.
    pub fn scaled_about_center(
        &self,
        factor: f64,
        image_width: f64,
        image_height: f64,
    ) -> CropRegion {
        if self.is_empty() || !(factor > 0.0) {
            return *self;
        }
        let aspect = self.aspect_ratio();
        let max_w = image_width.min(image_height * aspect);
        let width = (self.width * factor).min(max_w).max(1.0_f64.min(max_w));
        let height = width / aspect;
        let (cx, cy) = (self.x + self.width / 2.0, self.y + self.height / 2.0);
        CropRegion {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
        .moved_by(0.0, 0.0, image_width, image_height)
    }

    /// Maps a region drawn on a scaled display onto natural pixels.
    pub fn to_natural(&self, scale_x: f64, scale_y: f64) -> CropRegion {
        CropRegion {
            x: self.x * scale_x,
            y: self.y * scale_y,
            width: self.width * scale_x,
            height: self.height * scale_y,
        }
    }

    /// Integer pixel bounds `(x, y, width, height)` clipped to the image.
    /// `None` if nothing of the region lies on the image.
    pub fn pixel_bounds(&self, image_width: u32, image_height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x.round().clamp(0.0, image_width as f64);
        let y0 = self.y.round().clamp(0.0, image_height as f64);
        let x1 = (self.x + self.width).round().clamp(0.0, image_width as f64);
        let y1 = (self.y + self.height).round().clamp(0.0, image_height as f64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn wide_image_square_target() {
        let c = initial_crop(4000.0, 2000.0, 1.0);
        assert_eq!(c, CropRegion { x: 1000.0, y: 0.0, width: 2000.0, height: 2000.0 });
    }

    #[test]
    fn tall_image_landscape_target() {
        let c = initial_crop(1000.0, 3000.0, 24.0 / 18.0);
        assert_eq!(c.x, 0.0);
        assert_eq!(c.width, 1000.0);
        assert!((c.height - 750.0).abs() < EPS);
        assert!((c.y - 1125.0).abs() < EPS);
    }

    #[test]
    fn equal_aspect_keeps_whole_image() {
        let c = initial_crop(1800.0, 2400.0, 0.75);
        assert_eq!(c, CropRegion { x: 0.0, y: 0.0, width: 1800.0, height: 2400.0 });
    }

    #[test]
    fn initial_crop_stays_inside_and_matches_aspect() {
        for (w, h, a) in [(640.0, 480.0, 0.75), (3000.0, 1000.0, 1.5), (999.0, 1001.0, 2.0)] {
            let c = initial_crop(w, h, a);
            assert!(c.x >= 0.0 && c.y >= 0.0);
            assert!(c.x + c.width <= w + EPS && c.y + c.height <= h + EPS);
            assert!((c.aspect_ratio() - a).abs() < 1e-9);
        }
    }

    #[test]
    fn degenerate_inputs_give_empty_region() {
        assert!(initial_crop(0.0, 100.0, 1.0).is_empty());
        assert!(initial_crop(100.0, 100.0, 0.0).is_empty());
    }

    #[test]
    fn moving_clamps_to_image() {
        let c = initial_crop(4000.0, 2000.0, 1.0);
        assert_eq!(c.moved_by(5000.0, 0.0, 4000.0, 2000.0).x, 2000.0);
        assert_eq!(c.moved_by(-5000.0, 30.0, 4000.0, 2000.0).x, 0.0);
        assert_eq!(c.moved_by(0.0, 30.0, 4000.0, 2000.0).y, 0.0);
    }

    #[test]
    fn scaling_keeps_aspect_and_bounds() {
        let c = initial_crop(4000.0, 2000.0, 2.0 / 3.0);
        let smaller = c.scaled_about_center(0.5, 4000.0, 2000.0);
        assert!((smaller.aspect_ratio() - c.aspect_ratio()).abs() < EPS);
        assert!((smaller.width - c.width / 2.0).abs() < EPS);
        let (cx, cy) = (c.x + c.width / 2.0, c.y + c.height / 2.0);
        assert!((smaller.x + smaller.width / 2.0 - cx).abs() < EPS);
        assert!((smaller.y + smaller.height / 2.0 - cy).abs() < EPS);
        let bigger = smaller.moved_by(-4000.0, 0.0, 4000.0, 2000.0).scaled_about_center(10.0, 4000.0, 2000.0);
        assert!((bigger.height - 2000.0).abs() < EPS);
        assert!(bigger.x >= 0.0 && bigger.x + bigger.width <= 4000.0 + EPS);
    }

    #[test]
    fn display_region_maps_to_natural_pixels() {
        let shown = CropRegion { x: 10.0, y: 20.0, width: 100.0, height: 50.0 };
        let natural = shown.to_natural(4.0, 4.0);
        assert_eq!(natural, CropRegion { x: 40.0, y: 80.0, width: 400.0, height: 200.0 });
    }

    #[test]
    fn pixel_bounds_round_and_clip() {
        let c = CropRegion { x: 10.4, y: -5.0, width: 100.2, height: 60.0 };
        assert_eq!(c.pixel_bounds(100, 100), Some((10, 0, 90, 55)));
        let off = CropRegion { x: 200.0, y: 0.0, width: 10.0, height: 10.0 };
        assert_eq!(off.pixel_bounds(100, 100), None);
    }
}
