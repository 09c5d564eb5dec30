use grid_core::{CropRegion, GridError, Result, Rotation};
use png::{BitDepth, ColorType, Compression, Encoder, FilterType};
use tiny_skia::{ColorU8, IntRect, IntSize, Pixmap};

/// Builds a pixmap from straight (non-premultiplied) RGBA bytes, as handed
/// out by image decoders and `ImageData`.
pub fn pixmap_from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Pixmap> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(GridError::ImageLoad(format!(
            "expected {expected} bytes for {width}x{height}, got {}",
            rgba.len()
        )));
    }
    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| GridError::ImageLoad(format!("invalid image size {width}x{height}")))?;
    let mut data = Vec::with_capacity(expected);
    for px in rgba.chunks_exact(4) {
        let c = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Pixmap::from_vec(data, size)
        .ok_or_else(|| GridError::ImageLoad("pixmap alloc failed".to_string()))
}

/// Straight RGBA bytes of `pixmap`.
pub fn pixmap_to_rgba(pixmap: &Pixmap) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}

/// Deterministic PNG encoding: same pixels, same bytes.
pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>> {
    let rgba = pixmap_to_rgba(pixmap);
    let mut buf = Vec::new();
    {
        let mut enc = Encoder::new(&mut buf, pixmap.width(), pixmap.height());
        enc.set_color(ColorType::Rgba);
        enc.set_depth(BitDepth::Eight);
        enc.set_filter(FilterType::NoFilter);
        enc.set_compression(Compression::Default);
        let mut writer = enc
            .write_header()
            .map_err(|e| GridError::Render(format!("encode: {e}")))?;
        writer
            .write_image_data(&rgba)
            .map_err(|e| GridError::Render(format!("encode: {e}")))?;
    }
    Ok(buf)
}

/// Copies `region` out of `source` at full resolution.
pub fn crop_raster(source: &Pixmap, region: &CropRegion) -> Result<Pixmap> {
    let (x, y, w, h) = region
        .pixel_bounds(source.width(), source.height())
        .ok_or_else(|| GridError::Render("crop region lies outside the image".to_string()))?;
    let rect = IntRect::from_xywh(x as i32, y as i32, w, h)
        .ok_or_else(|| GridError::Render("invalid crop rectangle".to_string()))?;
    source
        .clone_rect(rect)
        .ok_or_else(|| GridError::Render("crop rectangle out of bounds".to_string()))
}

/// Quarter-turn clockwise rotation by pixel permutation. Lossless, so four
/// clockwise turns give back the input exactly.
pub fn rotate_raster(source: &Pixmap, rotation: Rotation) -> Result<Pixmap> {
    let (w, h) = (source.width(), source.height());
    let (ow, oh) = rotation.rotated_size(w, h);
    let mut out =
        Pixmap::new(ow, oh).ok_or_else(|| GridError::Render("pixmap alloc failed".to_string()))?;
    let src = source.pixels();
    let dst = out.pixels_mut();
    for y in 0..h {
        for x in 0..w {
            let (nx, ny) = match rotation {
                Rotation::Deg0 => (x, y),
                Rotation::Deg90 => (h - 1 - y, x),
                Rotation::Deg180 => (w - 1 - x, h - 1 - y),
                Rotation::Deg270 => (y, w - 1 - x),
            };
            dst[(ny * ow + nx) as usize] = src[(y * w + x) as usize];
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(w: u32, h: u32) -> Pixmap {
        let rgba: Vec<u8> = (0..w * h).flat_map(|i| [i as u8, 0, 0, 255]).collect();
        pixmap_from_rgba(w, h, &rgba).unwrap()
    }

    fn red_at(p: &Pixmap, x: u32, y: u32) -> u8 {
        p.pixel(x, y).unwrap().red()
    }

    #[test]
    fn rgba_survives_premultiply_for_opaque_pixels() {
        let rgba = vec![10, 20, 30, 255, 200, 100, 50, 255];
        let p = pixmap_from_rgba(2, 1, &rgba).unwrap();
        assert_eq!(pixmap_to_rgba(&p), rgba);
    }

    #[test]
    fn rgba_length_is_checked() {
        assert!(matches!(pixmap_from_rgba(2, 2, &[0; 4]), Err(GridError::ImageLoad(_))));
        assert!(pixmap_from_rgba(0, 0, &[]).is_err());
    }

    #[test]
    fn quarter_turn_swaps_axes() {
        // 3x2:   0 1 2
        //        3 4 5
        let p = numbered(3, 2);
        let r = rotate_raster(&p, Rotation::Deg90).unwrap();
        assert_eq!((r.width(), r.height()), (2, 3));
        // clockwise: left column of the source becomes the top row, bottom first
        assert_eq!(red_at(&r, 0, 0), 3);
        assert_eq!(red_at(&r, 1, 0), 0);
        assert_eq!(red_at(&r, 1, 2), 2);

        let r = rotate_raster(&p, Rotation::Deg270).unwrap();
        assert_eq!((r.width(), r.height()), (2, 3));
        assert_eq!(red_at(&r, 0, 0), 2);

        let r = rotate_raster(&p, Rotation::Deg180).unwrap();
        assert_eq!((r.width(), r.height()), (3, 2));
        assert_eq!(red_at(&r, 0, 0), 5);
    }

    #[test]
    fn four_clockwise_turns_are_identity() {
        let p = numbered(5, 3);
        let mut r = p.clone();
        for _ in 0..4 {
            r = rotate_raster(&r, Rotation::Deg90).unwrap();
        }
        assert_eq!(r.data(), p.data());
        assert_eq!(rotate_raster(&p, Rotation::Deg0).unwrap().data(), p.data());
    }

    #[test]
    fn crop_copies_region() {
        let p = numbered(4, 4);
        let c = crop_raster(&p, &CropRegion { x: 1.0, y: 2.0, width: 2.0, height: 2.0 }).unwrap();
        assert_eq!((c.width(), c.height()), (2, 2));
        assert_eq!(red_at(&c, 0, 0), 9);
        assert_eq!(red_at(&c, 1, 1), 14);
    }

    #[test]
    fn crop_outside_image_fails() {
        let p = numbered(4, 4);
        let r = CropRegion { x: 10.0, y: 10.0, width: 2.0, height: 2.0 };
        assert!(matches!(crop_raster(&p, &r), Err(GridError::Render(_))));
    }

    #[test]
    fn png_encoding_is_deterministic_and_decodable() {
        let p = numbered(3, 3);
        let a = encode_png(&p).unwrap();
        let b = encode_png(&p).unwrap();
        assert_eq!(a, b);
        assert_eq!(&a[1..4], b"PNG");
        let back = Pixmap::decode_png(&a).unwrap();
        assert_eq!(back.data(), p.data());
    }
}
