use grid_core::{GridError, Result};
use tiny_skia::Pixmap;
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlImageElement, ImageData};

use crate::state::Surface;
use crate::utils::js_error_text;

pub fn init_surface(document: &Document, id: &str) -> std::result::Result<Surface, JsValue> {
    let canvas = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("canvas #{id} not found")))?
        .dyn_into::<HtmlCanvasElement>()?;
    let ctx = context_2d(&canvas)?;
    Ok(Surface { canvas, ctx })
}

fn context_2d(canvas: &HtmlCanvasElement) -> std::result::Result<CanvasRenderingContext2d, JsValue> {
    Ok(canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2D context not available"))?
        .dyn_into::<CanvasRenderingContext2d>()?)
}

fn render_err(e: JsValue) -> GridError {
    GridError::Render(js_error_text(&e))
}

fn offscreen(document: &Document, w: u32, h: u32) -> Result<Surface> {
    let canvas = document
        .create_element("canvas")
        .map_err(render_err)?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| GridError::Render("not a canvas".to_string()))?;
    canvas.set_width(w);
    canvas.set_height(h);
    let ctx = context_2d(&canvas).map_err(render_err)?;
    Ok(Surface { canvas, ctx })
}

/// Resizes the canvas backing store to the pixmap and copies the pixels over.
pub fn put_pixmap(surface: &Surface, pixmap: &Pixmap) -> Result<()> {
    let (w, h) = (pixmap.width(), pixmap.height());
    if surface.canvas.width() != w {
        surface.canvas.set_width(w);
    }
    if surface.canvas.height() != h {
        surface.canvas.set_height(h);
    }
    let rgba = grid_render::pixmap_to_rgba(pixmap);
    let data = ImageData::new_with_u8_clamped_array_and_sh(Clamped(rgba.as_slice()), w, h)
        .map_err(render_err)?;
    surface.ctx.put_image_data(&data, 0.0, 0.0).map_err(render_err)
}

/// Decodes an image URL (usually a data URL) with the browser's decoders.
pub async fn load_image(url: &str) -> Result<HtmlImageElement> {
    let img = HtmlImageElement::new().map_err(|e| GridError::ImageLoad(js_error_text(&e)))?;
    img.set_src(url);
    wasm_bindgen_futures::JsFuture::from(img.decode())
        .await
        .map_err(|_| {
            GridError::ImageLoad(
                "the image data may be corrupted or in an unsupported format".to_string(),
            )
        })?;
    if img.natural_width() == 0 || img.natural_height() == 0 {
        return Err(GridError::ImageLoad("image has no pixels".to_string()));
    }
    Ok(img)
}

/// Full-resolution pixels of a decoded image.
pub fn image_to_pixmap(document: &Document, img: &HtmlImageElement) -> Result<Pixmap> {
    let (w, h) = (img.natural_width(), img.natural_height());
    let surface = offscreen(document, w, h)?;
    surface
        .ctx
        .draw_image_with_html_image_element(img, 0.0, 0.0)
        .map_err(render_err)?;
    let data = surface
        .ctx
        .get_image_data(0.0, 0.0, w as f64, h as f64)
        .map_err(render_err)?;
    grid_render::pixmap_from_rgba(w, h, &data.data().0)
}

/// Re-encodes `img` no wider than `max_width`, as a lossy data URL.
pub fn compress_image(
    document: &Document,
    img: &HtmlImageElement,
    max_width: u32,
    quality: f64,
    mime: &str,
) -> Result<String> {
    let (mut w, mut h) = (img.natural_width() as f64, img.natural_height() as f64);
    if w > max_width as f64 {
        h *= max_width as f64 / w;
        w = max_width as f64;
    }
    let (cw, ch) = ((w.round() as u32).max(1), (h.round() as u32).max(1));
    let surface = offscreen(document, cw, ch)?;
    surface
        .ctx
        .draw_image_with_html_image_element_and_dw_and_dh(img, 0.0, 0.0, cw as f64, ch as f64)
        .map_err(render_err)?;
    surface
        .canvas
        .to_data_url_with_type_and_encoder_options(mime, &JsValue::from_f64(quality))
        .map_err(render_err)
}
