use grid_core::{GridError, Result};
use grid_render::{append_footer, png_data_url, print_document, render_overlay};
use js_sys::Array;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlDocument;

use crate::constants::POPUP_BLOCKED_MESSAGE;
use crate::state::App;
use crate::utils::{js_error_text, log, notify};

/// Renders the print overlay and opens it in a new window that prints itself.
pub fn print_grid(app: &App) {
    match printable_html(app) {
        Ok(html) => {
            if let Err(e) = open_print_window(app, &html) {
                notify(&app.window, &e);
            }
        }
        Err(e) => notify(
            &app.window,
            &format!("Could not generate printable grid. Please try again. ({e})"),
        ),
    }
}

fn printable_html(app: &App) -> Result<String> {
    let image = app
        .drawing
        .as_ref()
        .ok_or_else(|| GridError::Render("no image to print".to_string()))?;
    let settings = app.session.settings().cloned().unwrap_or_default();
    let overlay = render_overlay(
        image,
        app.session.dims(),
        app.session.completion(),
        &app.print_options,
        &app.fonts,
    )?;
    let page = append_footer(&overlay, &settings.footer_text(), &app.fonts)?;
    log(&format!("print overlay {}x{}", page.width(), page.height()));
    Ok(print_document(&settings.print_title(), &png_data_url(&page)?))
}

fn open_print_window(app: &App, html: &str) -> std::result::Result<(), String> {
    let win = app
        .window
        .open_with_url_and_target("", "_blank")
        .map_err(|e| js_error_text(&e))?
        .ok_or_else(|| POPUP_BLOCKED_MESSAGE.to_string())?;
    let doc = win
        .document()
        .ok_or_else(|| POPUP_BLOCKED_MESSAGE.to_string())?
        .unchecked_into::<HtmlDocument>();
    let parts = Array::new();
    parts.push(&JsValue::from_str(html));
    doc.open().map_err(|e| js_error_text(&e))?;
    doc.write(&parts).map_err(|e| js_error_text(&e))?;
    doc.close().map_err(|e| js_error_text(&e))?;
    Ok(())
}
