use std::cell::RefCell;
use std::rc::Rc;

use grid_core::{GridError, ImageSlot, ProjectSnapshot, Stage, initial_crop};
use tiny_skia::Pixmap;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Event, File, FileReader, HtmlInputElement};

use crate::canvas::{compress_image, image_to_pixmap, load_image};
use crate::constants::{
    CROP_MAX_WIDTH, CROP_QUALITY, MAX_UPLOAD_BYTES, STORED_IMAGE_TYPE, TOO_LARGE_MESSAGE,
    UPLOAD_MAX_WIDTH, UPLOAD_QUALITY,
};
use crate::state::App;
use crate::utils::{input_by_id, log, notify};
use crate::{draw, persist, show_stage};

#[derive(Clone, Copy)]
enum ReadAs {
    DataUrl,
    Text,
}

/// Wires `input_id` so the chosen file is read and handed to `on_loaded`.
fn attach_reader(
    app: &Rc<RefCell<App>>,
    input_id: &str,
    read_as: ReadAs,
    on_loaded: Rc<dyn Fn(Rc<RefCell<App>>, File, String)>,
) -> Result<(), JsValue> {
    let doc = app.borrow().document.clone();
    let Some(input) = input_by_id(&doc, input_id) else {
        log(&format!("#{input_id} not found"));
        return Ok(());
    };
    let st = app.clone();
    let input_for_closure: HtmlInputElement = input.clone();
    let onchange = Closure::<dyn FnMut(Event)>::wrap(Box::new(move |_e: Event| {
        let Some(file) = input_for_closure.files().and_then(|f| f.item(0)) else {
            log("No file selected");
            return;
        };
        // allow picking the same file again
        input_for_closure.set_value("");
        if matches!(read_as, ReadAs::DataUrl) && file.size() > MAX_UPLOAD_BYTES {
            notify(&st.borrow().window, TOO_LARGE_MESSAGE);
            return;
        }
        let reader = match FileReader::new() {
            Ok(r) => r,
            Err(e) => {
                log(&format!("FileReader unavailable: {e:?}"));
                return;
            }
        };
        let st2 = st.clone();
        let on_loaded = on_loaded.clone();
        let reader_for_closure = reader.clone();
        let file_for_closure = file.clone();
        let onload = Closure::<dyn FnMut(Event)>::wrap(Box::new(move |_ev: Event| {
            let text = reader_for_closure
                .result()
                .ok()
                .and_then(|v| v.as_string())
                .unwrap_or_default();
            if text.is_empty() {
                notify(&st2.borrow().window, "Error reading the file. Please try another one.");
                return;
            }
            on_loaded(st2.clone(), file_for_closure.clone(), text);
        }));
        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        let started = match read_as {
            ReadAs::DataUrl => reader.read_as_data_url(&file),
            ReadAs::Text => reader.read_as_text(&file),
        };
        if let Err(e) = started {
            log(&format!("Failed to read file: {e:?}"));
        }
        onload.forget();
    }));
    input.set_onchange(Some(onchange.as_ref().unchecked_ref()));
    onchange.forget();
    Ok(())
}

pub fn attach_image_input(app: &Rc<RefCell<App>>) -> Result<(), JsValue> {
    attach_reader(
        app,
        "imageFile",
        ReadAs::DataUrl,
        Rc::new(|app, file, url| {
            log(&format!("loading image {} ({} bytes)", file.name(), file.size()));
            wasm_bindgen_futures::spawn_local(accept_source(app, url));
        }),
    )
}

pub fn attach_project_input(app: &Rc<RefCell<App>>) -> Result<(), JsValue> {
    attach_reader(
        app,
        "projectFile",
        ReadAs::Text,
        Rc::new(|app, file, text| {
            log(&format!("loading project {}", file.name()));
            wasm_bindgen_futures::spawn_local(load_project(app, text));
        }),
    )
}

/// Decodes `url`, stores it re-encoded and returns the stored copy's pixels.
async fn store_image(
    app: &Rc<RefCell<App>>,
    url: &str,
    max_width: u32,
    quality: f64,
) -> Result<(String, Pixmap), GridError> {
    let document = app.borrow().document.clone();
    let img = load_image(url).await?;
    let compressed = compress_image(&document, &img, max_width, quality, STORED_IMAGE_TYPE)?;
    let stored = load_image(&compressed).await?;
    let pixmap = image_to_pixmap(&document, &stored)?;
    Ok((compressed, pixmap))
}

async fn decode_pixmap(app: &Rc<RefCell<App>>, url: &str) -> Result<Pixmap, GridError> {
    let document = app.borrow().document.clone();
    let img = load_image(url).await?;
    image_to_pixmap(&document, &img)
}

/// Stage 2 → 3 once the picked image has been decoded.
pub async fn accept_source(app: Rc<RefCell<App>>, url: String) {
    let ticket = app.borrow_mut().session.begin_load(ImageSlot::Source);
    let result = store_image(&app, &url, UPLOAD_MAX_WIDTH, UPLOAD_QUALITY).await;

    let mut guard = app.borrow_mut();
    let a = &mut *guard;
    if !a.session.is_current(ticket) {
        log("discarding superseded image load");
        return;
    }
    let (stored, pixmap) = match result {
        Ok(v) => v,
        Err(e) => {
            notify(&a.window, &format!("Error processing the image. Please try another one. ({e})"));
            return;
        }
    };
    if let Err(e) = a.session.set_uploaded_image(stored) {
        notify(&a.window, &e.to_string());
        return;
    }
    let aspect = a.session.configuration().map(|c| c.aspect_ratio()).unwrap_or(1.0);
    a.crop = initial_crop(pixmap.width() as f64, pixmap.height() as f64, aspect);
    a.source = Some(pixmap);
    a.drawing = None;
    a.close_cell();
    persist(a);
    show_stage(a);
    draw(a);
}

/// Stage 3 → 4: cuts the crop region out of the source at full resolution.
pub async fn apply_crop(app: Rc<RefCell<App>>) {
    let (ticket, cropped) = {
        let mut guard = app.borrow_mut();
        let a = &mut *guard;
        let Some(source) = a.source.as_ref() else {
            notify(&a.window, "Image not loaded yet. Please wait.");
            return;
        };
        let cropped = grid_render::crop_raster(source, &a.crop)
            .and_then(|p| grid_render::png_data_url(&p));
        (a.session.begin_load(ImageSlot::Cropped), cropped)
    };
    let result = match cropped {
        Ok(url) => store_image(&app, &url, CROP_MAX_WIDTH, CROP_QUALITY).await,
        Err(e) => Err(e),
    };

    let mut guard = app.borrow_mut();
    let a = &mut *guard;
    if !a.session.is_current(ticket) {
        log("discarding superseded crop");
        return;
    }
    let (stored, pixmap) = match result {
        Ok(v) => v,
        Err(e) => {
            notify(&a.window, &format!("Failed to process the cropped image. Please try again. ({e})"));
            return;
        }
    };
    if let Err(e) = a.session.set_cropped_image(stored) {
        notify(&a.window, &e.to_string());
        return;
    }
    a.drawing = Some(pixmap);
    a.view.zoom = 1.0;
    a.close_cell();
    persist(a);
    show_stage(a);
    draw(a);
}

/// Replaces the session with a project document and jumps to drawing.
/// Nothing changes unless the document and its images all load.
pub async fn load_project(app: Rc<RefCell<App>>, text: String) {
    let snapshot = match ProjectSnapshot::from_json(&text) {
        Ok(s) => s,
        Err(e) => {
            notify(&app.borrow().window, &format!("Failed to load project: {e}"));
            return;
        }
    };
    let (source_ticket, cropped_ticket) = {
        let mut a = app.borrow_mut();
        (
            a.session.begin_load(ImageSlot::Source),
            a.session.begin_load(ImageSlot::Cropped),
        )
    };
    let cropped_url = snapshot.cropped_image.clone().unwrap_or_default();
    let drawing = decode_pixmap(&app, &cropped_url).await;
    let source = match snapshot.uploaded_image.as_deref() {
        Some(url) => match decode_pixmap(&app, url).await {
            Ok(p) => Some(p),
            Err(e) => {
                log(&format!("project source image unusable: {e}"));
                None
            }
        },
        None => None,
    };

    let mut guard = app.borrow_mut();
    let a = &mut *guard;
    if !a.session.is_current(source_ticket) || !a.session.is_current(cropped_ticket) {
        log("discarding superseded project load");
        return;
    }
    let drawing = match drawing {
        Ok(p) => p,
        Err(e) => {
            notify(&a.window, &format!("Failed to load project: {e}"));
            return;
        }
    };
    if let Err(e) = a.session.load_snapshot(snapshot) {
        notify(&a.window, &format!("Failed to load project: {e}"));
        return;
    }
    a.clear_views();
    if let Some(src) = source {
        let aspect = a.session.configuration().map(|c| c.aspect_ratio()).unwrap_or(1.0);
        a.crop = initial_crop(src.width() as f64, src.height() as f64, aspect);
        a.source = Some(src);
    }
    a.drawing = Some(drawing);
    persist(a);
    show_stage(a);
    draw(a);
}

/// Decodes the images of a session restored from browser storage.
pub async fn restore_images(app: Rc<RefCell<App>>) {
    let (stage, uploaded, cropped) = {
        let a = app.borrow();
        (
            a.session.stage(),
            a.session.uploaded_image().map(str::to_string),
            a.session.cropped_image().map(str::to_string),
        )
    };
    if stage >= Stage::Crop
        && let Some(url) = uploaded
    {
        let ticket = app.borrow_mut().session.begin_load(ImageSlot::Source);
        let result = decode_pixmap(&app, &url).await;
        let mut guard = app.borrow_mut();
        let a = &mut *guard;
        if a.session.is_current(ticket) {
            match result {
                Ok(src) => {
                    let aspect = a.session.configuration().map(|c| c.aspect_ratio()).unwrap_or(1.0);
                    a.crop = initial_crop(src.width() as f64, src.height() as f64, aspect);
                    a.source = Some(src);
                    draw(a);
                }
                Err(e) => log(&format!("stored source image unusable: {e}")),
            }
        }
    }
    if stage == Stage::Draw
        && let Some(url) = cropped
    {
        let ticket = app.borrow_mut().session.begin_load(ImageSlot::Cropped);
        let result = decode_pixmap(&app, &url).await;
        let mut guard = app.borrow_mut();
        let a = &mut *guard;
        if !a.session.is_current(ticket) {
            return;
        }
        match result {
            Ok(p) => {
                a.drawing = Some(p);
                draw(a);
            }
            Err(e) => notify(
                &a.window,
                &format!("Failed to load the image. The image data may be corrupted or in an unsupported format. ({e})"),
            ),
        }
    }
}
