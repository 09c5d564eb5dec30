use std::cell::RefCell;
use std::rc::Rc;

use grid_core::constants::{
    CELL_SUBGRID_DIVISIONS, CELL_VIEW_MAX_DIMENSION, FORM_PAPER_HEIGHT, FORM_PAPER_WIDTH,
    FORM_SQUARE_SIZE, PAPER_SIZE_MAX, PAPER_SIZE_MIN, SQUARE_SIZE_MAX, SQUARE_SIZE_MIN,
};
use grid_core::{
    GridError, GridSettings, Stage, ViewTransform, cell_label, export_file_name, initial_crop,
    locate_cell,
};
use grid_render::{OverlayOptions, render_cell, render_crop_preview, render_overlay};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, MouseEvent, WheelEvent};

mod canvas;
mod constants;
mod print;
mod state;
mod storage;
mod upload;
mod utils;

use canvas::{init_surface, put_pixmap};
use constants::{CROP_WHEEL_STEP, DEFAULT_FONT_PATH, NOTHING_TO_SAVE_MESSAGE};
use state::App;
use utils::{
    asset_url, event_canvas_coords, fetch_bytes_with_fallbacks, fetch_text_with_fallbacks,
    get_query_param, input_by_id, log, notify, now_iso, save_text_as_file, set_text, set_visible,
    text_value,
};

const STAGE_PANELS: [(&str, Stage); 4] = [
    ("stage1", Stage::Configure),
    ("stage2", Stage::Acquire),
    ("stage3", Stage::Crop),
    ("stage4", Stage::Draw),
];

/// Shows the panel of the current stage and hides the rest.
pub(crate) fn show_stage(app: &App) {
    let stage = app.session.stage();
    for (id, s) in STAGE_PANELS {
        set_visible(&app.document, id, s == stage);
    }
    set_visible(&app.document, "newProject", stage > Stage::Configure);
    set_text(
        &app.document,
        "stepIndicator",
        &format!("Step {} of 4", stage.number()),
    );
}

/// Fire-and-forget write of the session to browser storage.
pub(crate) fn persist(app: &App) {
    match storage::save_session(&app.window, &app.session) {
        Ok(()) => {}
        Err(GridError::Persistence(msg)) => notify(&app.window, &msg),
        Err(e) => notify(&app.window, &e.to_string()),
    }
}

/// Redraws whatever the current stage shows.
pub(crate) fn draw(app: &mut App) {
    match app.session.stage() {
        Stage::Crop => {
            if let Some(src) = &app.source {
                let shown = render_crop_preview(src, &app.crop)
                    .and_then(|p| put_pixmap(&app.crop_surface, &p));
                if let Err(e) = shown {
                    log(&format!("crop preview failed: {e}"));
                }
            }
        }
        Stage::Draw => {
            if let Some(img) = &app.drawing {
                let shown = render_overlay(
                    img,
                    app.session.dims(),
                    app.session.completion(),
                    &OverlayOptions::screen(),
                    &app.fonts,
                )
                .and_then(|p| put_pixmap(&app.grid, &p));
                if let Err(e) = shown {
                    log(&format!("grid draw failed: {e}"));
                }
            }
            apply_zoom(app);
            update_progress(app);
            render_cell_view(app);
        }
        Stage::Configure | Stage::Acquire => {}
    }
}

fn update_progress(app: &App) {
    set_text(
        &app.document,
        "progress",
        &format!(
            "{} of {} squares completed",
            app.session.completed_count(),
            app.session.total_squares()
        ),
    );
}

/// Fits the grid canvas to its container width, times the zoom factor.
fn apply_zoom(app: &mut App) {
    let Some(img) = &app.drawing else {
        return;
    };
    let image_w = img.width() as f64;
    let container_w = app
        .grid
        .canvas
        .parent_element()
        .map(|p| p.client_width() as f64)
        .unwrap_or(image_w);
    app.view.scale = ViewTransform::fit_width(container_w, image_w);
    let css_w = image_w * app.view.scale * app.view.zoom;
    let _ = app
        .grid
        .canvas
        .style()
        .set_property("width", &format!("{css_w:.0}px"));
    set_text(
        &app.document,
        "zoomLevel",
        &format!("{:.0}%", app.view.zoom * 100.0),
    );
}

/// Renders the selected cell into the detail view, or hides the view.
fn render_cell_view(app: &mut App) {
    let Some(cell) = app.selected else {
        set_visible(&app.document, "cellView", false);
        return;
    };
    let rect = app.layout().and_then(|l| l.cell_rect(cell));
    let result = match rect {
        Some(rect) => render_cell(
            app.drawing.as_ref(),
            &rect,
            app.rotation,
            CELL_VIEW_MAX_DIMENSION,
            CELL_SUBGRID_DIVISIONS,
        ),
        None => Err(GridError::Render(format!(
            "square {} is not part of the current grid",
            cell_label(cell)
        ))),
    };
    match result.and_then(|p| put_pixmap(&app.cell, &p)) {
        Ok(()) => {
            set_visible(&app.document, "cellView", true);
            set_text(&app.document, "cellTitle", &format!("Square {}", cell_label(cell)));
            set_text(
                &app.document,
                "rotationLabel",
                &format!("{}°", app.rotation.degrees()),
            );
            let done = app.session.completion().is_cell_complete(cell);
            set_text(
                &app.document,
                "toggleComplete",
                if done { "Mark Incomplete" } else { "Mark Complete" },
            );
        }
        Err(e) => {
            log(&format!("cell view failed: {e}"));
            app.close_cell();
            set_visible(&app.document, "cellView", false);
        }
    }
}

fn read_settings_form(document: &Document) -> GridSettings {
    let number = |id: &str| text_value(document, id).trim().parse::<f64>().unwrap_or(f64::NAN);
    GridSettings {
        square_size: number("squareSize"),
        paper_width: number("paperWidth"),
        paper_height: number("paperHeight"),
        title: text_value(document, "title").trim().to_string(),
        notes: text_value(document, "notes").trim().to_string(),
    }
}

fn init_settings_form(document: &Document) {
    let fields = [
        ("squareSize", FORM_SQUARE_SIZE, SQUARE_SIZE_MIN, SQUARE_SIZE_MAX, 0.5),
        ("paperWidth", FORM_PAPER_WIDTH, PAPER_SIZE_MIN, PAPER_SIZE_MAX, 0.5),
        ("paperHeight", FORM_PAPER_HEIGHT, PAPER_SIZE_MIN, PAPER_SIZE_MAX, 0.5),
    ];
    for (id, value, min, max, step) in fields {
        if let Some(input) = input_by_id(document, id) {
            input.set_min(&min.to_string());
            input.set_max(&max.to_string());
            input.set_step(&step.to_string());
            input.set_value(&value.to_string());
        }
    }
}

fn init_print_controls(document: &Document, options: &OverlayOptions) {
    if let Some(el) = input_by_id(document, "showCompleted") {
        el.set_checked(options.show_completed);
    }
    if let Some(el) = input_by_id(document, "showLabels") {
        el.set_checked(options.show_labels);
    }
    if let Some(el) = input_by_id(document, "lineOpacity") {
        el.set_value(&options.line_opacity.to_string());
    }
    if let Some(el) = input_by_id(document, "lineThickness") {
        el.set_value(&options.line_thickness.to_string());
    }
}

/// Registers `f` for `event` on the element `id`. Missing elements are logged
/// and skipped so partial pages still work.
fn on_event<F>(app: &Rc<RefCell<App>>, id: &str, event: &str, f: F) -> Result<(), JsValue>
where
    F: FnMut(&Rc<RefCell<App>>) + 'static,
{
    let doc = app.borrow().document.clone();
    let Some(el) = doc.get_element_by_id(id) else {
        log(&format!("#{id} not found"));
        return Ok(());
    };
    let st = app.clone();
    let mut f = f;
    let cb = Closure::<dyn FnMut()>::wrap(Box::new(move || f(&st)));
    el.add_event_listener_with_callback(event, cb.as_ref().unchecked_ref())?;
    cb.forget();
    Ok(())
}

fn attach_ui(app: Rc<RefCell<App>>) -> Result<(), JsValue> {
    upload::attach_image_input(&app)?;
    upload::attach_project_input(&app)?;

    // Stage 1
    on_event(&app, "applySettings", "click", |st| {
        let mut guard = st.borrow_mut();
        let a = &mut *guard;
        let settings = read_settings_form(&a.document);
        match a.session.configure(settings) {
            Ok(()) => {
                a.clear_views();
                persist(a);
                show_stage(a);
            }
            Err(e) => notify(&a.window, &e.to_string()),
        }
    })?;

    // Stage 3
    on_event(&app, "cropApply", "click", |st| {
        wasm_bindgen_futures::spawn_local(upload::apply_crop(st.clone()));
    })?;
    on_event(&app, "cropReset", "click", |st| {
        let mut guard = st.borrow_mut();
        let a = &mut *guard;
        if let Some(src) = &a.source {
            let aspect = a.session.configuration().map(|c| c.aspect_ratio()).unwrap_or(1.0);
            a.crop = initial_crop(src.width() as f64, src.height() as f64, aspect);
        }
        draw(a);
    })?;
    attach_crop_canvas(&app)?;

    // Stage 4
    attach_grid_canvas(&app)?;
    on_event(&app, "zoomIn", "click", |st| {
        let mut a = st.borrow_mut();
        a.view.zoom_in();
        apply_zoom(&mut a);
    })?;
    on_event(&app, "zoomOut", "click", |st| {
        let mut a = st.borrow_mut();
        a.view.zoom_out();
        apply_zoom(&mut a);
    })?;
    on_event(&app, "rotateCw", "click", |st| {
        let mut a = st.borrow_mut();
        a.rotation = a.rotation.clockwise();
        render_cell_view(&mut a);
    })?;
    on_event(&app, "rotateCcw", "click", |st| {
        let mut a = st.borrow_mut();
        a.rotation = a.rotation.counter_clockwise();
        render_cell_view(&mut a);
    })?;
    on_event(&app, "rotateReset", "click", |st| {
        let mut a = st.borrow_mut();
        a.rotation = Default::default();
        render_cell_view(&mut a);
    })?;
    on_event(&app, "closeCell", "click", |st| {
        let mut a = st.borrow_mut();
        a.close_cell();
        render_cell_view(&mut a);
    })?;
    on_event(&app, "toggleComplete", "click", |st| {
        let mut guard = st.borrow_mut();
        let a = &mut *guard;
        let Some(cell) = a.selected else {
            return;
        };
        let done = a.session.toggle_square(&cell.key());
        log(&format!("square {} {}", cell_label(cell), if done { "done" } else { "open" }));
        persist(a);
        draw(a);
    })?;

    // Project
    on_event(&app, "saveProject", "click", |st| {
        let a = st.borrow();
        if !a.session.can_export() {
            notify(&a.window, NOTHING_TO_SAVE_MESSAGE);
            return;
        }
        let saved = a
            .session
            .export()
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|json| {
                save_text_as_file(&a.document, &export_file_name(&now_iso()), &json)
                    .map_err(|e| format!("{e:?}"))
            });
        if let Err(e) = saved {
            notify(&a.window, &format!("Failed to save project: {e}"));
        }
    })?;
    on_event(&app, "newProject", "click", |st| {
        let mut guard = st.borrow_mut();
        let a = &mut *guard;
        a.session.reset();
        a.clear_views();
        init_settings_form(&a.document);
        persist(a);
        show_stage(a);
    })?;

    // Print
    on_event(&app, "printGrid", "click", |st| {
        print::print_grid(&st.borrow());
    })?;
    on_event(&app, "showCompleted", "change", |st| {
        let mut a = st.borrow_mut();
        if let Some(el) = input_by_id(&a.document, "showCompleted") {
            a.print_options.show_completed = el.checked();
        }
    })?;
    on_event(&app, "showLabels", "change", |st| {
        let mut a = st.borrow_mut();
        if let Some(el) = input_by_id(&a.document, "showLabels") {
            a.print_options.show_labels = el.checked();
        }
    })?;
    on_event(&app, "lineOpacity", "input", |st| {
        let mut a = st.borrow_mut();
        if let Some(v) = input_by_id(&a.document, "lineOpacity").and_then(|el| el.value().parse().ok()) {
            a.print_options = a.print_options.with_line_opacity(v);
        }
    })?;
    on_event(&app, "lineThickness", "input", |st| {
        let mut a = st.borrow_mut();
        if let Some(v) = input_by_id(&a.document, "lineThickness").and_then(|el| el.value().parse().ok()) {
            a.print_options = a.print_options.with_line_thickness(v);
        }
    })?;

    // Refit on window resize
    {
        let st = app.clone();
        let onresize = Closure::<dyn FnMut()>::wrap(Box::new(move || {
            if let Ok(mut a) = st.try_borrow_mut() {
                apply_zoom(&mut a);
            }
        }));
        app.borrow()
            .window
            .add_event_listener_with_callback("resize", onresize.as_ref().unchecked_ref())?;
        onresize.forget();
    }
    Ok(())
}

fn attach_grid_canvas(app: &Rc<RefCell<App>>) -> Result<(), JsValue> {
    let st = app.clone();
    let onclick = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |e: MouseEvent| {
        let mut guard = st.borrow_mut();
        let a = &mut *guard;
        let Some(layout) = a.layout() else {
            return;
        };
        let rect = a.grid.canvas.get_bounding_client_rect();
        let view = ViewTransform {
            origin: (rect.left(), rect.top()),
            ..a.view
        };
        let pointer = (e.client_x() as f64, e.client_y() as f64);
        if let Some(cell) = locate_cell(pointer, &view, &layout.cells()) {
            a.selected = Some(cell);
            a.rotation = Default::default();
            render_cell_view(a);
        }
    }));
    app.borrow()
        .grid
        .canvas
        .add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
    onclick.forget();
    Ok(())
}

fn attach_crop_canvas(app: &Rc<RefCell<App>>) -> Result<(), JsValue> {
    let canvas = app.borrow().crop_surface.canvas.clone();
    {
        let st = app.clone();
        let mousedown = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |e: MouseEvent| {
            let mut a = st.borrow_mut();
            let pt = event_canvas_coords(&e, &a.crop_surface.canvas);
            a.crop_drag = Some(pt);
        }));
        canvas.add_event_listener_with_callback("mousedown", mousedown.as_ref().unchecked_ref())?;
        mousedown.forget();
    }
    {
        let st = app.clone();
        let mousemove = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |e: MouseEvent| {
            let mut guard = st.borrow_mut();
            let a = &mut *guard;
            let (Some(last), Some(src)) = (a.crop_drag, a.source.as_ref()) else {
                return;
            };
            let pt = event_canvas_coords(&e, &a.crop_surface.canvas);
            let (w, h) = (src.width() as f64, src.height() as f64);
            a.crop = a.crop.moved_by(pt.0 - last.0, pt.1 - last.1, w, h);
            a.crop_drag = Some(pt);
            draw(a);
        }));
        canvas.add_event_listener_with_callback("mousemove", mousemove.as_ref().unchecked_ref())?;
        mousemove.forget();
    }
    for ev in ["mouseup", "mouseleave"] {
        let st = app.clone();
        let release = Closure::<dyn FnMut()>::wrap(Box::new(move || {
            st.borrow_mut().crop_drag = None;
        }));
        canvas.add_event_listener_with_callback(ev, release.as_ref().unchecked_ref())?;
        release.forget();
    }
    {
        let st = app.clone();
        let onwheel = Closure::<dyn FnMut(WheelEvent)>::wrap(Box::new(move |e: WheelEvent| {
            e.prevent_default();
            let mut guard = st.borrow_mut();
            let a = &mut *guard;
            let Some(src) = a.source.as_ref() else {
                return;
            };
            let factor = if e.delta_y() < 0.0 {
                1.0 + CROP_WHEEL_STEP
            } else {
                1.0 - CROP_WHEEL_STEP
            };
            let (w, h) = (src.width() as f64, src.height() as f64);
            a.crop = a.crop.scaled_about_center(factor, w, h);
            draw(a);
        }));
        canvas.add_event_listener_with_callback("wheel", onwheel.as_ref().unchecked_ref())?;
        onwheel.forget();
    }
    Ok(())
}

async fn load_fonts(app: Rc<RefCell<App>>) {
    let window = app.borrow().window.clone();
    let path = window
        .location()
        .search()
        .ok()
        .and_then(|s| get_query_param(&s, "font"))
        .unwrap_or_else(|| DEFAULT_FONT_PATH.to_string());
    match fetch_bytes_with_fallbacks(&window, &[&asset_url(&path), &path]).await {
        Some(bytes) => {
            let mut a = app.borrow_mut();
            a.fonts = grid_render::LabelFonts::from_font_data(bytes);
            log(&format!("label font loaded from {path}"));
            draw(&mut a);
        }
        None => log(&format!("label font {path} unavailable; labels are skipped")),
    }
}

async fn fetch_and_load_project(app: Rc<RefCell<App>>, name: String) {
    let window = app.borrow().window.clone();
    match fetch_text_with_fallbacks(&window, &[&asset_url(&name), &name]).await {
        Some(text) => upload::load_project(app, text).await,
        None => notify(&window, &format!("Failed to load project: could not fetch {name}")),
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let grid = init_surface(&document, "gridCanvas")?;
    let cell = init_surface(&document, "cellCanvas")?;
    let crop_surface = init_surface(&document, "cropCanvas")?;

    let session = storage::load_session(&window).unwrap_or_default();
    log(&format!("session at step {}", session.stage().number()));
    init_settings_form(&document);
    if let Some(settings) = session.settings() {
        for (id, v) in [
            ("squareSize", settings.square_size),
            ("paperWidth", settings.paper_width),
            ("paperHeight", settings.paper_height),
        ] {
            if let Some(input) = input_by_id(&document, id) {
                input.set_value(&v.to_string());
            }
        }
    }

    let app = Rc::new(RefCell::new(App::new(
        window.clone(),
        document,
        grid,
        cell,
        crop_surface,
        session,
    )));
    {
        let a = app.borrow();
        init_print_controls(&a.document, &a.print_options);
        show_stage(&a);
    }
    attach_ui(app.clone())?;
    wasm_bindgen_futures::spawn_local(load_fonts(app.clone()));
    wasm_bindgen_futures::spawn_local(upload::restore_images(app.clone()));

    if let Ok(search) = window.location().search()
        && let Some(p) = get_query_param(&search, "project")
    {
        wasm_bindgen_futures::spawn_local(fetch_and_load_project(app.clone(), p));
    }
    Ok(())
}
