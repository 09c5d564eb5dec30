use grid_core::{CropRegion, GridCell, GridLayout, Rotation, Session, ViewTransform};
use grid_render::{LabelFonts, OverlayOptions};
use tiny_skia::Pixmap;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, Window};

/// A canvas element with its 2D context.
#[derive(Clone)]
pub struct Surface {
    pub canvas: HtmlCanvasElement,
    pub ctx: CanvasRenderingContext2d,
}

/// Everything the page needs between events. Owned by `start` and shared
/// with the event handlers as `Rc<RefCell<App>>`; the project itself lives
/// in `session` and is only changed through its setters.
pub struct App {
    pub window: Window,
    pub document: Document,
    pub grid: Surface,
    pub cell: Surface,
    pub crop_surface: Surface,
    pub session: Session,
    /// Decoded source image, present from the crop stage on.
    pub source: Option<Pixmap>,
    /// Decoded cropped image the grid is drawn over.
    pub drawing: Option<Pixmap>,
    pub crop: CropRegion,
    /// Last pointer position while dragging the crop region.
    pub crop_drag: Option<(f64, f64)>,
    pub view: ViewTransform,
    pub selected: Option<GridCell>,
    pub rotation: Rotation,
    pub print_options: OverlayOptions,
    pub fonts: LabelFonts,
}

impl App {
    pub fn new(
        window: Window,
        document: Document,
        grid: Surface,
        cell: Surface,
        crop_surface: Surface,
        session: Session,
    ) -> Self {
        App {
            window,
            document,
            grid,
            cell,
            crop_surface,
            session,
            source: None,
            drawing: None,
            crop: CropRegion::default(),
            crop_drag: None,
            view: ViewTransform::default(),
            selected: None,
            rotation: Rotation::default(),
            print_options: OverlayOptions::print(),
            fonts: LabelFonts::empty(),
        }
    }

    /// Grid layout over the drawing image, if one is loaded.
    pub fn layout(&self) -> Option<GridLayout> {
        let img = self.drawing.as_ref()?;
        Some(GridLayout::new(
            img.width() as f64,
            img.height() as f64,
            self.session.dims(),
        ))
    }

    /// Drops everything derived from the current project.
    pub fn clear_views(&mut self) {
        self.source = None;
        self.drawing = None;
        self.crop = CropRegion::default();
        self.crop_drag = None;
        self.view = ViewTransform::default();
        self.close_cell();
    }

    pub fn close_cell(&mut self) {
        self.selected = None;
        self.rotation = Rotation::Deg0;
    }
}
