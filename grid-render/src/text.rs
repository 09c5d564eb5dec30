use std::fmt::Write as _;
use std::sync::Arc;

use grid_core::{GridError, Result};
use tiny_skia::{Pixmap, Transform};

/// Font database used for cell labels and footers.
#[derive(Clone)]
pub struct LabelFonts {
    db: Arc<usvg::fontdb::Database>,
}

impl Default for LabelFonts {
    fn default() -> Self {
        LabelFonts { db: Arc::new(usvg::fontdb::Database::new()) }
    }
}

impl LabelFonts {
    /// No fonts: text runs are skipped.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads a single font file and maps the generic `sans-serif` family to it.
    pub fn from_font_data(bytes: Vec<u8>) -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_font_data(bytes);
        let family_name = fontdb
            .faces()
            .next()
            .and_then(|face| face.families.first().map(|(n, _)| n.clone()));
        if let Some(name) = family_name {
            fontdb.set_sans_serif_family(name);
        }
        LabelFonts { db: Arc::new(fontdb) }
    }

    /// Installed system fonts. When nothing answers to `sans-serif`, the
    /// first installed family stands in for it.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn system() -> Self {
        use usvg::fontdb::{Family, Query};

        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        let query = Query { families: &[Family::SansSerif], ..Query::default() };
        if fontdb.query(&query).is_none() {
            let family_name = fontdb
                .faces()
                .next()
                .and_then(|face| face.families.first().map(|(n, _)| n.clone()));
            if let Some(name) = family_name {
                fontdb.set_sans_serif_family(name);
            }
        }
        LabelFonts { db: Arc::new(fontdb) }
    }

    pub fn is_empty(&self) -> bool {
        self.db.len() == 0
    }
}

/// One line of text. `x`/`y` is the top-left corner of the line box.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub text: String,
    pub rgb: [u8; 3],
    pub opacity: f32,
    /// Text is squeezed to this width when longer.
    pub max_width: Option<f32>,
}

/// Collects text runs and rasterizes them in one go on top of a pixmap.
#[derive(Clone, Debug, Default)]
pub struct TextLayer {
    runs: Vec<TextRun>,
}

impl TextLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, run: TextRun) {
        if !run.text.trim().is_empty() {
            self.runs.push(run);
        }
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn to_svg(&self, width: u32, height: u32) -> String {
        let mut s = String::new();
        let _ = write!(
            s,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        );
        for r in &self.runs {
            // alphabetic baseline sits at roughly 0.8em below the top
            let baseline = r.y + r.size * 0.8;
            let [red, green, blue] = r.rgb;
            let _ = write!(
                s,
                r#"<text x="{:.2}" y="{:.2}" font-family="sans-serif" font-size="{:.2}" fill="rgb({red},{green},{blue})" fill-opacity="{:.3}""#,
                r.x, baseline, r.size, r.opacity
            );
            if let Some(w) = r.max_width
                && w > 0.0
                && estimated_width(&r.text, r.size) > w
            {
                let _ = write!(s, r#" textLength="{w:.2}" lengthAdjust="spacingAndGlyphs""#);
            }
            let _ = write!(s, ">{}</text>", escape_xml(&r.text));
        }
        s.push_str("</svg>");
        s
    }

    /// Draws every run onto `pixmap`. A layer without runs, or fonts without
    /// faces, leaves the pixmap untouched.
    pub fn render(&self, pixmap: &mut Pixmap, fonts: &LabelFonts) -> Result<()> {
        if self.runs.is_empty() || fonts.is_empty() {
            return Ok(());
        }
        let svg = self.to_svg(pixmap.width(), pixmap.height());
        let mut opt = usvg::Options::default();
        opt.fontdb = fonts.db.clone();
        let tree = usvg::Tree::from_str(&svg, &opt)
            .map_err(|e| GridError::Render(format!("SVG parse error: {e:?}")))?;
        resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
        Ok(())
    }
}

// average advance of a proportional sans face
fn estimated_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.6
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
