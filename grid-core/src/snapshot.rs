use serde::Serialize;
use serde_json::{Map, Value};

use crate::completion::CompletionMap;
use crate::constants::{
    DEFAULT_EXPORT_TITLE, DEFAULT_IMPORT_TITLE, DEFAULT_PAPER_HEIGHT, DEFAULT_PAPER_WIDTH,
    DEFAULT_SQUARE_SIZE,
};
use crate::error::{GridError, Result};
use crate::geometry::GridConfiguration;

/// Grid measurements plus the free-text fields printed in the overlay footer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSettings {
    pub square_size: f64,
    pub paper_width: f64,
    pub paper_height: f64,
    pub title: String,
    pub notes: String,
}

impl Default for GridSettings {
    fn default() -> Self {
        GridSettings {
            square_size: DEFAULT_SQUARE_SIZE,
            paper_width: DEFAULT_PAPER_WIDTH,
            paper_height: DEFAULT_PAPER_HEIGHT,
            title: DEFAULT_EXPORT_TITLE.to_string(),
            notes: String::new(),
        }
    }
}

impl GridSettings {
    pub fn configuration(&self) -> Result<GridConfiguration> {
        GridConfiguration::new(self.square_size, self.paper_width, self.paper_height)
    }

    /// Footer text for printed overlays, empty when there is neither title nor notes.
    pub fn footer_text(&self) -> String {
        match (self.title.trim(), self.notes.trim()) {
            ("", "") => String::new(),
            (t, "") => format!("Title: {t}"),
            ("", n) => format!("Notes: {n}"),
            (t, n) => format!("Title: {t} | Notes: {n}"),
        }
    }

    /// Window title for the print document.
    pub fn print_title(&self) -> String {
        if self.title.trim().is_empty() {
            "Grid Drawing".to_string()
        } else {
            format!("{} - Grid Drawing", self.title.trim())
        }
    }

    /// Reads a settings object, treating missing, zero, negative or empty
    /// values as absent. `gridSize` is accepted for `squareSize`.
    pub fn from_value(v: Option<&Value>, default_title: &str) -> Self {
        let obj = v.and_then(Value::as_object);
        let field = |name: &str| obj.and_then(|o| o.get(name));
        GridSettings {
            square_size: positive(field("squareSize"))
                .or_else(|| positive(field("gridSize")))
                .unwrap_or(DEFAULT_SQUARE_SIZE),
            paper_width: positive(field("paperWidth")).unwrap_or(DEFAULT_PAPER_WIDTH),
            paper_height: positive(field("paperHeight")).unwrap_or(DEFAULT_PAPER_HEIGHT),
            title: non_empty(field("title")).unwrap_or_else(|| default_title.to_string()),
            notes: non_empty(field("notes")).unwrap_or_default(),
        }
    }
}

/// Complete persisted state of one project. Saved and loaded as a unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub settings: GridSettings,
    /// Encoded source image before cropping.
    pub uploaded_image: Option<String>,
    /// Encoded image the grid is drawn over.
    pub cropped_image: Option<String>,
    pub completed_squares: CompletionMap,
}

impl ProjectSnapshot {
    /// Parses a project document, resolving legacy aliases (`gridSize`,
    /// `imageData`) and defaults, then validates it.
    pub fn from_json(text: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(text)
            .map_err(|e| GridError::Persistence(format!("invalid project file format: {e}")))?;
        let obj = root
            .as_object()
            .ok_or_else(|| GridError::Persistence("project file is not a JSON object".into()))?;
        let snapshot = Self::from_object(obj, DEFAULT_IMPORT_TITLE);
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub(crate) fn from_object(obj: &Map<String, Value>, default_title: &str) -> Self {
        ProjectSnapshot {
            settings: GridSettings::from_value(obj.get("settings"), default_title),
            uploaded_image: non_empty(obj.get("uploadedImage")),
            cropped_image: non_empty(obj.get("croppedImage"))
                .or_else(|| non_empty(obj.get("imageData"))),
            completed_squares: completion_from_value(obj.get("completedSquares")),
        }
    }

    /// A snapshot is only usable with the image the grid is drawn over.
    pub fn validate(&self) -> Result<()> {
        if self.cropped_image.as_deref().is_none_or(str::is_empty) {
            return Err(GridError::Validation(
                "project file missing image data".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| GridError::Persistence(e.to_string()))
    }
}

/// `grid-drawing-project-YYYY-MM-DD.json` from an ISO-8601 timestamp.
pub fn export_file_name(iso_timestamp: &str) -> String {
    let date: String = iso_timestamp.chars().take(10).collect();
    format!("grid-drawing-project-{date}.json")
}

fn positive(v: Option<&Value>) -> Option<f64> {
    let n = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.is_finite() && n > 0.0).then_some(n)
}

fn non_empty(v: Option<&Value>) -> Option<String> {
    v?.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

fn completion_from_value(v: Option<&Value>) -> CompletionMap {
    match v.and_then(Value::as_object) {
        Some(o) => o
            .iter()
            .filter_map(|(k, v)| v.as_bool().map(|b| (k.clone(), b)))
            .collect(),
        None => CompletionMap::new(),
    }
}
