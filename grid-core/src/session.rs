use serde::Serialize;
use serde_json::Value;

use crate::completion::CompletionMap;
use crate::error::{GridError, Result};
use crate::geometry::{GridConfiguration, GridDims};
use crate::snapshot::{GridSettings, ProjectSnapshot};

/// The four sequential stages of a project.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    #[default]
    Configure = 1,
    Acquire = 2,
    Crop = 3,
    Draw = 4,
}

impl Stage {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u64) -> Option<Self> {
        match n {
            1 => Some(Stage::Configure),
            2 => Some(Stage::Acquire),
            3 => Some(Stage::Crop),
            4 => Some(Stage::Draw),
            _ => None,
        }
    }
}

/// Image slot a decode request belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageSlot {
    Source,
    Cropped,
}

/// Issued when an asynchronous image decode starts. Only the ticket of the
/// latest request for a slot is current; completions holding older tickets
/// must be dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    slot: ImageSlot,
    generation: u64,
}

/// Session-scoped store. Every mutation goes through a setter here; a failed
/// setter leaves the session exactly as it was.
#[derive(Clone, Debug, Default)]
pub struct Session {
    stage: Stage,
    settings: Option<GridSettings>,
    uploaded_image: Option<String>,
    cropped_image: Option<String>,
    completion: CompletionMap,
    source_generation: u64,
    cropped_generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn settings(&self) -> Option<&GridSettings> {
        self.settings.as_ref()
    }

    pub fn configuration(&self) -> Option<GridConfiguration> {
        self.settings.as_ref()?.configuration().ok()
    }

    pub fn dims(&self) -> GridDims {
        self.configuration().map(|c| c.dims()).unwrap_or_default()
    }

    pub fn uploaded_image(&self) -> Option<&str> {
        self.uploaded_image.as_deref()
    }

    pub fn cropped_image(&self) -> Option<&str> {
        self.cropped_image.as_deref()
    }

    pub fn completion(&self) -> &CompletionMap {
        &self.completion
    }

    /// Stage 1 → 2. A new configuration starts a fresh grid; decodes still
    /// running for either image slot become stale.
    pub fn configure(&mut self, settings: GridSettings) -> Result<()> {
        settings.configuration()?;
        self.settings = Some(settings);
        self.uploaded_image = None;
        self.cropped_image = None;
        self.completion.clear();
        self.source_generation += 1;
        self.cropped_generation += 1;
        self.stage = Stage::Acquire;
        Ok(())
    }

    /// Stage 2 → 3. Drops the previous crop, so a crop decode still in
    /// flight against the old source becomes stale.
    pub fn set_uploaded_image(&mut self, image: String) -> Result<()> {
        if self.settings.is_none() {
            return Err(GridError::InvalidConfiguration(
                "configure the grid before choosing an image".into(),
            ));
        }
        if image.is_empty() {
            return Err(GridError::ImageLoad("empty image data".into()));
        }
        self.uploaded_image = Some(image);
        self.cropped_image = None;
        self.completion.clear();
        self.cropped_generation += 1;
        self.stage = Stage::Crop;
        Ok(())
    }

    /// Stage 3 → 4.
    pub fn set_cropped_image(&mut self, image: String) -> Result<()> {
        if self.uploaded_image.is_none() {
            return Err(GridError::Validation(
                "no source image to crop".into(),
            ));
        }
        if image.is_empty() {
            return Err(GridError::ImageLoad("empty image data".into()));
        }
        self.cropped_image = Some(image);
        self.stage = Stage::Draw;
        Ok(())
    }

    /// Flips the completion flag of `key` and returns the new value.
    pub fn toggle_square(&mut self, key: &str) -> bool {
        self.completion.toggle(key)
    }

    pub fn completed_count(&self) -> usize {
        self.completion.count()
    }

    pub fn total_squares(&self) -> u64 {
        self.dims().total()
    }

    /// Replaces the whole session with `snapshot` and jumps to drawing.
    pub fn load_snapshot(&mut self, snapshot: ProjectSnapshot) -> Result<()> {
        snapshot.validate()?;
        snapshot.settings.configuration()?;
        self.settings = Some(snapshot.settings);
        self.uploaded_image = snapshot.uploaded_image;
        self.cropped_image = snapshot.cropped_image;
        self.completion = snapshot.completed_squares;
        self.stage = Stage::Draw;
        Ok(())
    }

    /// Back to stage 1 with nothing loaded. In-flight decodes become stale.
    pub fn reset(&mut self) {
        self.stage = Stage::Configure;
        self.settings = None;
        self.uploaded_image = None;
        self.cropped_image = None;
        self.completion.clear();
        self.source_generation += 1;
        self.cropped_generation += 1;
    }

    /// Whether there is enough to write a project file.
    pub fn can_export(&self) -> bool {
        self.settings.is_some() && self.cropped_image.is_some()
    }

    pub fn export(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            settings: self.settings.clone().unwrap_or_default(),
            uploaded_image: self.uploaded_image.clone(),
            cropped_image: self.cropped_image.clone(),
            completed_squares: self.completion.clone(),
        }
    }

    /// Starts a decode for `slot`, superseding any decode already running for it.
    pub fn begin_load(&mut self, slot: ImageSlot) -> LoadTicket {
        let generation = match slot {
            ImageSlot::Source => {
                self.source_generation += 1;
                self.source_generation
            }
            ImageSlot::Cropped => {
                self.cropped_generation += 1;
                self.cropped_generation
            }
        };
        LoadTicket { slot, generation }
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        let current = match ticket.slot {
            ImageSlot::Source => self.source_generation,
            ImageSlot::Cropped => self.cropped_generation,
        };
        ticket.generation == current
    }

    /// Serializes the session for browser storage as `{state:{..}, version:0}`.
    pub fn to_storage_json(&self) -> Result<String> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct State<'a> {
            step: u8,
            settings: Option<&'a GridSettings>,
            uploaded_image: Option<&'a str>,
            cropped_image: Option<&'a str>,
            completed_squares: &'a CompletionMap,
        }
        #[derive(Serialize)]
        struct Stored<'a> {
            state: State<'a>,
            version: u32,
        }
        let stored = Stored {
            state: State {
                step: self.stage.number(),
                settings: self.settings.as_ref(),
                uploaded_image: self.uploaded_image.as_deref(),
                cropped_image: self.cropped_image.as_deref(),
                completed_squares: &self.completion,
            },
            version: 0,
        };
        serde_json::to_string(&stored).map_err(|e| GridError::Persistence(e.to_string()))
    }

    /// Rebuilds a session from browser storage. The stored step is lowered
    /// to the furthest stage the stored data actually supports.
    pub fn from_storage_json(text: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(text)
            .map_err(|e| GridError::Persistence(format!("stored session unreadable: {e}")))?;
        let state = root
            .get("state")
            .and_then(Value::as_object)
            .ok_or_else(|| GridError::Persistence("stored session has no state".into()))?;

        // Stored settings come back verbatim; an empty title stays empty.
        let snapshot = ProjectSnapshot::from_object(state, "");
        let settings = match state.get("settings") {
            Some(Value::Object(_)) => Some(snapshot.settings),
            _ => None,
        }
        .filter(|s| s.configuration().is_ok());
        let wanted = state
            .get("step")
            .and_then(Value::as_u64)
            .and_then(Stage::from_number)
            .unwrap_or_default();

        let mut session = Session {
            settings,
            uploaded_image: snapshot.uploaded_image,
            cropped_image: snapshot.cropped_image,
            completion: snapshot.completed_squares,
            ..Session::default()
        };
        session.stage = wanted.min(session.furthest_stage());
        Ok(session)
    }

    fn furthest_stage(&self) -> Stage {
        match (&self.settings, &self.uploaded_image, &self.cropped_image) {
            (None, _, _) => Stage::Configure,
            (Some(_), _, Some(_)) => Stage::Draw,
            (Some(_), Some(_), None) => Stage::Crop,
            (Some(_), None, None) => Stage::Acquire,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GridSettings {
        GridSettings {
            square_size: 2.0,
            paper_width: 24.0,
            paper_height: 18.0,
            title: "Fox".into(),
            notes: String::new(),
        }
    }

    fn drawing_session() -> Session {
        let mut s = Session::new();
        s.configure(settings()).unwrap();
        s.set_uploaded_image("src".into()).unwrap();
        s.set_cropped_image("crop".into()).unwrap();
        s
    }

    #[test]
    fn stages_advance_in_order() {
        let mut s = Session::new();
        assert_eq!(s.stage(), Stage::Configure);
        assert!(s.set_uploaded_image("src".into()).is_err());
        s.configure(settings()).unwrap();
        assert_eq!(s.stage(), Stage::Acquire);
        assert!(s.set_cropped_image("crop".into()).is_err());
        s.set_uploaded_image("src".into()).unwrap();
        assert_eq!(s.stage(), Stage::Crop);
        s.set_cropped_image("crop".into()).unwrap();
        assert_eq!(s.stage(), Stage::Draw);
        assert_eq!(s.total_squares(), 108);
    }

    #[test]
    fn invalid_configuration_leaves_session_untouched() {
        let mut s = drawing_session();
        s.toggle_square("0-0");
        let bad = GridSettings { square_size: 40.0, ..settings() };
        assert!(matches!(s.configure(bad), Err(GridError::InvalidConfiguration(_))));
        assert_eq!(s.stage(), Stage::Draw);
        assert_eq!(s.completed_count(), 1);
        assert_eq!(s.cropped_image(), Some("crop"));
    }

    #[test]
    fn snapshot_load_jumps_to_drawing() {
        let mut s = Session::new();
        let snap = ProjectSnapshot::from_json(
            r#"{"settings":{"gridSize":3,"paperWidth":12,"paperHeight":9},"imageData":"img","completedSquares":{"1-1":true}}"#,
        )
        .unwrap();
        s.load_snapshot(snap).unwrap();
        assert_eq!(s.stage(), Stage::Draw);
        assert_eq!(s.dims(), GridDims { columns: 4, rows: 3 });
        assert!(s.completion().is_complete("1-1"));
    }

    #[test]
    fn failed_snapshot_load_keeps_prior_state() {
        let mut s = drawing_session();
        let mut snap = s.export();
        snap.cropped_image = None;
        assert!(matches!(s.load_snapshot(snap), Err(GridError::Validation(_))));
        assert_eq!(s.cropped_image(), Some("crop"));
        assert_eq!(s.stage(), Stage::Draw);
    }

    #[test]
    fn superseded_loads_are_stale() {
        let mut s = Session::new();
        let first = s.begin_load(ImageSlot::Source);
        let second = s.begin_load(ImageSlot::Source);
        let cropped = s.begin_load(ImageSlot::Cropped);
        assert!(!s.is_current(first));
        assert!(s.is_current(second));
        assert!(s.is_current(cropped));
        s.reset();
        assert!(!s.is_current(second));
        assert!(!s.is_current(cropped));
    }

    #[test]
    fn new_source_invalidates_pending_crop() {
        let mut s = drawing_session();
        let crop = s.begin_load(ImageSlot::Cropped);
        s.set_uploaded_image("other".into()).unwrap();
        assert!(!s.is_current(crop));
        assert!(s.cropped_image().is_none());

        let source = s.begin_load(ImageSlot::Source);
        let crop = s.begin_load(ImageSlot::Cropped);
        s.configure(settings()).unwrap();
        assert!(!s.is_current(source));
        assert!(!s.is_current(crop));
    }

    #[test]
    fn oversized_snapshot_grid_is_rejected() {
        let mut s = drawing_session();
        let mut snap = s.export();
        snap.settings.paper_width = 70000.0;
        snap.settings.paper_height = 70000.0;
        snap.settings.square_size = 1.0;
        assert!(matches!(s.load_snapshot(snap), Err(GridError::InvalidConfiguration(_))));
        assert_eq!(s.total_squares(), 108);
    }

    #[test]
    fn reset_clears_everything() {
        let mut s = drawing_session();
        s.toggle_square("2-2");
        s.reset();
        assert_eq!(s.stage(), Stage::Configure);
        assert!(s.settings().is_none());
        assert!(s.cropped_image().is_none());
        assert_eq!(s.completed_count(), 0);
        assert!(!s.can_export());
    }

    #[test]
    fn export_defaults_without_settings() {
        let s = Session::new();
        let snap = s.export();
        assert_eq!(snap.settings.square_size, 2.0);
        assert_eq!(snap.settings.paper_width, 18.0);
        assert_eq!(snap.settings.paper_height, 24.0);
        assert_eq!(snap.settings.title, "Untitled Project");
    }

    #[test]
    fn storage_round_trip_restores_session() {
        let mut s = drawing_session();
        s.toggle_square("3-4");
        let text = s.to_storage_json().unwrap();
        let v: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["version"], 0);
        assert_eq!(v["state"]["step"], 4);

        let back = Session::from_storage_json(&text).unwrap();
        assert_eq!(back.stage(), Stage::Draw);
        assert_eq!(back.settings(), s.settings());
        assert_eq!(back.cropped_image(), Some("crop"));
        assert!(back.completion().is_complete("3-4"));
    }

    #[test]
    fn storage_round_trip_keeps_blank_title_and_notes() {
        let mut s = Session::new();
        s.configure(GridSettings { title: String::new(), ..settings() }).unwrap();
        let back = Session::from_storage_json(&s.to_storage_json().unwrap()).unwrap();
        let restored = back.settings().unwrap();
        assert_eq!(restored.title, "");
        assert_eq!(restored.footer_text(), "");
        assert_eq!(restored.print_title(), "Grid Drawing");
    }

    #[test]
    fn restored_stage_never_outruns_its_data() {
        let text = r#"{"state":{"step":4,"settings":{"squareSize":2,"paperWidth":24,"paperHeight":18},"uploadedImage":"src","croppedImage":null},"version":0}"#;
        let s = Session::from_storage_json(text).unwrap();
        assert_eq!(s.stage(), Stage::Crop);

        let text = r#"{"state":{"step":3,"settings":null},"version":0}"#;
        assert_eq!(Session::from_storage_json(text).unwrap().stage(), Stage::Configure);
        assert!(Session::from_storage_json("{}").is_err());
    }
}
