use grid_core::constants::STORAGE_KEY;
use grid_core::{GridError, Result, Session};
use web_sys::{Storage, Window};

use crate::constants::QUOTA_MESSAGE;
use crate::utils::log;

fn stores(window: &Window) -> [(&'static str, Option<Storage>); 2] {
    [
        ("localStorage", window.local_storage().ok().flatten()),
        ("sessionStorage", window.session_storage().ok().flatten()),
    ]
}

/// Writes the session to localStorage, falling back to sessionStorage.
pub fn save_session(window: &Window, session: &Session) -> Result<()> {
    let text = session.to_storage_json()?;
    for (name, store) in stores(window) {
        let Some(store) = store else {
            continue;
        };
        match store.set_item(STORAGE_KEY, &text) {
            Ok(()) => return Ok(()),
            Err(_) => log(&format!("{name} rejected {} bytes", text.len())),
        }
    }
    Err(GridError::Persistence(QUOTA_MESSAGE.to_string()))
}

/// The most recently stored session, if any store holds a readable one.
pub fn load_session(window: &Window) -> Option<Session> {
    for (name, store) in stores(window) {
        let Some(text) = store.and_then(|s| s.get_item(STORAGE_KEY).ok().flatten()) else {
            continue;
        };
        match Session::from_storage_json(&text) {
            Ok(session) => return Some(session),
            Err(e) => log(&format!("ignoring stored session in {name}: {e}")),
        }
    }
    None
}
