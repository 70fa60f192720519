//! Small best-effort key/value store for UI state.
//!
//! One file per key under a state directory. Nothing here ever returns an
//! error: unreadable or corrupt values fall back to defaults and failed writes
//! are dropped, so a bad file can never stop the app from starting.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::default_state_dir;
use crate::state::ChatTurn;

/// Most recent turns kept on disk.
pub const TRANSCRIPT_LIMIT: usize = 50;

const THEME_KEY: &str = "theme";
const LAST_QUERY_KEY: &str = "last_query";
const TRANSCRIPT_KEY: &str = "chat_transcript.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn open_default() -> Option<Self> {
        default_state_dir().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_key(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.root.join(key)) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::debug!(key, error = %e, "stored value unavailable");
                None
            }
        }
    }

    fn write_key(&self, key: &str, value: &str) {
        let result = fs::create_dir_all(&self.root).and_then(|_| fs::write(self.root.join(key), value));
        if let Err(e) = result {
            tracing::debug!(key, error = %e, "could not persist value");
        }
    }

    fn remove_key(&self, key: &str) {
        let _ = fs::remove_file(self.root.join(key));
    }

    pub fn theme(&self) -> Theme {
        match self.read_key(THEME_KEY).as_deref().map(str::trim) {
            Some("light") => Theme::Light,
            Some("dark") => Theme::Dark,
            _ => Theme::default(),
        }
    }

    pub fn set_theme(&self, theme: Theme) {
        self.write_key(THEME_KEY, theme.as_str());
    }

    pub fn last_query(&self) -> Option<String> {
        self.read_key(LAST_QUERY_KEY).filter(|q| !q.trim().is_empty())
    }

    pub fn set_last_query(&self, query: &str) {
        if query.trim().is_empty() {
            self.remove_key(LAST_QUERY_KEY);
        } else {
            self.write_key(LAST_QUERY_KEY, query);
        }
    }

    pub fn transcript(&self) -> Vec<ChatTurn> {
        let Some(raw) = self.read_key(TRANSCRIPT_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<ChatTurn>>(&raw) {
            Ok(turns) => trailing_window(&turns).to_vec(),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring corrupt transcript");
                Vec::new()
            }
        }
    }

    /// Persist the last [`TRANSCRIPT_LIMIT`] turns, oldest dropped first.
    pub fn set_transcript(&self, turns: &[ChatTurn]) {
        match serde_json::to_string(trailing_window(turns)) {
            Ok(json) => self.write_key(TRANSCRIPT_KEY, &json),
            Err(e) => tracing::debug!(error = %e, "could not serialize transcript"),
        }
    }

    pub fn clear_transcript(&self) {
        self.remove_key(TRANSCRIPT_KEY);
    }
}

pub fn trailing_window(turns: &[ChatTurn]) -> &[ChatTurn] {
    &turns[turns.len().saturating_sub(TRANSCRIPT_LIMIT)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, LocalStore) {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path().join("state"));
        (tmp, store)
    }

    #[test]
    fn test_defaults_when_empty() {
        let (_tmp, store) = store();
        assert_eq!(store.theme(), Theme::Dark);
        assert_eq!(store.last_query(), None);
        assert!(store.transcript().is_empty());
    }

    #[test]
    fn test_theme_and_query_persist() {
        let (_tmp, store) = store();
        store.set_theme(Theme::Light);
        store.set_last_query("qdrant setup");
        assert_eq!(store.theme(), Theme::Light);
        assert_eq!(store.last_query().as_deref(), Some("qdrant setup"));

        store.set_last_query("");
        assert_eq!(store.last_query(), None);
    }

    #[test]
    fn test_transcript_capped_at_limit() {
        let (_tmp, store) = store();
        let turns: Vec<ChatTurn> = (0..120).map(|i| ChatTurn::user(format!("q{}", i))).collect();
        store.set_transcript(&turns);

        let loaded = store.transcript();
        assert_eq!(loaded.len(), TRANSCRIPT_LIMIT);
        assert_eq!(loaded.first().unwrap().text, "q70");
        assert_eq!(loaded.last().unwrap().text, "q119");
    }

    #[test]
    fn test_corrupt_transcript_is_ignored() {
        let (_tmp, store) = store();
        fs::create_dir_all(store.root()).unwrap();
        fs::write(store.root().join(TRANSCRIPT_KEY), "[{broken").unwrap();
        fs::write(store.root().join(THEME_KEY), "purple").unwrap();

        assert!(store.transcript().is_empty());
        assert_eq!(store.theme(), Theme::Dark);
    }

    #[test]
    fn test_unwritable_root_is_silent() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();

        let store = LocalStore::new(&file);
        store.set_theme(Theme::Light);
        store.set_transcript(&[ChatTurn::user("hello")]);
        assert_eq!(store.theme(), Theme::Dark);
        assert!(store.transcript().is_empty());
    }
}
