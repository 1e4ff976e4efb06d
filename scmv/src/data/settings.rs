use std::{ops::RangeInclusive, sync::Arc};

use crate::data::prefs::{keys, PreferenceStore, StoreError};

pub const DEFAULT_TRACK_LINE_WIDTH: f32 = 6.0;
pub const DEFAULT_STOP_MARKER_SIZE: i32 = 16;
pub const DEFAULT_ARROW_SIZE: i32 = 8;
pub const DEFAULT_APP_LANGUAGE: &str = "uk";

pub const TRACK_LINE_WIDTH_RANGE: RangeInclusive<f32> = 2.0..=24.0;
pub const STOP_MARKER_SIZE_RANGE: RangeInclusive<i32> = 12..=32;
pub const ARROW_SIZE_RANGE: RangeInclusive<i32> = 2..=16;

/// Current values of all map settings
#[derive(Debug, Clone, PartialEq)]
pub struct AppSettingsData {
    pub track_line_width: f32,
    pub stop_marker_size: i32,
    pub arrow_size: i32,
    pub app_language: String,
}

impl Default for AppSettingsData {
    fn default() -> Self {
        Self {
            track_line_width: DEFAULT_TRACK_LINE_WIDTH,
            stop_marker_size: DEFAULT_STOP_MARKER_SIZE,
            arrow_size: DEFAULT_ARROW_SIZE,
            app_language: DEFAULT_APP_LANGUAGE.to_string(),
        }
    }
}

/// User adjustable settings, kept in the preference store
///
/// Setters clamp their input to the allowed range.
pub struct AppSettings {
    store: Arc<PreferenceStore>,
}

impl AppSettings {
    pub fn new(store: Arc<PreferenceStore>) -> Self {
        Self { store }
    }

    pub fn settings(&self) -> AppSettingsData {
        let prefs = self.store.snapshot();

        AppSettingsData {
            track_line_width: prefs
                .get_f64(keys::TRACK_LINE_WIDTH)
                .map_or(DEFAULT_TRACK_LINE_WIDTH, |width| width as f32),
            stop_marker_size: prefs
                .get_i64(keys::STOP_MARKER_SIZE)
                .map_or(DEFAULT_STOP_MARKER_SIZE, |size| size as i32),
            arrow_size: prefs
                .get_i64(keys::ARROW_SIZE)
                .map_or(DEFAULT_ARROW_SIZE, |size| size as i32),
            app_language: prefs
                .get_string(keys::APP_LANGUAGE)
                .unwrap_or(DEFAULT_APP_LANGUAGE)
                .to_string(),
        }
    }

    pub fn set_track_line_width(&self, width: f32) -> Result<(), StoreError> {
        let width = width.clamp(*TRACK_LINE_WIDTH_RANGE.start(), *TRACK_LINE_WIDTH_RANGE.end());
        self.store
            .edit(|prefs| prefs.set(keys::TRACK_LINE_WIDTH, width))
    }

    pub fn set_stop_marker_size(&self, size: i32) -> Result<(), StoreError> {
        let size = size.clamp(*STOP_MARKER_SIZE_RANGE.start(), *STOP_MARKER_SIZE_RANGE.end());
        self.store
            .edit(|prefs| prefs.set(keys::STOP_MARKER_SIZE, size))
    }

    pub fn set_arrow_size(&self, size: i32) -> Result<(), StoreError> {
        let size = size.clamp(*ARROW_SIZE_RANGE.start(), *ARROW_SIZE_RANGE.end());
        self.store.edit(|prefs| prefs.set(keys::ARROW_SIZE, size))
    }

    pub fn set_app_language(&self, language: &str) -> Result<(), StoreError> {
        self.store
            .edit(|prefs| prefs.set(keys::APP_LANGUAGE, language))
    }

    /// Resets line width and stop marker size, arrow size and language are kept
    pub fn reset_to_defaults(&self) -> Result<(), StoreError> {
        self.store.edit(|prefs| {
            for key in [keys::TRACK_LINE_WIDTH, keys::STOP_MARKER_SIZE] {
                prefs.remove(key);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dir: &tempfile::TempDir) -> AppSettings {
        AppSettings::new(Arc::new(PreferenceStore::open(dir.path().join("prefs.json"))))
    }

    #[test]
    fn it_starts_with_defaults() {
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(settings(&dir).settings(), AppSettingsData::default());
    }

    #[test]
    fn setters_clamp_to_their_range() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir);

        settings.set_track_line_width(100.0).unwrap();
        settings.set_stop_marker_size(1).unwrap();
        settings.set_arrow_size(9).unwrap();

        let current = settings.settings();
        assert_eq!(current.track_line_width, 24.0);
        assert_eq!(current.stop_marker_size, 12);
        assert_eq!(current.arrow_size, 9);
    }

    #[test]
    fn reset_keeps_arrow_size_and_language() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir);
        settings.set_track_line_width(10.0).unwrap();
        settings.set_stop_marker_size(20).unwrap();
        settings.set_arrow_size(3).unwrap();
        settings.set_app_language("ru").unwrap();

        settings.reset_to_defaults().unwrap();

        assert_eq!(
            settings.settings(),
            AppSettingsData {
                arrow_size: 3,
                app_language: "ru".into(),
                ..Default::default()
            }
        );
    }
}
