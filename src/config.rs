/// Editor settings, persisted between runs through eframe storage.
///
/// The manifest itself is never persisted here; it is only written by Save.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct Settings {
    /// Directory (or URL prefix on the web) holding `data.json` and one
    /// sub-directory of images per folder.
    pub data_dir: String,
    /// Display height of thumbnails, in points.
    pub thumb_height: u32,
    /// Horizontal gap between thumbnails, in points.
    pub strip_gap: f32,
}

pub const DEFAULT_DATA_DIR: &str = "data";

/// Thumbnail heights the strip can work with.
pub const THUMB_HEIGHT_RANGE: std::ops::RangeInclusive<u32> = 16..=2000;

/// Gaps between thumbnails, in points.
pub const STRIP_GAP_RANGE: std::ops::RangeInclusive<f32> = 0.0..=100.0;

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_owned(),
            thumb_height: 400,
            strip_gap: 5.0,
        }
    }
}

impl Settings {
    /// Stored settings, with `data_dir` overridden when one is given.
    pub fn resolve(stored: Option<Self>, data_dir: Option<String>) -> Self {
        let mut settings = stored.unwrap_or_default();
        if let Some(dir) = data_dir {
            settings.data_dir = dir;
        }
        let defaults = Self::default();
        if settings.thumb_height == 0 {
            log::warn!("Thumbnail height of 0 is unusable, falling back to the default");
            settings.thumb_height = defaults.thumb_height;
        }
        let height = settings
            .thumb_height
            .clamp(*THUMB_HEIGHT_RANGE.start(), *THUMB_HEIGHT_RANGE.end());
        if height != settings.thumb_height {
            log::warn!("Thumbnail height {} out of range, using {height}", settings.thumb_height);
            settings.thumb_height = height;
        }

        if !settings.strip_gap.is_finite() {
            settings.strip_gap = defaults.strip_gap;
        }
        settings.strip_gap = settings
            .strip_gap
            .clamp(*STRIP_GAP_RANGE.start(), *STRIP_GAP_RANGE.end());
        settings
    }
}
