//! One folder's section: sliders, image strip and the generic field block.

use serde_json::json;

use crate::error::{EditorError, Result};
use crate::filters::FilterChain;
use crate::loader::LoadedImage;
use crate::manifest::{FolderEntry, TypedField};
use crate::slider::SliderInput;
use crate::strip::ImageStrip;

/// Reject keys that cannot be used as a single `data/<key>/` path segment.
pub fn validate_folder_key(key: &str) -> Result<()> {
    let invalid = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\']);
    if invalid {
        return Err(EditorError::InvalidFolderKey(key.to_owned()));
    }
    Ok(())
}

struct HsvSliders {
    hue: SliderInput,
    saturation: SliderInput,
    lightness: SliderInput,
}

impl HsvSliders {
    fn new([h, s, l]: [f64; 3]) -> Self {
        Self {
            hue: SliderInput::new("Hue", -180.0..=180.0, 1.0, h),
            saturation: SliderInput::new("Saturation", -1.0..=1.0, 0.01, s),
            lightness: SliderInput::new("Lightness", -1.0..=1.0, 0.01, l),
        }
    }

    fn set_values(&mut self, [h, s, l]: [f64; 3]) {
        self.hue.set_value(h);
        self.saturation.set_value(s);
        self.lightness.set_value(l);
    }
}

/// What the app has to do after a frame of this panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelAction {
    /// A thumbnail was clicked.
    OpenImage { index: usize, file: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Queued,
    Loading,
    Done,
}

pub struct FolderPanel {
    name: String,
    exposure: Option<SliderInput>,
    hsv: Option<HsvSliders>,
    strip: ImageStrip,
    filters: FilterChain,
    state: BuildState,
}

impl FolderPanel {
    /// Create the section and its (empty) strip surface.
    pub fn new(name: &str, entry: &FolderEntry, thumb_height: f32, gap: f32) -> Result<Self> {
        validate_folder_key(name)?;
        Ok(Self {
            name: name.to_owned(),
            exposure: entry
                .exposure()
                .map(|e| SliderInput::new("Exposure", -10.0..=10.0, 0.1, e)),
            hsv: entry.hsv().map(HsvSliders::new),
            strip: ImageStrip::new(thumb_height, gap),
            filters: FilterChain::from_entry(entry),
            state: BuildState::Queued,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filters(&self) -> FilterChain {
        self.filters
    }

    pub fn strip(&self) -> &ImageStrip {
        &self.strip
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn exposure_slider(&self) -> Option<&SliderInput> {
        self.exposure.as_ref()
    }

    /// Hue, saturation and lightness sliders, when the folder has `hsv`.
    pub fn hsv_sliders(&self) -> Option<[&SliderInput; 3]> {
        self.hsv
            .as_ref()
            .map(|s| [&s.hue, &s.saturation, &s.lightness])
    }

    pub fn start_loading(&mut self) {
        self.state = BuildState::Loading;
    }

    pub fn finish_loading(&mut self) {
        self.state = BuildState::Done;
    }

    pub fn add_thumbnail(&mut self, ctx: &egui::Context, index: usize, file: &str, image: LoadedImage) {
        self.strip.push(ctx, index, file, image, &self.filters);
    }

    pub fn mark_failed(&mut self, index: usize) {
        self.strip.mark_failed(index);
    }

    /// Re-derive the filters from `entry` and re-render every sprite.
    pub fn refresh_filters(&mut self, entry: &FolderEntry) {
        self.filters = FilterChain::from_entry(entry);
        self.strip.apply_filters(&self.filters);
    }

    /// Move the sliders to the values in `entry` without firing callbacks.
    pub fn sync_sliders(&mut self, entry: &FolderEntry) {
        if let (Some(slider), Some(value)) = (&mut self.exposure, entry.exposure()) {
            slider.set_value(value);
        }
        if let (Some(sliders), Some(hsv)) = (&mut self.hsv, entry.hsv()) {
            sliders.set_values(hsv);
        }
    }

    /// Store a slider change and refresh this folder's filters.
    pub fn apply_exposure(&mut self, entry: &mut FolderEntry, value: f64) {
        if entry.set_exposure(value) {
            self.refresh_filters(entry);
        }
    }

    pub fn apply_hsv(&mut self, entry: &mut FolderEntry, component: usize, value: f64) {
        if entry.set_hsv_component(component, value) {
            self.refresh_filters(entry);
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, entry: &mut FolderEntry) -> Option<PanelAction> {
        let mut action = None;

        ui.horizontal_wrapped(|ui| {
            ui.heading(&self.name);
            ui.add_space(12.0);

            if let Some(value) = self.exposure.as_mut().and_then(|s| s.show(ui)) {
                self.apply_exposure(entry, value);
            }

            let mut hsv_change = None;
            if let Some(sliders) = &mut self.hsv {
                for (component, slider) in [&mut sliders.hue, &mut sliders.saturation, &mut sliders.lightness]
                    .into_iter()
                    .enumerate()
                {
                    if let Some(value) = slider.show(ui) {
                        hsv_change = Some((component, value));
                    }
                }
            }
            if let Some((component, value)) = hsv_change {
                self.apply_hsv(entry, component, value);
            }
        });

        match self.state {
            BuildState::Queued => {
                ui.label("Waiting…");
            }
            BuildState::Loading if self.strip.sprites().is_empty() => {
                ui.spinner();
            }
            _ => {}
        }

        if let Some((index, file)) = self.strip.show(ui, &self.name) {
            action = Some(PanelAction::OpenImage { index, file });
        }
        if !self.strip.failed().is_empty() {
            ui.weak(format!("{} image(s) could not be loaded", self.strip.failed().len()));
        }

        show_extra_fields(ui, &self.name, entry);
        action
    }
}

/// Generic block for every property other than exposure and hsv.
fn show_extra_fields(ui: &mut egui::Ui, folder: &str, entry: &mut FolderEntry) {
    for (key, field) in entry.extra_fields_mut() {
        match field {
            TypedField::Text(text) => {
                ui.label(format!("{key}:"));
                ui.add(
                    egui::TextEdit::multiline(text)
                        .id_salt((folder, key))
                        .desired_rows(2)
                        .desired_width(f32::INFINITY),
                );
            }
            TypedField::Flag(_) => {
                let mut checked = field.is_set();
                if ui.checkbox(&mut checked, format!("{key}:")).changed() {
                    *field = TypedField::Flag(json!(u8::from(checked)));
                }
            }
            other => {
                ui.label(format!("{key}: {}", other.display_value()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use image::{Rgba, RgbaImage};

    fn manifest() -> Manifest {
        Manifest::from_json_str(
            r#"{
                "beach": {
                    "exposure": { "tp": "exp", "val": 0 },
                    "hsv": { "tp": "hsv", "val": [0, 0, 0] },
                    "files": ["a.jpg", "b.jpg", "c.jpg"]
                },
                "plain": { "files": [] }
            }"#,
        )
        .unwrap()
    }

    fn loaded() -> LoadedImage {
        LoadedImage {
            native_size: [20, 10],
            pixels: RgbaImage::from_pixel(2, 1, Rgba([100, 100, 100, 255])),
        }
    }

    #[test]
    fn test_folder_keys() {
        assert!(validate_folder_key("beach").is_ok());
        assert!(validate_folder_key("beach 2024").is_ok());
        for bad in ["", ".", "..", "a/b", "a\\b"] {
            assert!(matches!(validate_folder_key(bad), Err(EditorError::InvalidFolderKey(_))));
        }
    }

    #[test]
    fn test_sliders_follow_field_tags() {
        let manifest = manifest();
        let beach = FolderPanel::new("beach", manifest.folder("beach").unwrap(), 400.0, 5.0).unwrap();
        assert!(beach.exposure_slider().is_some());
        let labels = beach.hsv_sliders().unwrap().map(|s| s.label());
        assert_eq!(labels, ["Hue", "Saturation", "Lightness"]);

        let plain = FolderPanel::new("plain", manifest.folder("plain").unwrap(), 400.0, 5.0).unwrap();
        assert!(plain.exposure_slider().is_none());
        assert!(plain.hsv_sliders().is_none());
        assert!(plain.filters().is_identity());
    }

    #[test]
    fn test_slider_change_updates_entry_and_filters() {
        let mut manifest = manifest();
        let entry = manifest.folder_mut("beach").unwrap();
        let mut panel = FolderPanel::new("beach", entry, 400.0, 5.0).unwrap();

        panel.apply_exposure(entry, 10.0);
        assert_eq!(entry.exposure(), Some(10.0));
        assert_eq!(panel.filters().brightness.multiplier, 2.0);

        panel.apply_hsv(entry, 1, -0.5);
        assert_eq!(entry.hsv(), Some([0.0, -0.5, 0.0]));
        assert_eq!(panel.filters().hsl.saturation, -0.5);
    }

    #[test]
    fn test_sync_sliders_after_load() {
        let mut manifest = manifest();
        let entry = manifest.folder_mut("beach").unwrap();
        let mut panel = FolderPanel::new("beach", entry, 400.0, 5.0).unwrap();

        entry.set_exposure(5.0);
        entry.set_hsv([90.0, 0.25, -1.0]);
        panel.sync_sliders(entry);
        panel.refresh_filters(entry);

        let exposure = panel.exposure_slider().unwrap();
        assert_eq!((exposure.position(), exposure.text()), (5.0, "5"));
        let [hue, sat, light] = panel.hsv_sliders().unwrap();
        assert_eq!(hue.text(), "90");
        assert_eq!(sat.position(), 0.25);
        assert_eq!(light.text(), "-1");
        assert_eq!(panel.filters().brightness.multiplier, 1.5);
    }

    #[test]
    fn test_thumbnails_use_current_filters() {
        let ctx = egui::Context::default();
        let mut manifest = manifest();
        let entry = manifest.folder_mut("beach").unwrap();
        let mut panel = FolderPanel::new("beach", entry, 10.0, 5.0).unwrap();
        panel.start_loading();

        panel.add_thumbnail(&ctx, 0, "a.jpg", loaded());
        panel.mark_failed(1);
        panel.add_thumbnail(&ctx, 2, "c.jpg", loaded());
        panel.finish_loading();

        assert_eq!(panel.state(), BuildState::Done);
        assert_eq!(panel.strip().sprites().len(), 2);
        assert_eq!(panel.strip().failed(), [1]);
        panel.apply_exposure(entry, -3.0);
        assert_eq!(panel.filters(), FilterChain::from_entry(entry));
    }
}
