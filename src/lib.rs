#![warn(clippy::all, rust_2018_idioms)]
//! Folder-by-folder exposure and colour tuning for a `data.json` photo manifest.
//!
//! The editor shows every folder of the manifest as a strip of thumbnails with
//! exposure and hue/saturation/lightness sliders, previews a picked image at full
//! size, and writes the edited manifest back out.

mod app;
pub mod config;
pub mod error;
pub mod file_picker;
pub mod filters;
pub mod folder_panel;
pub mod loader;
pub mod manifest;
pub mod overlay;
pub mod slider;
pub mod strip;
#[cfg(not(target_arch = "wasm32"))]
pub mod sync;

pub use app::EditorApp;
pub use error::{EditorError, Result};
