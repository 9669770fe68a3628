//! Full-screen single image viewer with pan and zoom.

use egui::{Color32, Pos2, Rect, Sense, TextureHandle, TextureOptions, Vec2, pos2};

use crate::error::Result;
use crate::filters::FilterChain;
use crate::loader::{LoadedImage, Loader};
use crate::strip::color_image;

/// Zoom change per unit of wheel delta.
pub const WHEEL_ZOOM_RATE: f32 = 0.001;

const FULL_UV: Rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));

/// Largest scale that fits `image` in `viewport`, never above 1.
pub fn fit_scale(image: Vec2, viewport: Vec2) -> f32 {
    (viewport.x / image.x).min(viewport.y / image.y).min(1.0)
}

/// Pan offset from the viewport centre and zoom scale around the image centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanZoom {
    pub pan: Vec2,
    pub zoom: f32,
    drag_from: Option<Pos2>,
}

impl Default for PanZoom {
    fn default() -> Self {
        Self::identity()
    }
}

impl PanZoom {
    pub fn identity() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            drag_from: None,
        }
    }

    /// Centred, scaled to fit.
    pub fn fit(image: Vec2, viewport: Vec2) -> Self {
        Self {
            zoom: fit_scale(image, viewport),
            ..Self::identity()
        }
    }

    /// Multiplicative zoom, unclamped. Positive delta zooms out.
    pub fn wheel(&mut self, delta: f32) {
        self.zoom *= 1.0 - WHEEL_ZOOM_RATE * delta;
    }

    pub fn pointer_down(&mut self, pos: Pos2) {
        self.drag_from = Some(pos);
    }

    /// Pan by the screen-space delta since the last pointer position.
    pub fn pointer_move(&mut self, pos: Pos2) {
        if let Some(from) = self.drag_from {
            self.pan += pos - from;
            self.drag_from = Some(pos);
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag_from = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_from.is_some()
    }

    /// Where the image lands inside `viewport`.
    pub fn image_rect(&self, image: Vec2, viewport: Rect) -> Rect {
        Rect::from_center_size(viewport.center() + self.pan, image * self.zoom)
    }
}

struct OpenImage {
    path: String,
    native_size: Vec2,
    texture: TextureHandle,
    view: PanZoom,
    // Cleared once the view has been fitted to the area it is drawn in.
    needs_fit: bool,
}

enum OverlayState {
    Closed,
    Loading { request: u64, path: String },
    Open(Box<OpenImage>),
}

/// The shared viewer. At most one image is shown at a time.
pub struct Overlay {
    state: OverlayState,
    viewport: Vec2,
    last_request: u64,
}

impl Overlay {
    pub fn new(viewport: Vec2) -> Self {
        Self {
            state: OverlayState::Closed,
            viewport,
            last_request: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, OverlayState::Closed)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, OverlayState::Loading { .. })
    }

    pub fn view(&self) -> Option<&PanZoom> {
        match &self.state {
            OverlayState::Open(open) => Some(&open.view),
            _ => None,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match &self.state {
            OverlayState::Closed => None,
            OverlayState::Loading { path, .. } => Some(path),
            OverlayState::Open(open) => Some(&open.path),
        }
    }

    /// Clear whatever is shown and start loading `path` with `filters`.
    pub fn open(&mut self, loader: &Loader, path: String, filters: FilterChain) {
        let request = self.begin(path.clone());
        loader.load_full_image(request, path, filters);
    }

    fn begin(&mut self, path: String) -> u64 {
        self.last_request += 1;
        self.state = OverlayState::Loading {
            request: self.last_request,
            path,
        };
        self.last_request
    }

    /// Finish a load started by [`Overlay::open`]. Results of superseded or
    /// closed requests are dropped.
    pub fn finish_loading(&mut self, ctx: &egui::Context, request: u64, result: Result<LoadedImage>) {
        let path = match &self.state {
            OverlayState::Loading { request: current, path } if *current == request => path.clone(),
            _ => {
                log::debug!("Dropping stale overlay image (request {request})");
                return;
            }
        };

        match result {
            Ok(image) => {
                let [w, h] = image.native_size;
                let native_size = Vec2::new(w as f32, h as f32);
                let texture = ctx.load_texture("overlay", color_image(&image.pixels), TextureOptions::LINEAR);
                self.state = OverlayState::Open(Box::new(OpenImage {
                    path,
                    native_size,
                    texture,
                    view: PanZoom::fit(native_size, self.viewport),
                    needs_fit: true,
                }));
            }
            Err(e) => {
                log::error!("Error loading image for overlay {path}: {e}");
                self.state = OverlayState::Closed;
            }
        }
    }

    /// Space the next image will be fitted into, while nothing is shown.
    pub fn set_viewport(&mut self, viewport: Vec2) {
        self.viewport = viewport;
    }

    /// Drop the image and reset pan/zoom.
    pub fn close(&mut self) {
        self.state = OverlayState::Closed;
    }

    /// Draw the viewer into the remaining space of `ui`.
    pub fn show(&mut self, ui: &mut egui::Ui) {
        let mut close = false;
        ui.horizontal(|ui| {
            if ui.button("✖ Close").clicked() {
                close = true;
            }
            if let Some(path) = self.path() {
                ui.label(path);
            }
        });

        let (viewport, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.viewport = viewport.size();
        let painter = ui.painter_at(viewport);
        painter.rect_filled(viewport, 0.0, Color32::from_black_alpha(230));

        match &mut self.state {
            OverlayState::Closed => {}
            OverlayState::Loading { .. } => {
                painter.text(
                    viewport.center(),
                    egui::Align2::CENTER_CENTER,
                    "Loading…",
                    egui::FontId::proportional(20.0),
                    Color32::WHITE,
                );
            }
            OverlayState::Open(open) => {
                if open.needs_fit {
                    open.view = PanZoom::fit(open.native_size, viewport.size());
                    open.needs_fit = false;
                }
                let image_rect = open.view.image_rect(open.native_size, viewport);
                let pointer = ui.input(|i| i.pointer.interact_pos());

                // egui reports the drag past its threshold; pan from where the press landed.
                if response.drag_started() {
                    let origin = ui.input(|i| i.pointer.press_origin());
                    if let Some(pos) = origin.filter(|p| image_rect.contains(*p)) {
                        open.view.pointer_down(pos);
                    }
                }
                if response.dragged() {
                    if let Some(pos) = pointer {
                        if viewport.contains(pos) {
                            open.view.pointer_move(pos);
                        } else {
                            open.view.pointer_up();
                        }
                    }
                }
                if response.drag_stopped() {
                    open.view.pointer_up();
                }

                if response.hovered() {
                    let scroll = ui.input(|i| i.raw_scroll_delta.y);
                    if scroll != 0.0 {
                        // Wheel-down is a positive delta in browsers, negative in egui.
                        open.view.wheel(-scroll);
                    }
                }

                let image_rect = open.view.image_rect(open.native_size, viewport);
                painter.image(open.texture.id(), image_rect, FULL_UV, Color32::WHITE);
            }
        }

        if close {
            self.close();
        }
    }
}
