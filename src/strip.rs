//! A folder's row of thumbnails.

use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, TextureHandle, TextureOptions, Vec2, pos2, vec2};
use image::RgbaImage;

use crate::filters::FilterChain;
use crate::loader::LoadedImage;

const FULL_UV: Rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
const LABEL_OFFSET: Vec2 = vec2(5.0, 5.0);
const LABEL_FONT_SIZE: f32 = 20.0;

/// Width of an image scaled to `height`, aspect ratio preserved.
pub fn scaled_width(native: [u32; 2], height: f32) -> f32 {
    let [w, h] = native;
    if h == 0 {
        return 0.0;
    }
    w as f32 * height / h as f32
}

/// Number shown on a thumbnail: its 1-based position in the file list.
pub fn number_label(index: usize) -> String {
    (index + 1).to_string()
}

pub(crate) fn color_image(image: &RgbaImage) -> egui::ColorImage {
    let size = [image.width() as usize, image.height() as usize];
    egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw())
}

/// One loaded thumbnail.
pub struct Sprite {
    /// Position in the folder's file list (not among loaded images).
    pub index: usize,
    pub file: String,
    /// Placement relative to the strip origin.
    pub rect: Rect,
    source: RgbaImage,
    texture: TextureHandle,
}

impl Sprite {
    fn render(&mut self, filters: &FilterChain) {
        let filtered = filters.apply(&self.source);
        self.texture.set(color_image(&filtered), TextureOptions::LINEAR);
    }
}

/// The strip surface: sprites laid out left to right at a fixed height.
pub struct ImageStrip {
    height: f32,
    gap: f32,
    next_x: f32,
    sprites: Vec<Sprite>,
    failed: Vec<usize>,
}

impl ImageStrip {
    pub fn new(height: f32, gap: f32) -> Self {
        Self {
            height,
            gap,
            next_x: 0.0,
            sprites: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Append a loaded image and render it with `filters`.
    pub fn push(
        &mut self,
        ctx: &egui::Context,
        index: usize,
        file: &str,
        image: LoadedImage,
        filters: &FilterChain,
    ) {
        let width = scaled_width(image.native_size, self.height);
        let rect = Rect::from_min_size(pos2(self.next_x, 0.0), vec2(width, self.height));
        self.next_x += width + self.gap;

        let texture = ctx.load_texture(
            format!("thumb-{file}-{index}"),
            color_image(&filters.apply(&image.pixels)),
            TextureOptions::LINEAR,
        );
        self.sprites.push(Sprite {
            index,
            file: file.to_owned(),
            rect,
            source: image.pixels,
            texture,
        });
    }

    pub fn mark_failed(&mut self, index: usize) {
        self.failed.push(index);
    }

    /// Re-render every sprite. Safe to repeat.
    pub fn apply_filters(&mut self, filters: &FilterChain) {
        for sprite in &mut self.sprites {
            sprite.render(filters);
        }
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn failed(&self) -> &[usize] {
        &self.failed
    }

    /// Surface size: every sprite plus its trailing gap, by the display height.
    pub fn surface_size(&self) -> Vec2 {
        vec2(self.next_x, self.height)
    }

    /// Sprite under a point given relative to the strip origin.
    pub fn sprite_at(&self, local: Pos2) -> Option<&Sprite> {
        self.sprites.iter().find(|s| s.rect.contains(local))
    }

    /// Draw the strip. Returns the clicked sprite's list index and file.
    pub fn show(&self, ui: &mut egui::Ui, id_salt: &str) -> Option<(usize, String)> {
        let mut clicked = None;
        egui::ScrollArea::horizontal().id_salt(id_salt).show(ui, |ui| {
            let (rect, response) = ui.allocate_exact_size(self.surface_size(), Sense::click());
            let painter = ui.painter_at(rect);
            let origin = rect.min.to_vec2();

            for sprite in &self.sprites {
                let target = sprite.rect.translate(origin);
                painter.image(sprite.texture.id(), target, FULL_UV, Color32::WHITE);
                draw_number(&painter, target.min + LABEL_OFFSET, &number_label(sprite.index));
            }

            let hovered = response
                .hover_pos()
                .and_then(|pos| self.sprite_at(pos - origin));
            if hovered.is_some() {
                ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
            }
            if response.clicked() {
                clicked = response
                    .interact_pointer_pos()
                    .and_then(|pos| self.sprite_at(pos - origin))
                    .map(|s| (s.index, s.file.clone()));
            }
        });
        clicked
    }
}

/// White number with a thin black outline.
fn draw_number(painter: &egui::Painter, pos: Pos2, text: &str) {
    let font = FontId::proportional(LABEL_FONT_SIZE);
    for offset in [vec2(-1.0, 0.0), vec2(1.0, 0.0), vec2(0.0, -1.0), vec2(0.0, 1.0)] {
        painter.text(pos + offset, Align2::LEFT_TOP, text, font.clone(), Color32::BLACK);
    }
    painter.text(pos, Align2::LEFT_TOP, text, font, Color32::WHITE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Brightness;
    use image::Rgba;

    fn loaded(w: u32, h: u32) -> LoadedImage {
        LoadedImage {
            native_size: [w * 10, h * 10],
            pixels: RgbaImage::from_pixel(w, h, Rgba([100, 100, 100, 255])),
        }
    }

    #[test]
    fn test_scaled_width_keeps_aspect() {
        assert_eq!(scaled_width([800, 400], 400.0), 800.0);
        assert_eq!(scaled_width([300, 600], 400.0), 200.0);
        assert_eq!(scaled_width([300, 0], 400.0), 0.0);
    }

    #[test]
    fn test_numbers_keep_gaps() {
        let ctx = egui::Context::default();
        let mut strip = ImageStrip::new(40.0, 5.0);
        strip.push(&ctx, 0, "a.jpg", loaded(8, 4), &FilterChain::default());
        strip.mark_failed(1);
        strip.push(&ctx, 2, "c.jpg", loaded(4, 4), &FilterChain::default());

        let labels: Vec<_> = strip.sprites().iter().map(|s| number_label(s.index)).collect();
        assert_eq!(labels, ["1", "3"]);
        assert_eq!(strip.failed(), [1]);
    }

    #[test]
    fn test_layout_and_surface_size() {
        let ctx = egui::Context::default();
        let mut strip = ImageStrip::new(40.0, 5.0);
        strip.push(&ctx, 0, "wide.jpg", loaded(8, 4), &FilterChain::default());
        strip.push(&ctx, 1, "square.jpg", loaded(4, 4), &FilterChain::default());

        let rects: Vec<_> = strip.sprites().iter().map(|s| s.rect).collect();
        assert_eq!(rects[0], Rect::from_min_size(pos2(0.0, 0.0), vec2(80.0, 40.0)));
        assert_eq!(rects[1], Rect::from_min_size(pos2(85.0, 0.0), vec2(40.0, 40.0)));
        assert_eq!(strip.surface_size(), vec2(130.0, 40.0));
    }

    #[test]
    fn test_hit_testing() {
        let ctx = egui::Context::default();
        let mut strip = ImageStrip::new(40.0, 5.0);
        strip.push(&ctx, 0, "a.jpg", loaded(4, 4), &FilterChain::default());
        strip.push(&ctx, 3, "d.jpg", loaded(4, 4), &FilterChain::default());

        assert_eq!(strip.sprite_at(pos2(10.0, 10.0)).map(|s| s.index), Some(0));
        assert_eq!(strip.sprite_at(pos2(60.0, 10.0)).map(|s| s.file.as_str()), Some("d.jpg"));
        assert!(strip.sprite_at(pos2(42.0, 10.0)).is_none());
    }

    #[test]
    fn test_apply_filters_keeps_sources() {
        let ctx = egui::Context::default();
        let mut strip = ImageStrip::new(40.0, 5.0);
        strip.push(&ctx, 0, "a.jpg", loaded(2, 2), &FilterChain::default());

        let dark = FilterChain {
            brightness: Brightness { multiplier: 0.0 },
            ..Default::default()
        };
        strip.apply_filters(&dark);
        strip.apply_filters(&FilterChain::default());
        assert_eq!(*strip.sprites()[0].source.get_pixel(0, 0), Rgba([100, 100, 100, 255]));
    }
}
