//! Brightness and hue/saturation/lightness filters.
//!
//! A folder's filters are a pure function of its `exposure` and `hsv`
//! properties. Both filters always run, brightness first, and every channel is
//! clamped to [0, 1] between the two passes.

use image::{Rgba, RgbaImage};

use crate::manifest::FolderEntry;

/// Brightness change per exposure step.
pub const EXPOSURE_STEP: f64 = 0.1;

/// Unit vector along the grey axis, used for the hue rotation.
const GREY_AXIS: f32 = 0.577_35;

/// Exposure slider value → brightness multiplier.
pub fn exposure_to_brightness(exposure: f64) -> f64 {
    1.0 + exposure * EXPOSURE_STEP
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brightness {
    pub multiplier: f32,
}

impl Default for Brightness {
    fn default() -> Self {
        Self { multiplier: 1.0 }
    }
}

impl Brightness {
    pub fn is_identity(&self) -> bool {
        self.multiplier == 1.0
    }

    fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        rgb.map(|c| c * self.multiplier)
    }
}

/// Hue in degrees, saturation and lightness in [-1, 1]; all zero is neutral.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HslAdjust {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
}

impl HslAdjust {
    pub fn is_identity(&self) -> bool {
        self.hue == 0.0 && self.saturation == 0.0 && self.lightness == 0.0
    }

    /// Precompute what is shared by every pixel.
    fn prepare(&self) -> PreparedHsl {
        let (sin, cos) = self.hue.to_radians().sin_cos();
        PreparedHsl {
            rotate: self.hue != 0.0,
            sin,
            cos,
            saturation: self.saturation,
            lightness_target: self.lightness.ceil(),
            lightness_amount: self.lightness.abs(),
        }
    }
}

/// [`HslAdjust`] with the hue angle resolved once per image.
#[derive(Debug, Clone, Copy)]
struct PreparedHsl {
    rotate: bool,
    sin: f32,
    cos: f32,
    saturation: f32,
    lightness_target: f32,
    lightness_amount: f32,
}

impl PreparedHsl {
    fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let [r, g, b] = if self.rotate {
            rotate_hue(rgb, self.sin, self.cos)
        } else {
            rgb
        };

        let average = (r + g + b) / 3.0;
        let s = self.saturation;
        let saturate = |c: f32| {
            if s > 0.0 {
                c + (average - c) * (1.0 - 1.0 / (1.001 - s))
            } else {
                c - (average - c) * s
            }
        };

        [r, g, b].map(|c| {
            let c = saturate(c);
            c + (self.lightness_target - c) * self.lightness_amount
        })
    }
}

/// Rotate a colour around the grey axis (Rodrigues' rotation).
fn rotate_hue([r, g, b]: [f32; 3], sin: f32, cos: f32) -> [f32; 3] {
    let k = GREY_AXIS;
    // k × c with k = (k, k, k)
    let cross = [k * (b - g), k * (r - b), k * (g - r)];
    let along = k * (r + g + b) * k * (1.0 - cos);
    [
        r * cos + cross[0] * sin + along,
        g * cos + cross[1] * sin + along,
        b * cos + cross[2] * sin + along,
    ]
}

/// The filter pair applied to every sprite of a folder.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterChain {
    pub brightness: Brightness,
    pub hsl: HslAdjust,
}

impl FilterChain {
    /// Derive the filters from a folder. Missing fields leave a filter neutral.
    pub fn from_entry(entry: &FolderEntry) -> Self {
        let mut chain = Self::default();
        if let Some(exposure) = entry.exposure() {
            chain.brightness.multiplier = exposure_to_brightness(exposure) as f32;
        }
        if let Some([h, s, l]) = entry.hsv() {
            chain.hsl = HslAdjust {
                hue: h as f32,
                saturation: s as f32,
                lightness: l as f32,
            };
        }
        chain
    }

    pub fn is_identity(&self) -> bool {
        self.brightness.is_identity() && self.hsl.is_identity()
    }

    pub fn apply_pixel(&self, pixel: Rgba<u8>) -> Rgba<u8> {
        self.apply_prepared(&self.hsl.prepare(), pixel)
    }

    fn apply_prepared(&self, hsl: &PreparedHsl, Rgba([r, g, b, a]): Rgba<u8>) -> Rgba<u8> {
        let rgb = [r, g, b].map(|c| f32::from(c) / 255.0);
        let rgb = clamp_unit(self.brightness.apply(rgb));
        let [r, g, b] = clamp_unit(hsl.apply(rgb)).map(|c| (c * 255.0).round() as u8);
        Rgba([r, g, b, a])
    }

    /// Filter a whole image. The source is left untouched.
    pub fn apply(&self, source: &RgbaImage) -> RgbaImage {
        if self.is_identity() {
            return source.clone();
        }
        let hsl = self.hsl.prepare();
        let mut out = source.clone();
        for pixel in out.pixels_mut() {
            *pixel = self.apply_prepared(&hsl, *pixel);
        }
        out
    }
}

fn clamp_unit(rgb: [f32; 3]) -> [f32; 3] {
    rgb.map(|c| c.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_exposure_maps_to_brightness() {
        assert!(approx(exposure_to_brightness(10.0), 2.0));
        assert!(approx(exposure_to_brightness(-10.0), 0.0));
        assert!(approx(exposure_to_brightness(0.0), 1.0));
        assert!(approx(exposure_to_brightness(2.5), 1.25));
    }

    #[test]
    fn test_chain_from_entry() {
        let manifest = Manifest::from_json_str(
            r#"{
                "a": { "exposure": { "tp": "exp", "val": 5 },
                       "hsv": { "tp": "hsv", "val": [90, 0.5, -0.2] },
                       "files": [] },
                "b": { "files": [] }
            }"#,
        )
        .unwrap();

        let a = FilterChain::from_entry(manifest.folder("a").unwrap());
        assert_eq!(a.brightness.multiplier, 1.5);
        assert_eq!(a.hsl, HslAdjust { hue: 90.0, saturation: 0.5, lightness: -0.2 });

        let b = FilterChain::from_entry(manifest.folder("b").unwrap());
        assert!(b.is_identity());
    }

    #[test]
    fn test_neutral_chain_leaves_pixels_alone() {
        let chain = FilterChain::default();
        for px in [[0, 0, 0, 255], [12, 200, 99, 128], [255, 255, 255, 0]] {
            assert_eq!(chain.apply_pixel(Rgba(px)), Rgba(px));
        }
    }

    #[test]
    fn test_brightness_scales_and_clamps() {
        let chain = FilterChain {
            brightness: Brightness { multiplier: 2.0 },
            ..Default::default()
        };
        assert_eq!(chain.apply_pixel(Rgba([50, 100, 200, 255])), Rgba([100, 200, 255, 255]));

        let black = FilterChain {
            brightness: Brightness { multiplier: 0.0 },
            ..Default::default()
        };
        assert_eq!(black.apply_pixel(Rgba([50, 100, 200, 7])), Rgba([0, 0, 0, 7]));
    }

    #[test]
    fn test_full_desaturation_yields_grey() {
        let chain = FilterChain {
            hsl: HslAdjust { saturation: -1.0, ..Default::default() },
            ..Default::default()
        };
        let Rgba([r, g, b, _]) = chain.apply_pixel(Rgba([255, 0, 0, 255]));
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(r, 85);
    }

    #[test]
    fn test_lightness_extremes() {
        let white = FilterChain {
            hsl: HslAdjust { lightness: 1.0, ..Default::default() },
            ..Default::default()
        };
        assert_eq!(white.apply_pixel(Rgba([10, 20, 30, 255])), Rgba([255, 255, 255, 255]));

        let black = FilterChain {
            hsl: HslAdjust { lightness: -1.0, ..Default::default() },
            ..Default::default()
        };
        assert_eq!(black.apply_pixel(Rgba([10, 20, 30, 255])), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_hue_rotation_cycles_primaries() {
        let chain = FilterChain {
            hsl: HslAdjust { hue: 120.0, ..Default::default() },
            ..Default::default()
        };
        let Rgba([r, g, b, _]) = chain.apply_pixel(Rgba([255, 0, 0, 255]));
        assert!(r < 5, "red should be gone, got {r}");
        assert!(g > 250, "green should be full, got {g}");
        assert!(b < 5, "blue should be empty, got {b}");
    }

    #[test]
    fn test_whole_image_matches_per_pixel() {
        let chain = FilterChain {
            brightness: Brightness { multiplier: 1.2 },
            hsl: HslAdjust { hue: -75.0, saturation: 0.3, lightness: -0.1 },
        };
        let source = RgbaImage::from_fn(16, 4, |x, y| Rgba([(x * 16) as u8, (y * 60) as u8, 200 - x as u8, 255]));
        let out = chain.apply(&source);
        for (x, y, px) in source.enumerate_pixels() {
            assert_eq!(*out.get_pixel(x, y), chain.apply_pixel(*px), "pixel {x},{y}");
        }
    }

    #[test]
    fn test_apply_image_keeps_source() {
        let source = RgbaImage::from_pixel(3, 2, Rgba([100, 100, 100, 255]));
        let chain = FilterChain {
            brightness: Brightness { multiplier: 0.5 },
            ..Default::default()
        };
        let out = chain.apply(&source);
        assert_eq!(out.dimensions(), (3, 2));
        assert_eq!(*out.get_pixel(2, 1), Rgba([50, 50, 50, 255]));
        assert_eq!(*source.get_pixel(2, 1), Rgba([100, 100, 100, 255]));
    }
}
