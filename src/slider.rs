//! A range control paired with a numeric text box.

use std::ops::RangeInclusive;

/// Slider state. The range position and the text box are kept in sync:
/// dragging rewrites the text, committing valid text moves the range.
#[derive(Debug, Clone, PartialEq)]
pub struct SliderInput {
    label: &'static str,
    min: f64,
    max: f64,
    step: f64,
    position: f64,
    text: String,
}

impl SliderInput {
    pub fn new(label: &'static str, range: RangeInclusive<f64>, step: f64, initial: f64) -> Self {
        let (min, max) = range.into_inner();
        let mut slider = Self {
            label,
            min,
            max,
            step,
            position: 0.0,
            text: String::new(),
        };
        slider.set_value(initial);
        slider
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The user dragged the range control. Returns the value to store.
    pub fn drag_to(&mut self, raw: f64) -> f64 {
        let value = self.snap(raw);
        self.position = value;
        self.text = format_value(value);
        value
    }

    /// The user committed the text box.
    ///
    /// Returns `None` for non-numeric text, in which case nothing moves. A
    /// number outside the range is returned as typed; only the range control
    /// is clamped.
    pub fn commit_text(&mut self) -> Option<f64> {
        let value = parse_float(&self.text)?;
        self.position = value.clamp(self.min, self.max);
        Some(value)
    }

    /// Replace the text box contents, as if typed.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Move both controls without reporting a change.
    pub fn set_value(&mut self, value: f64) {
        self.position = value.clamp(self.min, self.max);
        self.text = format_value(value);
    }

    fn snap(&self, raw: f64) -> f64 {
        let steps = ((raw - self.min) / self.step).round();
        let value = (self.min + steps * self.step).clamp(self.min, self.max);
        let scale = 10f64.powi(step_decimals(self.step));
        (value * scale).round() / scale
    }

    /// Draw the label, text box and range control on one row.
    /// Returns the new value when either control changed it.
    pub fn show(&mut self, ui: &mut egui::Ui) -> Option<f64> {
        let mut changed = None;
        ui.horizontal(|ui| {
            ui.label(self.label);

            let text = ui.add(egui::TextEdit::singleline(&mut self.text).desired_width(50.0));
            if text.lost_focus() {
                changed = self.commit_text();
            }

            let mut position = self.position;
            let range = ui.add(
                egui::Slider::new(&mut position, self.min..=self.max)
                    .step_by(self.step)
                    .show_value(false),
            );
            if range.changed() {
                changed = Some(self.drag_to(position));
            }
        });
        changed
    }
}

fn step_decimals(step: f64) -> i32 {
    let text = format_value(step);
    text.split_once('.').map_or(0, |(_, frac)| frac.len() as i32)
}

/// Shortest decimal form, without a trailing `.0` and without `-0`.
pub fn format_value(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value}")
}

/// Parse the longest numeric prefix, like JavaScript `parseFloat`.
///
/// Leading whitespace is skipped and trailing garbage ignored; `None` when no
/// digits are found or the result is not finite.
pub fn parse_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end.min(bytes.len())..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    text[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
