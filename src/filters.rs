//! Cosmetic adjustments applied on top of a generated image.
//!
//! Values are whole percentages, the same units a CSS `filter` chain uses.
//! The chain always runs brightness, contrast, saturate, sepia, grayscale.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Brightness,
    Contrast,
    Saturation,
    Sepia,
    Grayscale,
}

impl FilterKind {
    pub const ALL: [FilterKind; 5] =
        [FilterKind::Brightness, FilterKind::Contrast, FilterKind::Saturation, FilterKind::Sepia, FilterKind::Grayscale];

    pub fn neutral(&self) -> u16 {
        match self {
            FilterKind::Brightness | FilterKind::Contrast | FilterKind::Saturation => 100,
            FilterKind::Sepia | FilterKind::Grayscale => 0,
        }
    }

    pub fn max(&self) -> u16 {
        match self {
            FilterKind::Brightness | FilterKind::Contrast | FilterKind::Saturation => 200,
            FilterKind::Sepia | FilterKind::Grayscale => 100,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterKind::Brightness => "Brightness",
            FilterKind::Contrast => "Contrast",
            FilterKind::Saturation => "Saturation",
            FilterKind::Sepia => "Sepia",
            FilterKind::Grayscale => "Grayscale",
        }
    }

    fn css_name(&self) -> &'static str {
        match self {
            FilterKind::Saturation => "saturate",
            FilterKind::Brightness => "brightness",
            FilterKind::Contrast => "contrast",
            FilterKind::Sepia => "sepia",
            FilterKind::Grayscale => "grayscale",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Grayscale,
    Sepia,
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grayscale" | "greyscale" | "bw" => Ok(Preset::Grayscale),
            "sepia" => Ok(Preset::Sepia),
            other => Err(format!("unknown preset '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub brightness: u16,
    pub contrast: u16,
    pub saturation: u16,
    pub sepia: u16,
    pub grayscale: u16,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::neutral()
    }
}

impl FilterState {
    pub const fn neutral() -> Self {
        Self { brightness: 100, contrast: 100, saturation: 100, sepia: 0, grayscale: 0 }
    }

    pub fn get(&self, kind: FilterKind) -> u16 {
        match kind {
            FilterKind::Brightness => self.brightness,
            FilterKind::Contrast => self.contrast,
            FilterKind::Saturation => self.saturation,
            FilterKind::Sepia => self.sepia,
            FilterKind::Grayscale => self.grayscale,
        }
    }

    /// Slider input. Out-of-range values are clamped.
    pub fn set(&mut self, kind: FilterKind, value: u16) {
        let value = value.min(kind.max());
        match kind {
            FilterKind::Brightness => self.brightness = value,
            FilterKind::Contrast => self.contrast = value,
            FilterKind::Saturation => self.saturation = value,
            FilterKind::Sepia => self.sepia = value,
            FilterKind::Grayscale => self.grayscale = value,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::neutral();
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::neutral()
    }

    /// Presets start from neutral, so earlier slider tuning is discarded.
    pub fn apply_preset(&mut self, preset: Preset) {
        match preset {
            Preset::Grayscale => self.apply_grayscale_preset(),
            Preset::Sepia => self.apply_sepia_preset(),
        }
    }

    pub fn apply_grayscale_preset(&mut self) {
        self.reset();
        self.saturation = 0;
        self.grayscale = 100;
    }

    pub fn apply_sepia_preset(&mut self) {
        self.reset();
        self.sepia = 100;
    }

    /// CSS `filter` value for the current chain.
    pub fn css(&self) -> String {
        FilterKind::ALL
            .iter()
            .map(|k| format!("{}({}%)", k.css_name(), self.get(*k)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the chain over every pixel. Alpha is left alone.
    pub fn apply(&self, image: &mut RgbaImage) {
        if self.is_neutral() {
            return;
        }
        let brightness = self.brightness as f32 / 100.0;
        let contrast = self.contrast as f32 / 100.0;
        let saturate = saturate_matrix(self.saturation as f32 / 100.0);
        let sepia = sepia_matrix(self.sepia as f32 / 100.0);
        let grayscale = grayscale_matrix(self.grayscale as f32 / 100.0);

        for pixel in image.pixels_mut() {
            let mut rgb = [pixel[0] as f32 / 255.0, pixel[1] as f32 / 255.0, pixel[2] as f32 / 255.0];
            for c in rgb.iter_mut() {
                *c = (*c * brightness).clamp(0.0, 1.0);
            }
            for c in rgb.iter_mut() {
                *c = ((*c - 0.5) * contrast + 0.5).clamp(0.0, 1.0);
            }
            rgb = mul(&saturate, rgb);
            rgb = mul(&sepia, rgb);
            rgb = mul(&grayscale, rgb);
            for (i, c) in rgb.iter().enumerate() {
                pixel[i] = (c * 255.0).round() as u8;
            }
        }
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css())
    }
}

type Matrix = [[f32; 3]; 3];

fn mul(m: &Matrix, rgb: [f32; 3]) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (row, o) in m.iter().zip(out.iter_mut()) {
        *o = (row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]).clamp(0.0, 1.0);
    }
    out
}

fn saturate_matrix(s: f32) -> Matrix {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn sepia_matrix(amount: f32) -> Matrix {
    let a = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.393 + 0.607 * a, 0.769 - 0.769 * a, 0.189 - 0.189 * a],
        [0.349 - 0.349 * a, 0.686 + 0.314 * a, 0.168 - 0.168 * a],
        [0.272 - 0.272 * a, 0.534 - 0.534 * a, 0.131 + 0.869 * a],
    ]
}

fn grayscale_matrix(amount: f32) -> Matrix {
    let a = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.2126 + 0.7874 * a, 0.7152 - 0.7152 * a, 0.0722 - 0.0722 * a],
        [0.2126 - 0.2126 * a, 0.7152 + 0.2848 * a, 0.0722 - 0.0722 * a],
        [0.2126 - 0.2126 * a, 0.7152 - 0.7152 * a, 0.0722 + 0.9278 * a],
    ]
}
