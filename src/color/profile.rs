//! Line color profiles
//!
//! Each supported graph line color is a plain data record: an HSV acceptance
//! window plus the correction parameters tuned for that color family. Stroke
//! thickness, anti-aliasing and background contrast differ between colors, so
//! every profile carries its own smoothing radius, peak offset and saturation
//! hysteresis instead of sharing one global tolerance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::conversion::HsvPixel;
use crate::{AnalysisError, Result};

/// Hue interval in degrees; wraps through 0 when `min > max`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HueRange {
    pub min: f32,
    pub max: f32,
}

impl HueRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, hue: f32) -> bool {
        if self.min <= self.max {
            hue >= self.min && hue <= self.max
        } else {
            hue >= self.min || hue <= self.max
        }
    }
}

/// Closed interval on a unit channel (saturation or value)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitRange {
    pub min: f32,
    pub max: f32,
}

impl UnitRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, v: f32) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Saturation hysteresis thresholds
///
/// In-range pixels at or above `low` are stroke candidates; a vertical run of
/// candidates is kept only if one of its pixels reaches `high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeSensitivity {
    pub low: f32,
    pub high: f32,
}

/// Column scan direction
///
/// Lines drawn over the grid are found first from the top; lines drawn under
/// a grid of similar hue are safer to pick up from the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanDirection {
    #[default]
    TopDown,
    BottomUp,
}

/// Detection and correction parameters for one line color family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorProfile {
    pub name: String,
    pub hue: HueRange,
    pub saturation: UnitRange,
    pub value: UnitRange,
    /// Pixels from the first matching pixel to the stroke center
    pub peak_offset: f64,
    pub edge: EdgeSensitivity,
    /// Radius of the binary close/open applied to the stroke mask (0 = none)
    pub kernel_radius: u8,
    /// Fewer matching pixels than this in the whole image means no line
    pub min_pixel_count: usize,
    #[serde(default)]
    pub scan: ScanDirection,
}

impl ColorProfile {
    /// Check the HSV window, without the hysteresis floor
    pub fn in_range(&self, px: HsvPixel) -> bool {
        self.hue.contains(px.hue)
            && self.saturation.contains(px.saturation)
            && self.value.contains(px.value)
    }

    /// In range and saturated enough to be a stroke candidate
    pub fn is_candidate(&self, px: HsvPixel) -> bool {
        self.in_range(px) && px.saturation >= self.edge.low
    }

    /// Candidate that can anchor a run
    pub fn is_strong(&self, px: HsvPixel) -> bool {
        self.in_range(px) && px.saturation >= self.edge.high
    }

    /// Reject profiles whose ranges cannot match anything sensible
    pub fn validate(&self) -> Result<()> {
        let unit = |r: &UnitRange| (0.0..=1.0).contains(&r.min) && (0.0..=1.0).contains(&r.max) && r.min <= r.max;
        let hue_ok = (0.0..=360.0).contains(&self.hue.min) && (0.0..=360.0).contains(&self.hue.max);

        if !hue_ok {
            return Err(AnalysisError::invalid_parameter(
                format!("profiles.{}.hue", self.name),
                format!("{}..{}", self.hue.min, self.hue.max),
            ));
        }
        if !unit(&self.saturation) || !unit(&self.value) {
            return Err(AnalysisError::invalid_parameter(
                format!("profiles.{}.saturation/value", self.name),
                "range outside [0, 1]",
            ));
        }
        if self.edge.low > self.edge.high || !(0.0..=1.0).contains(&self.edge.high) {
            return Err(AnalysisError::invalid_parameter(
                format!("profiles.{}.edge", self.name),
                format!("{}..{}", self.edge.low, self.edge.high),
            ));
        }
        if !self.peak_offset.is_finite() || self.peak_offset < 0.0 {
            return Err(AnalysisError::invalid_parameter(
                format!("profiles.{}.peak_offset", self.name),
                self.peak_offset,
            ));
        }
        Ok(())
    }
}

/// Keyed table of color profiles, iterated in name order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileTable {
    profiles: BTreeMap<String, ColorProfile>,
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileTable {
    pub fn empty() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }

    /// Profiles for the line colors seen on supported displays
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for profile in builtin_profiles() {
            table.insert(profile);
        }
        table
    }

    /// Insert or replace a profile under its own name
    pub fn insert(&mut self, profile: ColorProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn get(&self, name: &str) -> Result<&ColorProfile> {
        self.profiles
            .get(name)
            .ok_or_else(|| AnalysisError::UnknownProfile { name: name.to_string() })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColorProfile> {
        self.profiles.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Resolve candidate names in order; an empty list selects every profile
    pub fn select(&self, names: &[String]) -> Result<Vec<&ColorProfile>> {
        if names.is_empty() {
            return Ok(self.iter().collect());
        }
        names.iter().map(|name| self.get(name)).collect()
    }
}

fn profile(
    name: &str,
    hue: (f32, f32),
    sat_min: f32,
    val_min: f32,
    peak_offset: f64,
    edge: (f32, f32),
    kernel_radius: u8,
) -> ColorProfile {
    ColorProfile {
        name: name.to_string(),
        hue: HueRange::new(hue.0, hue.1),
        saturation: UnitRange::new(sat_min, 1.0),
        value: UnitRange::new(val_min, 1.0),
        peak_offset,
        edge: EdgeSensitivity {
            low: edge.0,
            high: edge.1,
        },
        kernel_radius,
        min_pixel_count: 10,
        scan: ScanDirection::TopDown,
    }
}

fn builtin_profiles() -> Vec<ColorProfile> {
    vec![
        // Thick anti-aliased stroke, easy to separate from the grid
        profile("pink", (280.0, 340.0), 0.12, 0.39, 1.0, (0.15, 0.35), 1),
        // Low contrast against the dark background, wider saturation floor
        profile("purple", (240.0, 290.0), 0.12, 0.31, 1.5, (0.12, 0.30), 1),
        // Thin stroke: smoothing would erase it
        profile("blue", (180.0, 240.0), 0.12, 0.39, 1.0, (0.15, 0.40), 0),
        profile("cyan", (160.0, 200.0), 0.12, 0.39, 1.0, (0.15, 0.40), 0),
        profile("green", (80.0, 160.0), 0.39, 0.39, 1.0, (0.39, 0.50), 1),
        profile("yellow", (40.0, 80.0), 0.39, 0.39, 1.5, (0.39, 0.50), 1),
        profile("orange", (20.0, 50.0), 0.39, 0.39, 2.0, (0.39, 0.55), 2),
        profile("red", (340.0, 20.0), 0.39, 0.39, 1.0, (0.39, 0.55), 1),
    ]
}
