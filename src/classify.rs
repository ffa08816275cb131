//! Classifier / color mapper
//!
//! Maps a resolved view plus the active mode to a parcel style. Categorical
//! modes only color parcels backed by a property record; value modes bucket
//! the total value into four half-open ranges.

use serde::{Deserialize, Serialize};

use crate::resolver::{DataSource, ResolvedAttributeView};
use crate::store::UNKNOWN;

/// Bucket lower bounds: Medium, High, Very High
pub const VALUE_BREAKPOINTS: [f64; 3] = [200_000.0, 400_000.0, 800_000.0];

const STROKE_COLOR: &str = "#333333";
const STROKE_WEIGHT: f32 = 1.0;
const FILL_OPACITY: f32 = 0.8;
const TRANSPARENT: &str = "transparent";

/// Selectable attribute modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Quality,
    View,
    Value,
    ParcelValue,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Quality, Mode::View, Mode::Value, Mode::ParcelValue];

    /// Identifier used by the UI control
    pub fn id(&self) -> &'static str {
        match self {
            Mode::Quality => "quality",
            Mode::View => "view",
            Mode::Value => "value",
            Mode::ParcelValue => "parcel_value",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Quality => "Exterior Quality",
            Mode::View => "View Description",
            Mode::Value => "Total Actual Value",
            Mode::ParcelValue => "Parcel Assessed Value",
        }
    }

    /// Parse a UI identifier; unknown identifiers yield `None`
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id.trim())
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, Mode::Quality | Mode::View)
    }
}

/// Value ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueBucket {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ValueBucket {
    pub const ALL: [ValueBucket; 4] =
        [ValueBucket::Low, ValueBucket::Medium, ValueBucket::High, ValueBucket::VeryHigh];

    /// Half-open: a breakpoint belongs to the upper bucket
    pub fn of(value: f64) -> Self {
        if value < VALUE_BREAKPOINTS[0] {
            ValueBucket::Low
        } else if value < VALUE_BREAKPOINTS[1] {
            ValueBucket::Medium
        } else if value < VALUE_BREAKPOINTS[2] {
            ValueBucket::High
        } else {
            ValueBucket::VeryHigh
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            ValueBucket::Low => "Low",
            ValueBucket::Medium => "Medium",
            ValueBucket::High => "High",
            ValueBucket::VeryHigh => "Very High",
        }
    }

    pub fn range_label(&self) -> &'static str {
        match self {
            ValueBucket::Low => "Under $200,000",
            ValueBucket::Medium => "$200,000 - $399,999",
            ValueBucket::High => "$400,000 - $799,999",
            ValueBucket::VeryHigh => "$800,000 and above",
        }
    }
}

/// One key -> color entry of a categorical scheme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeEntry {
    pub key: String,
    pub color: String,
}

fn entries(pairs: &[(&str, &str)]) -> Vec<SchemeEntry> {
    pairs
        .iter()
        .map(|(key, color)| SchemeEntry { key: key.to_string(), color: color.to_string() })
        .collect()
}

/// Colors for the four value buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueColors {
    pub low: String,
    pub medium: String,
    pub high: String,
    pub very_high: String,
}

impl Default for ValueColors {
    fn default() -> Self {
        Self {
            low: "#ffffb2".to_string(),
            medium: "#fecc5c".to_string(),
            high: "#fd8d3c".to_string(),
            very_high: "#e31a1c".to_string(),
        }
    }
}

impl ValueColors {
    pub fn color(&self, bucket: ValueBucket) -> &str {
        match bucket {
            ValueBucket::Low => &self.low,
            ValueBucket::Medium => &self.medium,
            ValueBucket::High => &self.high,
            ValueBucket::VeryHigh => &self.very_high,
        }
    }
}

/// Color schemes for every mode; each can be overridden from config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSchemes {
    pub quality: Vec<SchemeEntry>,
    pub view: Vec<SchemeEntry>,
    pub value: ValueColors,
}

impl Default for ColorSchemes {
    fn default() -> Self {
        Self {
            quality: entries(&[
                ("Excellent", "#1a9850"),
                ("Very Good", "#66bd63"),
                ("Good", "#a6d96a"),
                ("Average", "#fee08b"),
                ("Fair", "#fdae61"),
                ("Poor", "#f46d43"),
                ("Very Poor", "#d73027"),
            ]),
            view: entries(&[
                ("EXCELLENT", "#2166ac"),
                ("VERY GOOD", "#4393c3"),
                ("GOOD", "#92c5de"),
                ("TYPICAL OR AVERAGE", "#d1e5f0"),
                ("FAIR", "#f4a582"),
                ("POOR", "#d6604d"),
            ]),
            value: ValueColors::default(),
        }
    }
}

impl ColorSchemes {
    fn categorical(&self, mode: Mode) -> &[SchemeEntry] {
        match mode {
            Mode::Quality => self.quality.as_slice(),
            Mode::View => self.view.as_slice(),
            Mode::Value | Mode::ParcelValue => &[],
        }
    }

    /// Color for a categorical key, if the mode's scheme has it
    pub fn color_for(&self, mode: Mode, key: &str) -> Option<&str> {
        self.categorical(mode)
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.color.as_str())
    }
}

/// Parcel style handed to the render surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub stroke_color: String,
    pub stroke_weight: f32,
    pub fill_color: String,
    pub fill_opacity: f32,
}

impl Style {
    /// Fully transparent "no render" style
    pub fn hidden() -> Self {
        Self {
            stroke_color: TRANSPARENT.to_string(),
            stroke_weight: 0.0,
            fill_color: TRANSPARENT.to_string(),
            fill_opacity: 0.0,
        }
    }

    pub fn filled(color: &str) -> Self {
        Self {
            stroke_color: STROKE_COLOR.to_string(),
            stroke_weight: STROKE_WEIGHT,
            fill_color: color.to_string(),
            fill_opacity: FILL_OPACITY,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.fill_opacity == 0.0 && self.stroke_weight == 0.0
    }
}

/// Legend row for the active mode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub category: String,
    pub label: String,
    pub color: String,
}

/// Holds the active mode and the color schemes
#[derive(Debug, Clone)]
pub struct Classifier {
    active: Option<Mode>,
    schemes: ColorSchemes,
}

impl Classifier {
    pub fn new(schemes: ColorSchemes, initial: Mode) -> Self {
        Self { active: Some(initial), schemes }
    }

    pub fn active(&self) -> Option<Mode> {
        self.active
    }

    /// Change the active mode from a UI identifier
    ///
    /// An unrecognized identifier is kept as "no mode": every parcel renders
    /// transparent until a valid mode is selected.
    pub fn set_mode(&mut self, id: &str) -> Option<Mode> {
        self.active = Mode::from_id(id);
        match self.active {
            Some(mode) => tracing::info!("Active mode: {}", mode.id()),
            None => tracing::warn!("Unrecognized mode '{}', rendering nothing", id),
        }
        self.active
    }

    /// Category key and color for a view under the active mode
    pub fn categorize(&self, view: &ResolvedAttributeView) -> Option<(String, String)> {
        let mode = self.active?;

        if mode.is_categorical() {
            // Only detailed property data gets colored
            if view.source != DataSource::Property {
                return None;
            }
            let key = match mode {
                Mode::Quality => &view.quality_category,
                _ => &view.view_category,
            };
            if key.is_empty() || key == UNKNOWN {
                return None;
            }
            let color = self.schemes.color_for(mode, key)?;
            return Some((key.clone(), color.to_string()));
        }

        if view.source == DataSource::None || view.total_value == 0.0 {
            return None;
        }
        let bucket = ValueBucket::of(view.total_value);
        Some((bucket.key().to_string(), self.schemes.value.color(bucket).to_string()))
    }

    /// Style for a view under the active mode
    pub fn style(&self, view: &ResolvedAttributeView) -> Style {
        match self.categorize(view) {
            Some((_, color)) => Style::filled(&color),
            None => Style::hidden(),
        }
    }

    /// Ordered legend for the active mode; empty when no mode is active
    pub fn legend(&self) -> Vec<LegendEntry> {
        let Some(mode) = self.active else {
            return Vec::new();
        };

        if mode.is_categorical() {
            return self
                .schemes
                .categorical(mode)
                .iter()
                .map(|e| LegendEntry {
                    category: e.key.clone(),
                    label: e.key.clone(),
                    color: e.color.clone(),
                })
                .collect();
        }

        ValueBucket::ALL
            .iter()
            .map(|b| LegendEntry {
                category: b.key().to_string(),
                label: b.range_label().to_string(),
                color: self.schemes.value.color(*b).to_string(),
            })
            .collect()
    }
}
