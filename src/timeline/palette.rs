//! Theme palette and service color classification.
//!
//! The renderer never reads ambient style state: it is handed a [`Palette`]
//! and a [`ColorTable`] at construction.

use crate::core::{ServiceClass, SpanStatus};
use ahash::AHashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A 24-bit color, written as `#rrggbb` in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    const fn hex(value: u32) -> Self {
        Self::new((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }

    /// Linear blend: `t = 0` is `self`, `t = 1` is `other`.
    pub fn mix(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let blend = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
        Rgb::new(blend(self.r, other.r), blend(self.g, other.g), blend(self.b, other.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected #rrggbb, got {s:?}"));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|e| format!("invalid color {s:?}: {e}"))
        };
        Ok(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Colors the renderer draws chrome with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub foreground: Rgb,
    pub muted: Rgb,
    pub background: Rgb,
    pub border: Rgb,
    pub accent: Rgb,
}

impl Palette {
    /// Row background for the selected span
    pub fn selection(&self) -> Rgb {
        self.accent.mix(self.background, 0.7)
    }

    /// Row background under the pointer; kept fainter than the selection
    pub fn hover(&self) -> Rgb {
        self.muted.mix(self.background, 0.85)
    }
}

/// Built-in palettes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                foreground: Rgb::hex(0xe5e7eb),
                muted: Rgb::hex(0x9ca3af),
                background: Rgb::hex(0x111827),
                border: Rgb::hex(0x374151),
                accent: Rgb::hex(0x60a5fa),
            },
            Theme::Light => Palette {
                foreground: Rgb::hex(0x111827),
                muted: Rgb::hex(0x6b7280),
                background: Rgb::hex(0xffffff),
                border: Rgb::hex(0xe5e7eb),
                accent: Rgb::hex(0x2563eb),
            },
        }
    }
}

/// Color used when neither the qualified nor the plain key is known.
pub const FALLBACK_COLOR: Rgb = Rgb::hex(0x9ca3af);

static DEFAULT_COLORS: Lazy<AHashMap<String, Rgb>> = Lazy::new(|| {
    [
        ("Root", 0x6366f1),
        ("Root-Block", 0xef4444),
        ("Root-Ask", 0xf59e0b),
        ("Enrich", 0x06b6d4),
        ("Global", 0x8b5cf6),
        ("Global-Block", 0xdc2626),
        ("Global-Ask", 0xd97706),
        ("Project", 0x3b82f6),
        ("Project-Block", 0xdc2626),
        ("Project-Ask", 0xd97706),
        ("Catalog", 0x14b8a6),
        ("Catalog-Block", 0xdc2626),
        ("Catalog-Ask", 0xd97706),
        ("Phase", 0x64748b),
        ("Phase-Block", 0xdc2626),
        ("Phase-Ask", 0xd97706),
        ("Signals", 0xeab308),
        ("Signal", 0xfacc15),
        ("Signal-Block", 0xef4444),
        ("Evaluation", 0x22c55e),
        ("Evaluation-Block", 0xef4444),
        ("Evaluation-Ask", 0xf97316),
    ]
    .into_iter()
    .map(|(key, hex)| (key.to_string(), Rgb::hex(hex)))
    .collect()
});

/// Status qualifier appended to a service name for color lookup.
pub fn status_qualifier(status: SpanStatus) -> Option<&'static str> {
    match status {
        SpanStatus::Error => Some("-Block"),
        SpanStatus::Warning => Some("-Ask"),
        SpanStatus::Ok => None,
    }
}

/// Lookup table from `serviceName[-qualifier]` to a color.
#[derive(Debug, Clone)]
pub struct ColorTable {
    colors: AHashMap<String, Rgb>,
}

impl Default for ColorTable {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.clone(),
        }
    }
}

impl ColorTable {
    /// Default table with `overrides` layered on top
    pub fn with_overrides(overrides: &HashMap<String, Rgb>) -> Self {
        let mut table = Self::default();
        table
            .colors
            .extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
        table
    }

    /// Qualified key first, then the plain service name, then gray.
    pub fn color_for(&self, service: ServiceClass, status: SpanStatus) -> Rgb {
        let plain = service.as_str();
        if let Some(qualifier) = status_qualifier(status) {
            let key = format!("{plain}{qualifier}");
            if let Some(color) = self.colors.get(&key) {
                return *color;
            }
        }
        self.colors.get(plain).copied().unwrap_or(FALLBACK_COLOR)
    }
}
