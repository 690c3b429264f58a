mod combat;
mod study;

pub use combat::{combat_charts, CombatChartOptions, HEATMAP_MAX_RATIO};
pub use study::{
    datashift_change, datashift_chart, latency_charts, latency_ylim, memory_chart,
    range_chart, range_series, scalability_chart, scalability_series, LatencyCategory,
    Shade, StudyConfig, DEFAULT_STUDY_DATASETS, DEFAULT_THREADS, DEFAULT_WORKLOADS,
    MEMORY_INDEXES, MT_INDEXES, RANGE_INDEXES, ST_INDEXES,
};

use crate::display::Marker;
use anyhow::{Context, Result};
use plotters::style::RGBColor;
use std::path::Path;

// Font sizes
// Sized for SVGs viewed scaled down
const TITLE_FONT_SIZE: u32 = 44;
const AXIS_LABEL_FONT_SIZE: u32 = 26;
const TICK_LABEL_FONT_SIZE: u32 = 20;
const LEGEND_FONT_SIZE: u32 = 20;
const DATA_LABEL_FONT_SIZE: u32 = 16;
const PANEL_TITLE_FONT_SIZE: u32 = 24;

const DEFAULT_MARGIN_BOTTOM: u32 = 55;
const DEFAULT_X_LABEL_AREA_SIZE: u32 = 60;

const MARKER_SIZE: i32 = 8;

const GRAY: RGBColor = RGBColor(128, 128, 128);

/// Diverging color maps for signed ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMap {
    /// Blue to light gray to red
    CoolWarm,
    /// Dark blue to white to dark red
    RdBuR,
}

impl ColorMap {
    fn stops(&self) -> &'static [RGBColor] {
        match self {
            ColorMap::CoolWarm => &[
                RGBColor(59, 76, 192),
                RGBColor(141, 176, 254),
                RGBColor(221, 221, 221),
                RGBColor(244, 154, 123),
                RGBColor(180, 4, 38),
            ],
            ColorMap::RdBuR => &[
                RGBColor(5, 48, 97),
                RGBColor(67, 147, 195),
                RGBColor(247, 247, 247),
                RGBColor(214, 96, 77),
                RGBColor(103, 0, 31),
            ],
        }
    }

    /// Color at `t` in `[0, 1]`; values outside are clamped
    pub fn at(&self, t: f64) -> RGBColor {
        let stops = self.stops();
        let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
        let scaled = t * (stops.len() - 1) as f64;
        let lo = (scaled.floor() as usize).min(stops.len() - 2);
        let frac = scaled - lo as f64;
        let (a, b) = (stops[lo], stops[lo + 1]);
        let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
        RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
    }

    /// Color for a signed value on the symmetric scale `[-limit, limit]`
    pub fn diverging(&self, value: f64, limit: f64) -> RGBColor {
        let limit = if limit > 0.0 { limit } else { 1.0 };
        self.at((value / limit + 1.0) / 2.0)
    }
}

/// Compact hardness label: `950`, `12k`, `1.2M`
pub fn format_hardness(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 1e4 {
        format!("{:.0}k", value / 1e3)
    } else if abs >= 1e3 {
        format!("{:.1}k", value / 1e3)
    } else {
        format!("{:.0}", value)
    }
}

/// Short name of a workload mix, keyed by its insert ratio
pub fn workload_label(insert_ratio: f64) -> String {
    const LABELS: &[(f64, &str)] = &[
        (0.0, "RO"),
        (0.2, "RH"),
        (0.5, "BAL"),
        (0.8, "WH"),
        (1.0, "WO"),
    ];
    LABELS
        .iter()
        .find(|(r, _)| (r - insert_ratio).abs() < 1e-9)
        .map(|(_, l)| l.to_string())
        .unwrap_or_else(|| format!("{:.0}% W", insert_ratio * 100.0))
}

/// Marker outline plus the same points closed into a path for the border
fn marker_shape(marker: Marker, size: i32) -> (Vec<(i32, i32)>, Vec<(i32, i32)>) {
    let outline = marker.outline(size);
    let mut closed = outline.clone();
    if let Some(first) = outline.first() {
        closed.push(*first);
    }
    (outline, closed)
}

fn ensure_dir(output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir).context("Failed to create output directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_map_endpoints() {
        assert_eq!(ColorMap::CoolWarm.at(0.0), RGBColor(59, 76, 192));
        assert_eq!(ColorMap::CoolWarm.at(1.0), RGBColor(180, 4, 38));
        assert_eq!(ColorMap::RdBuR.at(0.5), RGBColor(247, 247, 247));
        // Clamped
        assert_eq!(ColorMap::RdBuR.at(-3.0), ColorMap::RdBuR.at(0.0));
        assert_eq!(ColorMap::RdBuR.at(f64::NAN), ColorMap::RdBuR.at(0.5));
    }

    #[test]
    fn test_diverging_is_symmetric_and_clipped() {
        let map = ColorMap::CoolWarm;
        assert_eq!(map.diverging(0.0, 0.75), map.at(0.5));
        assert_eq!(map.diverging(0.75, 0.75), map.at(1.0));
        assert_eq!(map.diverging(5.0, 0.75), map.at(1.0));
        assert_eq!(map.diverging(-5.0, 0.75), map.at(0.0));
        // Degenerate limit falls back to a unit scale
        assert_eq!(map.diverging(1.0, 0.0), map.at(1.0));
    }

    #[test]
    fn test_format_hardness() {
        assert_eq!(format_hardness(950.0), "950");
        assert_eq!(format_hardness(1500.0), "1.5k");
        assert_eq!(format_hardness(120_000.0), "120k");
        assert_eq!(format_hardness(2_400_000.0), "2.4M");
    }

    #[test]
    fn test_workload_label() {
        assert_eq!(workload_label(0.0), "RO");
        assert_eq!(workload_label(0.5), "BAL");
        assert_eq!(workload_label(1.0), "WO");
        assert_eq!(workload_label(0.3), "30% W");
    }

    #[test]
    fn test_marker_shape_is_closed() {
        let (outline, closed) = marker_shape(Marker::Diamond, 5);
        assert_eq!(closed.len(), outline.len() + 1);
        assert_eq!(closed.first(), closed.last());
    }
}
