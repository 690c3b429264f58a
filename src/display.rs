use crate::error::{Error, Result};
use plotters::style::RGBColor;
use std::collections::HashMap;

/// Label used for cells where neither family wins by a meaningful margin
pub const TIE_LABEL: &str = "T";

const INDEX_DISPLAY: &[(&str, &str)] = &[
    ("alex", "ALEX"),
    ("pgm", "PGM-Index"),
    ("xindex", "XIndex"),
    ("lipp", "LIPP"),
    ("alexol", "ALEX+"),
    ("hot", "HOT"),
    ("hotrowex", "HOT-ROWEX"),
    ("btree", "B+tree"),
    ("artolc", "ART-OLC"),
    ("artunsync", "ART"),
    ("btreeolc", "B+treeOLC"),
    ("artrowex", "ART-ROWEX"),
    ("wormhole_u64", "Wormhole"),
    ("masstree", "Masstree"),
    ("lippol", "LIPP+"),
    ("finedex", "FINEdex"),
    ("tied", "Tied"),
];

const INDEX_ABBREVIATION: &[(&str, &str)] = &[
    ("alex", "A"),
    ("pgm", "P"),
    ("xindex", "X"),
    ("hot", "h"),
    ("hotrowex", "h+"),
    ("wormhole_u64", "w"),
    ("btree", "b"),
    ("artolc", "r+"),
    ("art", "a"),
    ("btreeolc", "b+"),
    ("alexol", "A+"),
    ("lipp", "L"),
    ("lippolc", "L++"),
    ("lippol", "L+++"),
    ("lipppt", "L+"),
    ("artunsync", "r"),
    ("masstree", "m"),
    ("tied", TIE_LABEL),
    ("finedex", "F"),
];

const DATASET_ABBREVIATION: &[(&str, &str)] = &[
    ("biology_200M_uint64", "genome"),
    ("books_200M_uint64", "books"),
    ("covid_tweets_200M_uint64", "covid"),
    ("eth_gas_27M_uint64", "eth"),
    ("fb_200M_uint64", "fb"),
    ("gnomad_200M_uint64", "gnomad"),
    ("libraries_io_repository_dependencies_200M_uint64", "libio"),
    ("osm_cellids_200M_uint64", "osm"),
    ("planet_features_osm_id_200M_uint64", "planet"),
    ("osm_history_node_200M_uint64", "history"),
    ("stovf_vote_id_200M_uint64", "stack"),
    ("wise_all_sky_data_htm_200M_uint64", "wise"),
    ("covid_osm_sd_200M_uint64", "covid->osm"),
    ("covid_biology_sd_200M_uint64", "covid->genome"),
    ("osm_covid_sd_200M_uint64", "osm->covid"),
    ("biology_covid_sd_200M_uint64", "genome->covid"),
    ("eth_cumgas_200M_uint64", "eth_gas"),
    ("wiki_revid_200M_uint64", "wiki_rev"),
    ("planetways_200M_uint64", "planetways"),
    ("wiki_ts_200M_uint64", "wiki_ts"),
];

/// Marker shapes used for scatter points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Circle,
    TriangleDown,
    Diamond,
    Plus,
    Cross,
    Square,
    Star,
    Tri,
    Bar,
}

impl Marker {
    /// Outline of the marker in pixel offsets around the data point
    pub fn outline(&self, size: i32) -> Vec<(i32, i32)> {
        let s = size;
        let t = (size / 3).max(1);
        match self {
            Marker::Circle => (0..16)
                .map(|k| {
                    let a = k as f64 * std::f64::consts::TAU / 16.0;
                    ((a.cos() * s as f64).round() as i32, (a.sin() * s as f64).round() as i32)
                })
                .collect(),
            Marker::TriangleDown => vec![(-s, -s), (s, -s), (0, s)],
            Marker::Diamond => vec![(0, -s), (s, 0), (0, s), (-s, 0)],
            Marker::Square => vec![(-s, -s), (s, -s), (s, s), (-s, s)],
            Marker::Plus => vec![
                (-t, -s),
                (t, -s),
                (t, -t),
                (s, -t),
                (s, t),
                (t, t),
                (t, s),
                (-t, s),
                (-t, t),
                (-s, t),
                (-s, -t),
                (-t, -t),
            ],
            Marker::Cross => vec![
                (-s, -s + t),
                (-s + t, -s),
                (0, -t),
                (s - t, -s),
                (s, -s + t),
                (t, 0),
                (s, s - t),
                (s - t, s),
                (0, t),
                (-s + t, s),
                (-s, s - t),
                (-t, 0),
            ],
            Marker::Star => (0..10)
                .map(|k| {
                    let r = if k % 2 == 0 { s as f64 } else { s as f64 * 0.45 };
                    let a = k as f64 * std::f64::consts::PI / 5.0 - std::f64::consts::FRAC_PI_2;
                    ((a.cos() * r).round() as i32, (a.sin() * r).round() as i32)
                })
                .collect(),
            Marker::Tri => vec![(-t, -s), (t, -s), (t, 0), (s, s), (0, s), (-s, s), (-t, 0)],
            Marker::Bar => vec![(-t, -s), (t, -s), (t, s), (-t, s)],
        }
    }
}

/// How one index is drawn in line, bar and scatter charts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexStyle {
    pub marker: Marker,
    pub color: RGBColor,
    /// Learned indexes draw solid lines, traditional ones dotted
    pub solid: bool,
}

// Tableau palette
const TAB_BLUE: RGBColor = RGBColor(31, 119, 180);
const TAB_ORANGE: RGBColor = RGBColor(255, 127, 14);
const TAB_GREEN: RGBColor = RGBColor(44, 160, 44);
const TAB_RED: RGBColor = RGBColor(214, 39, 40);
const TAB_PURPLE: RGBColor = RGBColor(148, 103, 189);
const TAB_BROWN: RGBColor = RGBColor(140, 86, 75);
const TAB_PINK: RGBColor = RGBColor(227, 119, 194);
const TAB_GRAY: RGBColor = RGBColor(127, 127, 127);
const TAB_OLIVE: RGBColor = RGBColor(188, 189, 34);
const TAB_CYAN: RGBColor = RGBColor(23, 190, 207);
const OLIVE: RGBColor = RGBColor(128, 128, 0);
const BLACK: RGBColor = RGBColor(0, 0, 0);

const CYCLE_COLORS: &[RGBColor] = &[
    TAB_BLUE, TAB_ORANGE, TAB_GREEN, TAB_RED, TAB_BROWN, TAB_PURPLE, TAB_PINK, TAB_GRAY,
    TAB_OLIVE, TAB_CYAN, BLACK,
];

const CYCLE_MARKERS: &[Marker] = &[
    Marker::Circle,
    Marker::Circle,
    Marker::TriangleDown,
    Marker::TriangleDown,
    Marker::Plus,
    Marker::Square,
    Marker::Square,
    Marker::Cross,
    Marker::Cross,
    Marker::Tri,
    Marker::Tri,
    Marker::Star,
];

const STYLE_OVERRIDES: &[(&str, Marker, RGBColor)] = &[
    ("A+", Marker::TriangleDown, TAB_BLUE),
    ("A", Marker::TriangleDown, TAB_BLUE),
    ("L+", Marker::Circle, TAB_ORANGE),
    ("L++", Marker::Circle, TAB_ORANGE),
    ("L+++", Marker::Circle, TAB_ORANGE),
    ("L", Marker::Circle, TAB_ORANGE),
    ("X", Marker::Diamond, TAB_GRAY),
    ("P", Marker::Diamond, TAB_PINK),
    ("r+", Marker::Plus, OLIVE),
    ("r", Marker::Plus, OLIVE),
    ("b", Marker::Tri, BLACK),
    ("b+", Marker::Tri, BLACK),
    ("h+", Marker::Cross, TAB_RED),
    ("h", Marker::Cross, TAB_RED),
    ("m", Marker::Bar, TAB_GREEN),
    ("w", Marker::Tri, TAB_PURPLE),
    (TIE_LABEL, Marker::Square, TAB_GRAY),
];

/// Ordering used to pick cyclic styles for abbreviations without an override
const STYLE_ORDER: &[&str] = &[
    "L", "L+", "L++", "L+++", "A", "A+", "X", "r", "r+", "b", "b+", "h", "h+", "m", "P", "F",
    "w",
];

/// Display names, abbreviations and styles for indexes and datasets.
///
/// Built once at startup and passed to whatever needs it.
#[derive(Debug, Clone)]
pub struct DisplayNames {
    index_display: HashMap<String, String>,
    index_abbreviation: HashMap<String, String>,
    abbreviation_index: HashMap<String, String>,
    dataset_abbreviation: HashMap<String, String>,
    abbreviation_dataset: HashMap<String, String>,
}

impl Default for DisplayNames {
    fn default() -> Self {
        let mut names = Self::empty();
        for (id, name) in INDEX_DISPLAY {
            names.add_index(id, name, None);
        }
        for (id, abbrev) in INDEX_ABBREVIATION {
            names.index_abbreviation.insert(id.to_string(), abbrev.to_string());
            names.abbreviation_index.insert(abbrev.to_string(), id.to_string());
        }
        for (dataset, abbrev) in DATASET_ABBREVIATION {
            names.add_dataset(dataset, abbrev);
        }
        names
    }
}

impl DisplayNames {
    pub fn empty() -> Self {
        Self {
            index_display: HashMap::new(),
            index_abbreviation: HashMap::new(),
            abbreviation_index: HashMap::new(),
            dataset_abbreviation: HashMap::new(),
            abbreviation_dataset: HashMap::new(),
        }
    }

    /// Register an index with its display name and optional abbreviation
    pub fn add_index(&mut self, id: &str, display: &str, abbreviation: Option<&str>) {
        self.index_display.insert(id.to_string(), display.to_string());
        if let Some(abbrev) = abbreviation {
            self.index_abbreviation.insert(id.to_string(), abbrev.to_string());
            self.abbreviation_index.insert(abbrev.to_string(), id.to_string());
        }
    }

    pub fn add_dataset(&mut self, dataset: &str, abbreviation: &str) {
        self.dataset_abbreviation
            .insert(dataset.to_string(), abbreviation.to_string());
        self.abbreviation_dataset
            .insert(abbreviation.to_string(), dataset.to_string());
    }

    /// Human readable name for an index identifier
    pub fn display_name(&self, index: &str) -> Result<&str> {
        self.index_display
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| Error::MissingMetadata(index.to_string()))
    }

    /// Display name, or the raw identifier with a warning when none is known
    pub fn display_name_or_id<'a>(&'a self, index: &'a str) -> &'a str {
        match self.display_name(index) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!("{}", e);
                index
            }
        }
    }

    pub fn abbreviation(&self, index: &str) -> Option<&str> {
        self.index_abbreviation.get(index).map(String::as_str)
    }

    /// Abbreviation if known, else the identifier itself
    pub fn label_for(&self, index: &str) -> String {
        self.abbreviation(index).unwrap_or(index).to_string()
    }

    /// Index identifier for an abbreviation
    pub fn index_for(&self, abbreviation: &str) -> Option<&str> {
        self.abbreviation_index.get(abbreviation).map(String::as_str)
    }

    /// Display name for a winner label, which may be an abbreviation or an identifier
    pub fn label_display<'a>(&'a self, label: &'a str) -> &'a str {
        let index = self.index_for(label).unwrap_or(label);
        self.display_name_or_id(index)
    }

    /// Short dataset name, or the full name if none is registered
    pub fn dataset_short<'a>(&'a self, dataset: &'a str) -> &'a str {
        self.dataset_abbreviation
            .get(dataset)
            .map(String::as_str)
            .unwrap_or(dataset)
    }

    /// Full dataset name for a short name
    pub fn dataset_full<'a>(&'a self, short: &'a str) -> &'a str {
        self.abbreviation_dataset
            .get(short)
            .map(String::as_str)
            .unwrap_or(short)
    }

    /// Style for an index identifier or abbreviation
    pub fn style(&self, index_or_label: &str) -> IndexStyle {
        let label = self
            .abbreviation(index_or_label)
            .unwrap_or(index_or_label);

        let slot = STYLE_ORDER
            .iter()
            .position(|l| *l == label)
            .unwrap_or_else(|| stable_slot(label));

        let mut style = IndexStyle {
            marker: CYCLE_MARKERS[slot % CYCLE_MARKERS.len()],
            color: CYCLE_COLORS[slot % CYCLE_COLORS.len()],
            solid: label.chars().next().is_some_and(char::is_uppercase),
        };
        if let Some((_, marker, color)) = STYLE_OVERRIDES.iter().find(|(l, _, _)| *l == label) {
            style.marker = *marker;
            style.color = *color;
        }
        style
    }
}

fn stable_slot(label: &str) -> usize {
    label
        .bytes()
        .fold(STYLE_ORDER.len(), |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lookup() {
        let names = DisplayNames::default();
        assert_eq!(names.display_name("artunsync").unwrap(), "ART");
        assert_eq!(
            names.display_name("mystery").unwrap_err(),
            Error::MissingMetadata("mystery".to_string())
        );
        assert_eq!(names.display_name_or_id("mystery"), "mystery");
    }

    #[test]
    fn test_abbreviations_round_trip() {
        let names = DisplayNames::default();
        assert_eq!(names.abbreviation("lippol"), Some("L+++"));
        assert_eq!(names.index_for("L+++"), Some("lippol"));
        assert_eq!(names.label_for("unknown_idx"), "unknown_idx");
        assert_eq!(names.label_display("h+"), "HOT-ROWEX");
        assert_eq!(names.label_display(TIE_LABEL), "Tied");
    }

    #[test]
    fn test_dataset_names() {
        let names = DisplayNames::default();
        assert_eq!(names.dataset_short("biology_200M_uint64"), "genome");
        assert_eq!(names.dataset_full("covid->osm"), "covid_osm_sd_200M_uint64");
        assert_eq!(names.dataset_short("custom"), "custom");
    }

    #[test]
    fn test_styles() {
        let names = DisplayNames::default();
        let alex = names.style("alex");
        assert_eq!(alex.marker, Marker::TriangleDown);
        assert_eq!(alex.color, TAB_BLUE);
        assert!(alex.solid);

        let hot = names.style("h");
        assert_eq!(hot.marker, Marker::Cross);
        assert!(!hot.solid);

        // Same label always gets the same style
        assert_eq!(names.style("zzz"), names.style("zzz"));
    }

    #[test]
    fn test_marker_outlines_are_closed_shapes() {
        for marker in [
            Marker::Circle,
            Marker::TriangleDown,
            Marker::Diamond,
            Marker::Plus,
            Marker::Cross,
            Marker::Square,
            Marker::Star,
            Marker::Tri,
            Marker::Bar,
        ] {
            let outline = marker.outline(6);
            assert!(outline.len() >= 3, "{:?}", marker);
            assert!(outline.iter().all(|(x, y)| x.abs() <= 6 && y.abs() <= 6));
        }
    }
}
