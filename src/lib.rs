pub mod chart;
pub mod combat;
pub mod display;
pub mod error;
pub mod grid;
pub mod hardness;
pub mod heatmap;
pub mod region;
pub mod report;
pub mod stats;
pub mod synth;
pub mod table;

pub use combat::{Combat, CombatConfig};
pub use display::DisplayNames;
pub use error::{Error, Result};
pub use grid::Grid;
pub use heatmap::{extract, Heatmap, HeatmapRequest, LabelMode};
pub use region::{label_regions, EdgeMask, Regions};
pub use table::{Attribute, Measurement, MeasurementTable};
