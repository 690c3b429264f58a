use crate::table::{clean_dataset_name, MeasurementTable};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Default error bound for local hardness
pub const LOCAL_ERROR_BOUND: f64 = 32.0;
/// Default error bound for global hardness
pub const GLOBAL_ERROR_BOUND: f64 = 4096.0;

/// One row of the hardness CSV: PLA segment count of a dataset at an error bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardnessRecord {
    #[serde(rename = "key_path", alias = "dataset")]
    pub dataset: String,
    pub error_bound: f64,
    pub pgm: f64,
    #[serde(default)]
    pub table_size: f64,
}

/// Precomputed dataset hardness, keyed by dataset and error bound
#[derive(Debug, Clone, Default)]
pub struct HardnessTable {
    pub records: Vec<HardnessRecord>,
}

impl HardnessTable {
    pub fn new(records: Vec<HardnessRecord>) -> Self {
        Self { records }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open hardness file {}", path.display()))?;

        let mut records = Vec::new();
        for record in reader.deserialize::<HardnessRecord>() {
            let mut r = record.with_context(|| format!("Malformed row in {}", path.display()))?;
            r.dataset = clean_dataset_name(&r.dataset);
            records.push(r);
        }
        Ok(Self { records })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for r in &self.records {
            writer.serialize(r)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Hardness of `dataset` at `error_bound`, from the first matching row
    pub fn lookup(&self, dataset: &str, error_bound: f64) -> Option<f64> {
        self.records
            .iter()
            .find(|r| r.dataset == dataset && r.error_bound == error_bound)
            .map(|r| r.pgm)
    }

    /// Set local and global hardness on every measurement.
    ///
    /// Datasets without an entry keep `None` and are reported once each.
    pub fn attach(&self, table: &mut MeasurementTable, local_eb: f64, global_eb: f64) {
        let mut reported: HashSet<(String, u64)> = HashSet::new();
        let mut report = |dataset: &str, eb: f64| {
            if reported.insert((dataset.to_string(), eb.to_bits())) {
                tracing::warn!(dataset, error_bound = eb, "hardness is not available");
            }
        };

        for m in &mut table.rows {
            m.hardness = self.lookup(&m.dataset, local_eb);
            if m.hardness.is_none() {
                report(&m.dataset, local_eb);
            }
            m.global_hardness = self.lookup(&m.dataset, global_eb);
            if m.global_hardness.is_none() {
                report(&m.dataset, global_eb);
            }
        }
    }
}
