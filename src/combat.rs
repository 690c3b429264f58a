use crate::display::{DisplayNames, TIE_LABEL};
use crate::error::Result;
use crate::grid::Grid;
use crate::heatmap::{extract, Heatmap, HeatmapRequest, LabelMode};
use crate::region::{label_regions, Regions};
use crate::stats::{Aggregator, Comparator};
use crate::table::{Attribute, MeasurementTable};

/// Configuration for a learned vs traditional comparison
#[derive(Debug, Clone)]
pub struct CombatConfig {
    pub learned: Vec<String>,
    pub traditional: Vec<String>,
    pub row_attr: Attribute,
    pub col_attr: Attribute,
    pub value_attr: Attribute,
    pub comparator: Comparator,
    pub aggregator: Aggregator,
    /// Cells with `|ratio|` below this become ties
    pub tie_threshold: Option<f64>,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            learned: ["xindex", "alex", "lipp", "finedex"]
                .map(String::from)
                .to_vec(),
            traditional: ["btree", "hot", "artunsync", "wormhole_u64", "masstree"]
                .map(String::from)
                .to_vec(),
            row_attr: Attribute::ReadRatio,
            col_attr: Attribute::Hardness,
            value_attr: Attribute::Throughput,
            comparator: Comparator::GreaterWins,
            aggregator: Aggregator::Mean,
            tie_threshold: None,
        }
    }
}

impl CombatConfig {
    /// Candidates for multi-threaded runs
    pub fn concurrent() -> Self {
        Self {
            learned: ["xindex", "alexol", "finedex", "lippol"]
                .map(String::from)
                .to_vec(),
            traditional: ["btreeolc", "hotrowex", "artolc", "wormhole_u64", "masstree"]
                .map(String::from)
                .to_vec(),
            ..Default::default()
        }
    }

    /// Default candidates for a thread count
    pub fn for_threads(thread_num: u32) -> Self {
        if thread_num > 1 {
            Self::concurrent()
        } else {
            Self::default()
        }
    }

    fn request(&self, candidates: &[String]) -> HeatmapRequest {
        HeatmapRequest {
            candidates: candidates.to_vec(),
            row_attr: self.row_attr,
            col_attr: self.col_attr,
            value_attr: self.value_attr,
            comparator: self.comparator,
            aggregator: self.aggregator,
            label_mode: LabelMode::Abbreviation,
        }
    }
}

/// Result of a learned vs traditional comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Combat {
    pub row_attr: Attribute,
    pub col_attr: Attribute,
    pub rows: Vec<f64>,
    pub cols: Vec<f64>,
    /// `(traditional - learned) / max(traditional, learned)`; positive when traditional wins
    pub ratio: Grid<f64>,
    /// Winning label per cell, or the tie label
    pub winners: Grid<String>,
    pub regions: Regions,
    /// First dataset seen with each column value
    pub col_datasets: Vec<String>,
    /// Global hardness of `col_datasets`, when known
    pub col_global_hardness: Vec<Option<f64>>,
    pub learned: Heatmap,
    pub traditional: Heatmap,
}

impl Combat {
    /// Run both extractions, compare them cell by cell and label the winning regions
    pub fn derive(
        table: &MeasurementTable,
        config: &CombatConfig,
        names: &DisplayNames,
    ) -> Result<Self> {
        let learned = extract(table, &config.request(&config.learned), names)?;
        let traditional = extract(table, &config.request(&config.traditional), names)?;
        learned.require_complete()?;
        traditional.require_complete()?;

        let (rows, cols) = learned.values.shape();
        let mut ratio = Grid::from_fn(rows, cols, |_, _| 0.0);
        let mut winners = Grid::from_fn(rows, cols, |_, _| String::new());

        for i in 0..rows {
            for j in 0..cols {
                let (Some(l), Some(t)) = (learned.values[(i, j)], traditional.values[(i, j)])
                else {
                    return Err(learned.no_data(i, j));
                };
                let r = relative_difference(t, l);
                let winner = if r > 0.0 {
                    &traditional.labels[(i, j)]
                } else {
                    &learned.labels[(i, j)]
                };
                let winner = winner.clone().ok_or_else(|| learned.no_data(i, j))?;

                let tied = config.tie_threshold.is_some_and(|t| r.abs() < t);
                if tied {
                    ratio[(i, j)] = 0.0;
                    winners[(i, j)] = TIE_LABEL.to_string();
                } else {
                    ratio[(i, j)] = r;
                    winners[(i, j)] = winner;
                }
            }
        }

        let regions = label_regions(&winners);
        tracing::debug!(rows, cols, regions = regions.count, "derived combat grid");

        let (col_datasets, col_global_hardness) =
            column_datasets(table, config.col_attr, &learned.cols);

        Ok(Self {
            row_attr: config.row_attr,
            col_attr: config.col_attr,
            rows: learned.rows.clone(),
            cols: learned.cols.clone(),
            ratio,
            winners,
            regions,
            col_datasets,
            col_global_hardness,
            learned,
            traditional,
        })
    }

    /// Largest absolute ratio in the grid
    pub fn max_abs_ratio(&self) -> f64 {
        self.ratio
            .iter()
            .map(|(_, r)| r.abs())
            .fold(0.0, f64::max)
    }

    /// Row value expressed as a write ratio when the rows are read ratios
    pub fn row_write_ratio(&self, i: usize) -> f64 {
        match self.row_attr {
            Attribute::ReadRatio => 1.0 - self.rows[i],
            _ => self.rows[i],
        }
    }

    /// Number of cells won by each label, in first-seen order
    pub fn win_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for (_, label) in self.winners.iter() {
            match counts.iter_mut().find(|(l, _)| l == label) {
                Some((_, n)) => *n += 1,
                None => counts.push((label.clone(), 1)),
            }
        }
        counts
    }
}

/// Signed relative difference, normalized by the larger of the two values
pub fn relative_difference(traditional: f64, learned: f64) -> f64 {
    let larger = if traditional >= learned {
        traditional
    } else {
        learned
    };
    if larger == 0.0 {
        return 0.0;
    }
    (traditional - learned) / larger
}

fn column_datasets(
    table: &MeasurementTable,
    col_attr: Attribute,
    cols: &[f64],
) -> (Vec<String>, Vec<Option<f64>>) {
    cols.iter()
        .map(|c| {
            table
                .iter()
                .find(|m| col_attr.value(m) == Some(*c))
                .map(|m| (m.dataset.clone(), m.global_hardness))
                .unwrap_or_default()
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::table::{row, Measurement};

    fn cell(dataset: &str, index: &str, read: f64, hardness: f64, tput: f64) -> Measurement {
        let mut m = row(dataset, index, read, tput);
        m.hardness = Some(hardness);
        m.global_hardness = Some(hardness / 10.0);
        m
    }

    fn config() -> CombatConfig {
        CombatConfig {
            learned: vec!["alex".into(), "lipp".into()],
            traditional: vec!["btree".into(), "hot".into()],
            ..Default::default()
        }
    }

    /// Two datasets (easy, hard) x two workloads (read-only, write-only).
    /// Learned wins easy data; traditional wins hard data.
    fn table() -> MeasurementTable {
        let mut rows = Vec::new();
        for (ds, h, learned_tput, trad_tput) in
            [("easy", 10.0, 100.0, 50.0), ("hard", 500.0, 40.0, 80.0)]
        {
            for read in [1.0, 0.0] {
                rows.push(cell(ds, "alex", read, h, learned_tput));
                rows.push(cell(ds, "lipp", read, h, learned_tput - 10.0));
                rows.push(cell(ds, "btree", read, h, trad_tput - 5.0));
                rows.push(cell(ds, "hot", read, h, trad_tput));
            }
        }
        MeasurementTable::new(rows)
    }

    #[test]
    fn test_candidate_presets() {
        assert!(CombatConfig::for_threads(1).learned.contains(&"alex".to_string()));
        let mt = CombatConfig::for_threads(24);
        assert!(mt.learned.contains(&"alexol".to_string()));
        assert!(mt.traditional.contains(&"artolc".to_string()));
    }

    #[test]
    fn test_relative_difference() {
        assert_eq!(relative_difference(80.0, 40.0), 0.5);
        assert_eq!(relative_difference(50.0, 100.0), -0.5);
        assert_eq!(relative_difference(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_derive_winners_and_regions() {
        let combat = Combat::derive(&table(), &config(), &DisplayNames::default()).unwrap();

        assert_eq!(combat.rows, vec![1.0, 0.0]);
        assert_eq!(combat.cols, vec![10.0, 500.0]);
        assert_eq!(
            combat.winners.to_rows(),
            vec![vec!["A".to_string(), "h".to_string()], vec!["A".to_string(), "h".to_string()]]
        );
        assert_eq!(combat.ratio[(0, 0)], -0.5);
        assert_eq!(combat.ratio[(0, 1)], 0.5);
        assert_eq!(combat.regions.count, 2);
        assert_eq!(combat.regions.components.to_rows(), vec![vec![1, 2], vec![1, 2]]);
        assert_eq!(combat.col_datasets, vec!["easy".to_string(), "hard".to_string()]);
        assert_eq!(combat.col_global_hardness, vec![Some(1.0), Some(50.0)]);
        assert_eq!(combat.win_counts(), vec![("A".to_string(), 2), ("h".to_string(), 2)]);
        assert_eq!(combat.row_write_ratio(1), 1.0);
        assert_eq!(combat.max_abs_ratio(), 0.5);
    }

    #[test]
    fn test_tie_threshold_relabels_close_cells() {
        let mut config = config();
        config.tie_threshold = Some(0.6);
        let combat = Combat::derive(&table(), &config, &DisplayNames::default()).unwrap();

        assert!(combat.winners.iter().all(|(_, l)| l == TIE_LABEL));
        assert!(combat.ratio.iter().all(|(_, r)| *r == 0.0));
        assert_eq!(combat.regions.count, 1);
    }

    #[test]
    fn test_equal_throughput_goes_to_learned() {
        let rows = vec![
            cell("d", "alex", 1.0, 1.0, 10.0),
            cell("d", "btree", 1.0, 1.0, 10.0),
        ];
        let combat =
            Combat::derive(&MeasurementTable::new(rows), &config(), &DisplayNames::default())
                .unwrap();
        assert_eq!(combat.winners[(0, 0)], "A");
        assert_eq!(combat.ratio[(0, 0)], 0.0);
    }

    #[test]
    fn test_missing_family_cell_is_an_error() {
        let mut rows = table().rows;
        // Drop every traditional measurement on the hard dataset's write-only workload
        rows.retain(|m| {
            !(m.dataset == "hard" && m.read_ratio == 0.0 && (m.index_type == "btree" || m.index_type == "hot"))
        });
        let err = Combat::derive(&MeasurementTable::new(rows), &config(), &DisplayNames::default())
            .unwrap_err();
        assert_eq!(
            err,
            Error::NoData {
                row_attr: Attribute::ReadRatio,
                row: 0.0,
                col_attr: Attribute::Hardness,
                col: 500.0,
            }
        );
    }
}
