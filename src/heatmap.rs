use crate::display::DisplayNames;
use crate::error::{Error, Result};
use crate::grid::Grid;
use crate::stats::{Aggregator, Comparator};
use crate::table::{Attribute, MeasurementTable};

/// What a cell's winner label records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelMode {
    /// The raw implementation identifier
    #[default]
    Identifier,
    /// The short abbreviation, when the display tables know one
    Abbreviation,
}

/// Parameters for [`extract`]
#[derive(Debug, Clone)]
pub struct HeatmapRequest {
    /// Competing implementations. On an exact tie the first listed one wins.
    pub candidates: Vec<String>,
    pub row_attr: Attribute,
    pub col_attr: Attribute,
    pub value_attr: Attribute,
    pub comparator: Comparator,
    pub aggregator: Aggregator,
    pub label_mode: LabelMode,
}

impl HeatmapRequest {
    pub fn new(candidates: &[impl AsRef<str>]) -> Self {
        Self {
            candidates: candidates.iter().map(|c| c.as_ref().to_string()).collect(),
            row_attr: Attribute::ReadRatio,
            col_attr: Attribute::Hardness,
            value_attr: Attribute::Throughput,
            comparator: Comparator::GreaterWins,
            aggregator: Aggregator::Mean,
            label_mode: LabelMode::Identifier,
        }
    }
}

/// Best value and winning label per (row value, column value) cell
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    pub row_attr: Attribute,
    pub col_attr: Attribute,
    /// Distinct row-attribute values, first-seen order
    pub rows: Vec<f64>,
    /// Distinct column-attribute values, first-seen order
    pub cols: Vec<f64>,
    /// `None` where no candidate had any measurement
    pub values: Grid<Option<f64>>,
    pub labels: Grid<Option<String>>,
}

impl Heatmap {
    /// Cells that no candidate resolved
    pub fn unresolved(&self) -> Vec<(usize, usize)> {
        self.values
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(c, _)| c)
            .collect()
    }

    /// Fail with [`Error::NoData`] on the first unresolved cell
    pub fn require_complete(&self) -> Result<()> {
        match self.unresolved().first() {
            Some(&(i, j)) => Err(self.no_data(i, j)),
            None => Ok(()),
        }
    }

    pub(crate) fn no_data(&self, i: usize, j: usize) -> Error {
        Error::NoData {
            row_attr: self.row_attr,
            row: self.rows[i],
            col_attr: self.col_attr,
            col: self.cols[j],
        }
    }
}

/// Derive the winner heatmap for a set of candidates.
///
/// Axis values come from the whole table in first-seen order, so callers
/// control the axis order by sorting the table first. Cells where a candidate
/// has no rows are skipped for that candidate; a cell only changes hands on a
/// strict improvement.
pub fn extract(
    table: &MeasurementTable,
    request: &HeatmapRequest,
    names: &DisplayNames,
) -> Result<Heatmap> {
    if table.is_empty() {
        return Err(Error::EmptyTable);
    }
    if request.candidates.is_empty() {
        return Err(Error::NoCandidates);
    }

    let rows = table.distinct(request.row_attr);
    if rows.is_empty() {
        return Err(Error::EmptyAxis(request.row_attr));
    }
    let cols = table.distinct(request.col_attr);
    if cols.is_empty() {
        return Err(Error::EmptyAxis(request.col_attr));
    }

    let mut values = Grid::from_fn(rows.len(), cols.len(), |_, _| None::<f64>);
    let mut labels = Grid::from_fn(rows.len(), cols.len(), |_, _| None::<String>);

    for candidate in &request.candidates {
        // Bucket this candidate's measurements by cell
        let mut buckets: Grid<Vec<f64>> = Grid::from_fn(rows.len(), cols.len(), |_, _| Vec::new());
        let mut seen = false;
        for m in table.iter().filter(|m| &m.index_type == candidate) {
            seen = true;
            let (Some(r), Some(c), Some(v)) = (
                request.row_attr.value(m),
                request.col_attr.value(m),
                request.value_attr.value(m),
            ) else {
                continue;
            };
            let (Some(i), Some(j)) = (
                rows.iter().position(|x| *x == r),
                cols.iter().position(|x| *x == c),
            ) else {
                continue;
            };
            buckets[(i, j)].push(v);
        }

        if !seen {
            tracing::warn!(candidate = %candidate, "candidate has no measurements");
            continue;
        }

        let label = match request.label_mode {
            LabelMode::Identifier => candidate.clone(),
            LabelMode::Abbreviation => names.label_for(candidate),
        };

        for ((i, j), bucket) in buckets.iter() {
            let Some(aggregated) = request.aggregator.apply(bucket) else {
                tracing::debug!(
                    candidate = %candidate,
                    row = rows[i],
                    col = cols[j],
                    "no data for cell"
                );
                continue;
            };

            let wins = match values[(i, j)] {
                None => true,
                Some(current) => request.comparator.improves(aggregated, current),
            };
            if wins {
                values[(i, j)] = Some(aggregated);
                labels[(i, j)] = Some(label.clone());
            }
        }
    }

    Ok(Heatmap {
        row_attr: request.row_attr,
        col_attr: request.col_attr,
        rows,
        cols,
        values,
        labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{row, Measurement};
    use proptest::prelude::*;

    fn with_hardness(mut m: Measurement, hardness: f64) -> Measurement {
        m.hardness = Some(hardness);
        m
    }

    fn one_cell_table() -> MeasurementTable {
        MeasurementTable::new(vec![
            with_hardness(row("d", "A", 0.5, 10.0), 1.0),
            with_hardness(row("d", "A", 0.5, 20.0), 1.0),
            with_hardness(row("d", "B", 0.5, 15.0), 1.0),
            with_hardness(row("d", "B", 0.5, 5.0), 1.0),
        ])
    }

    #[test]
    fn test_max_aggregation_picks_a() {
        let mut req = HeatmapRequest::new(&["A", "B"]);
        req.aggregator = Aggregator::Max;
        let hm = extract(&one_cell_table(), &req, &DisplayNames::default()).unwrap();

        assert_eq!(hm.values[(0, 0)], Some(20.0));
        assert_eq!(hm.labels[(0, 0)].as_deref(), Some("A"));
    }

    #[test]
    fn test_nan_aggregate_never_takes_a_cell() {
        let table = MeasurementTable::new(vec![
            with_hardness(row("d", "A", 0.5, f64::NAN), 1.0),
            with_hardness(row("d", "B", 0.5, 10.0), 1.0),
        ]);
        let hm = extract(&table, &HeatmapRequest::new(&["A", "B"]), &DisplayNames::default()).unwrap();

        assert_eq!(hm.values[(0, 0)], Some(10.0));
        assert_eq!(hm.labels[(0, 0)].as_deref(), Some("B"));

        let only_nan = MeasurementTable::new(vec![with_hardness(row("d", "A", 0.5, f64::NAN), 1.0)]);
        let hm = extract(&only_nan, &HeatmapRequest::new(&["A"]), &DisplayNames::default()).unwrap();
        assert_eq!(hm.unresolved(), vec![(0, 0)]);
        assert!(hm.require_complete().is_err());
    }

    #[test]
    fn test_mean_aggregation_picks_a() {
        // A: mean(10, 20) = 15, B: mean(15, 5) = 10
        let req = HeatmapRequest::new(&["A", "B"]);
        let hm = extract(&one_cell_table(), &req, &DisplayNames::default()).unwrap();

        assert_eq!(hm.values[(0, 0)], Some(15.0));
        assert_eq!(hm.labels[(0, 0)].as_deref(), Some("A"));
    }

    #[test]
    fn test_min_with_lesser_wins_picks_b() {
        let mut req = HeatmapRequest::new(&["A", "B"]);
        req.aggregator = Aggregator::Min;
        req.comparator = Comparator::LesserWins;
        let hm = extract(&one_cell_table(), &req, &DisplayNames::default()).unwrap();

        assert_eq!(hm.values[(0, 0)], Some(5.0));
        assert_eq!(hm.labels[(0, 0)].as_deref(), Some("B"));
    }

    #[test]
    fn test_exact_tie_goes_to_first_listed() {
        let table = MeasurementTable::new(vec![
            with_hardness(row("d", "A", 0.5, 10.0), 1.0),
            with_hardness(row("d", "B", 0.5, 10.0), 1.0),
        ]);
        let names = DisplayNames::default();

        let hm = extract(&table, &HeatmapRequest::new(&["A", "B"]), &names).unwrap();
        assert_eq!(hm.labels[(0, 0)].as_deref(), Some("A"));

        let hm = extract(&table, &HeatmapRequest::new(&["B", "A"]), &names).unwrap();
        assert_eq!(hm.labels[(0, 0)].as_deref(), Some("B"));
    }

    #[test]
    fn test_axes_in_first_seen_order() {
        let table = MeasurementTable::new(vec![
            with_hardness(row("x", "A", 0.5, 1.0), 300.0),
            with_hardness(row("y", "A", 1.0, 2.0), 100.0),
            with_hardness(row("x", "A", 1.0, 3.0), 300.0),
            with_hardness(row("y", "A", 0.5, 4.0), 100.0),
        ]);
        let hm = extract(&table, &HeatmapRequest::new(&["A"]), &DisplayNames::default()).unwrap();

        assert_eq!(hm.rows, vec![0.5, 1.0]);
        assert_eq!(hm.cols, vec![300.0, 100.0]);
        assert_eq!(
            hm.values.to_rows(),
            vec![vec![Some(1.0), Some(4.0)], vec![Some(3.0), Some(2.0)]]
        );
    }

    #[test]
    fn test_missing_cell_is_no_data_and_never_overwrites() {
        // B has a real value only in column 100; A only in column 300.
        let table = MeasurementTable::new(vec![
            with_hardness(row("x", "A", 0.5, 7.0), 300.0),
            with_hardness(row("y", "B", 0.5, 9.0), 100.0),
            with_hardness(row("z", "C", 1.0, 1.0), 100.0),
        ]);
        let req = HeatmapRequest::new(&["A", "B"]);
        let hm = extract(&table, &req, &DisplayNames::default()).unwrap();

        assert_eq!(hm.values[(0, 0)], Some(7.0));
        assert_eq!(hm.labels[(0, 0)].as_deref(), Some("A"));
        assert_eq!(hm.values[(0, 1)], Some(9.0));
        assert_eq!(hm.labels[(0, 1)].as_deref(), Some("B"));
        // Row 1.0 only exists for C, which is not a candidate
        assert_eq!(hm.unresolved(), vec![(1, 0), (1, 1)]);
        assert_eq!(hm.labels[(1, 0)], None);
        assert!(matches!(
            hm.require_complete(),
            Err(Error::NoData { row, col, .. }) if row == 1.0 && col == 300.0
        ));
    }

    #[test]
    fn test_negative_values_still_win_over_no_data() {
        let table = MeasurementTable::new(vec![with_hardness(row("x", "A", 0.5, -3.0), 1.0)]);
        let hm = extract(&table, &HeatmapRequest::new(&["A"]), &DisplayNames::default()).unwrap();
        assert_eq!(hm.values[(0, 0)], Some(-3.0));
        hm.require_complete().unwrap();
    }

    #[test]
    fn test_abbreviation_mode() {
        let table = MeasurementTable::new(vec![
            with_hardness(row("x", "alex", 0.5, 3.0), 1.0),
            with_hardness(row("x", "newidx", 1.0, 3.0), 1.0),
        ]);
        let mut req = HeatmapRequest::new(&["alex", "newidx"]);
        req.label_mode = LabelMode::Abbreviation;
        let hm = extract(&table, &req, &DisplayNames::default()).unwrap();

        assert_eq!(hm.labels[(0, 0)].as_deref(), Some("A"));
        assert_eq!(hm.labels[(1, 0)].as_deref(), Some("newidx"));
    }

    #[test]
    fn test_input_validation() {
        let names = DisplayNames::default();
        let req = HeatmapRequest::new(&["A"]);
        assert_eq!(
            extract(&MeasurementTable::default(), &req, &names).unwrap_err(),
            Error::EmptyTable
        );

        let empty: [&str; 0] = [];
        assert_eq!(
            extract(&one_cell_table(), &HeatmapRequest::new(&empty), &names).unwrap_err(),
            Error::NoCandidates
        );

        // No hardness attached anywhere
        let table = MeasurementTable::new(vec![row("x", "A", 0.5, 1.0)]);
        assert_eq!(
            extract(&table, &req, &names).unwrap_err(),
            Error::EmptyAxis(Attribute::Hardness)
        );
    }

    fn random_table() -> impl Strategy<Value = MeasurementTable> {
        proptest::collection::vec((0usize..3, 0u8..3, 0u8..3, 0.0f64..1000.0), 1..60).prop_map(
            |rows| {
                rows.into_iter()
                    .map(|(idx, r, c, v)| {
                        with_hardness(
                            row("d", ["A", "B", "C"][idx], r as f64 / 2.0, v),
                            c as f64 * 10.0,
                        )
                    })
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn prop_winner_dominates_every_candidate(
            table in random_table(),
            greater in any::<bool>(),
        ) {
            let names = DisplayNames::default();
            let mut req = HeatmapRequest::new(&["A", "B", "C"]);
            req.comparator = if greater { Comparator::GreaterWins } else { Comparator::LesserWins };
            let hm = extract(&table, &req, &names).unwrap();

            for candidate in ["A", "B", "C"] {
                let solo = extract(&table, &HeatmapRequest { candidates: vec![candidate.to_string()], ..req.clone() }, &names).unwrap();
                for ((i, j), v) in solo.values.iter() {
                    let Some(v) = v else { continue };
                    let best = hm.values[(i, j)].unwrap();
                    if greater {
                        prop_assert!(best >= *v);
                    } else {
                        prop_assert!(best <= *v);
                    }
                }
            }

            // Labels are present exactly where values are
            for ((i, j), v) in hm.values.iter() {
                prop_assert_eq!(v.is_some(), hm.labels[(i, j)].is_some());
            }
        }

        #[test]
        fn prop_extraction_is_idempotent(table in random_table()) {
            let names = DisplayNames::default();
            let req = HeatmapRequest::new(&["A", "B", "C"]);
            let first = extract(&table, &req, &names).unwrap();
            let second = extract(&table, &req, &names).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
