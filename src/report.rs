use crate::combat::Combat;
use crate::display::DisplayNames;
use crate::region::EdgeMask;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Cells won by one label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinCount {
    pub label: String,
    pub index: String,
    pub cells: usize,
}

/// Serializable snapshot of a combat, for `--json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatSummary {
    pub row_attr: String,
    pub col_attr: String,
    pub rows: Vec<f64>,
    pub cols: Vec<f64>,
    pub col_datasets: Vec<String>,
    pub ratio: Vec<Vec<f64>>,
    pub winners: Vec<Vec<String>>,
    pub edges: Vec<Vec<EdgeMask>>,
    pub components: Vec<Vec<u32>>,
    pub regions: u32,
    pub wins: Vec<WinCount>,
}

impl CombatSummary {
    pub fn new(combat: &Combat, names: &DisplayNames) -> Self {
        let wins = combat
            .win_counts()
            .into_iter()
            .map(|(label, cells)| WinCount {
                index: names.label_display(&label).to_string(),
                label,
                cells,
            })
            .collect();

        Self {
            row_attr: combat.row_attr.to_string(),
            col_attr: combat.col_attr.to_string(),
            rows: combat.rows.clone(),
            cols: combat.cols.clone(),
            col_datasets: combat.col_datasets.clone(),
            ratio: combat.ratio.to_rows(),
            winners: combat.winners.to_rows(),
            edges: combat.regions.edges.to_rows(),
            components: combat.regions.components.to_rows(),
            regions: combat.regions.count,
            wins,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Generated: {}", path.display());
        Ok(())
    }
}

/// Print the winner grid and win counts to the console
pub fn print_combat(combat: &Combat, names: &DisplayNames) {
    println!("\n{:=<80}", "");
    println!("Learned vs Traditional");
    println!("{:=<80}\n", "");

    print!("  {:>10}", combat.row_attr.to_string());
    for dataset in &combat.col_datasets {
        print!(" {:>8}", truncate(names.dataset_short(dataset), 8));
    }
    println!();
    println!("  {:-<1$}", "", 11 + 9 * combat.cols.len());

    for (i, row) in combat.winners.row_slices().enumerate() {
        print!("  {:>10.2}", combat.rows[i]);
        for (j, label) in row.iter().enumerate() {
            let cell = format!("{}{:+.0}%", label, combat.ratio[(i, j)] * 100.0);
            print!(" {:>8}", cell);
        }
        println!();
    }

    println!("\n  Regions: {}", combat.regions.count);
    println!("  {:>12} {:>8}", "Winner", "Cells");
    println!("  {:-<21}", "");
    for (label, cells) in combat.win_counts() {
        println!("  {:>12} {:>8}", names.label_display(&label), cells);
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
