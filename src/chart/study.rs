use super::{
    ensure_dir, marker_shape, workload_label, AXIS_LABEL_FONT_SIZE, DATA_LABEL_FONT_SIZE,
    LEGEND_FONT_SIZE, MARKER_SIZE, PANEL_TITLE_FONT_SIZE, TICK_LABEL_FONT_SIZE,
    TITLE_FONT_SIZE,
};
use crate::display::DisplayNames;
use crate::error::{Error, Result as CrateResult};
use crate::stats::mean;
use crate::table::{Attribute, Measurement, MeasurementTable};
use anyhow::Result;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_STUDY_DATASETS: &[&str] = &["covid", "libio", "genome", "osm"];

/// Single-thread indexes, learned first
pub const ST_INDEXES: &[&str] = &[
    "alex", "lipp", "pgm", "xindex", "finedex", "artunsync", "hot", "btree", "wormhole_u64",
    "masstree",
];

/// Concurrent indexes, learned first
pub const MT_INDEXES: &[&str] = &[
    "alexol", "lippol", "xindex", "finedex", "artolc", "btreeolc", "hotrowex", "masstree",
    "wormhole_u64",
];

pub const MEMORY_INDEXES: &[&str] = &["alex", "lipp", "pgm", "artunsync", "btree", "hot"];

pub const RANGE_INDEXES: &[&str] = &["alex", "lipp", "finedex", "pgm", "btree", "hot"];

pub const DEFAULT_THREADS: &[u32] = &[2, 4, 8, 16, 24, 36, 48];

/// Insert ratios of the workloads shown in the scalability grid
pub const DEFAULT_WORKLOADS: &[f64] = &[0.0, 0.5, 1.0];

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const CORES_PER_SOCKET: f64 = 24.0;
const MIN_BAR_FRACTION: f64 = 0.05;

/// Which datasets and indexes a study chart shows
#[derive(Debug, Clone)]
pub struct StudyConfig {
    /// Short dataset names, one panel each
    pub datasets: Vec<String>,
    /// Index identifiers, learned ones first
    pub indexes: Vec<String>,
    pub thread_num: u32,
}

impl StudyConfig {
    pub fn new(datasets: &[impl AsRef<str>], indexes: &[impl AsRef<str>], thread_num: u32) -> Self {
        Self {
            datasets: datasets.iter().map(|d| d.as_ref().to_string()).collect(),
            indexes: indexes.iter().map(|i| i.as_ref().to_string()).collect(),
            thread_num,
        }
    }

    /// Position of the first traditional index, where the dashed separator goes
    fn separator(&self, names: &DisplayNames) -> Option<usize> {
        self.indexes.iter().position(|i| !names.style(i).solid)
    }
}

/// Shaded thread range on scalability charts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shade {
    /// Threads running on hyper-threads
    HyperThreading,
    /// Threads spilling onto a second socket
    Numa,
}

impl Shade {
    pub fn span(&self) -> (f64, f64) {
        match self {
            Shade::HyperThreading => (30.0, 48.0),
            Shade::Numa => (36.0, 96.0),
        }
    }
}

impl FromStr for Shade {
    type Err = Error;

    fn from_str(s: &str) -> CrateResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "ht" | "hyperthreading" => Ok(Shade::HyperThreading),
            "numa" => Ok(Shade::Numa),
            other => Err(Error::unsupported("shade", other)),
        }
    }
}

impl fmt::Display for Shade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shade::HyperThreading => f.write_str("ht"),
            Shade::Numa => f.write_str("numa"),
        }
    }
}

fn same(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn mean_where(
    table: &MeasurementTable,
    attr: Attribute,
    pred: impl Fn(&Measurement) -> bool,
) -> Option<f64> {
    mean(&table.values(attr, pred))
}

fn new_canvas<'a>(
    path: &'a Path,
    size: (u32, u32),
    title: &str,
) -> Result<DrawingArea<SVGBackend<'a>, Shift>> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    Ok(root.titled(title, ("sans-serif", TITLE_FONT_SIZE))?)
}

fn draw_legend<'a, 'b: 'a, X, Y>(
    chart: &mut ChartContext<'a, SVGBackend<'b>, Cartesian2d<X, Y>>,
    position: SeriesLabelPosition,
) -> Result<()>
where
    X: Ranged,
    Y: Ranged,
{
    chart
        .configure_series_labels()
        .position(position)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", LEGEND_FONT_SIZE))
        .draw()?;
    Ok(())
}

/// Mean throughput (Mop/s) per thread count, in `threads` order
pub fn scalability_series(
    table: &MeasurementTable,
    dataset: &str,
    insert_ratio: f64,
    index: &str,
    threads: &[u32],
) -> Vec<(f64, f64)> {
    threads
        .iter()
        .filter_map(|&t| {
            mean_where(table, Attribute::Throughput, |m| {
                m.dataset == dataset
                    && m.index_type == index
                    && same(m.insert_ratio, insert_ratio)
                    && m.thread_num == t
            })
            .map(|tput| (t as f64, tput / 1e6))
        })
        .collect()
}

/// Grid of workloads x datasets, throughput against thread count per index
pub fn scalability_chart(
    table: &MeasurementTable,
    names: &DisplayNames,
    config: &StudyConfig,
    threads: &[u32],
    workloads: &[f64],
    shade: Option<Shade>,
    output_dir: &Path,
) -> Result<()> {
    ensure_dir(output_dir)?;
    let path = output_dir.join("scalability.svg");
    let cols = config.datasets.len();
    let size = (560 * cols as u32 + 300, 420 * workloads.len() as u32 + 80);
    let root = new_canvas(&path, size, "Scalability")?;

    let x_min = threads.iter().copied().min().unwrap_or(1) as f64;
    let x_max = threads.iter().copied().max().unwrap_or(1) as f64;
    let numa = shade == Some(Shade::Numa);
    let panels = root.split_evenly((workloads.len(), cols));

    for (w, &workload) in workloads.iter().enumerate() {
        for (d, short) in config.datasets.iter().enumerate() {
            let dataset = names.dataset_full(short);
            let series: Vec<(&str, Vec<(f64, f64)>)> = config
                .indexes
                .iter()
                .map(|i| {
                    (
                        i.as_str(),
                        scalability_series(table, dataset, workload, i, threads),
                    )
                })
                .collect();
            let y_max = series
                .iter()
                .flat_map(|(_, s)| s.iter().map(|(_, y)| *y))
                .fold(0.0, f64::max)
                * 1.1
                + 1e-3;

            let mut builder = ChartBuilder::on(&panels[w * cols + d]);
            builder
                .margin(10)
                .x_label_area_size(50)
                .y_label_area_size(70);
            if w == 0 {
                builder.caption(short, ("sans-serif", PANEL_TITLE_FONT_SIZE));
            }
            let mut chart = builder.build_cartesian_2d(x_min..x_max, 0.0..y_max)?;

            let y_desc = format!("{} Throughput (Mop/s)", workload_label(workload));
            let x_desc = if numa { "# of sockets" } else { "# of cores" };
            let thread_label = |x: &f64| {
                if numa && *x >= CORES_PER_SOCKET {
                    format!("{:.0}", x / CORES_PER_SOCKET)
                } else {
                    format!("{:.0}", x)
                }
            };
            let mut mesh = chart.configure_mesh();
            mesh.x_label_formatter(&thread_label)
                .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
                .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE - 6));
            if d == 0 {
                mesh.y_desc(y_desc);
            }
            if w + 1 == workloads.len() {
                mesh.x_desc(x_desc);
            }
            mesh.draw()?;

            if let Some(shade) = shade {
                let (lo, hi) = shade.span();
                let (lo, hi) = (lo.max(x_min), hi.min(x_max));
                if lo < hi {
                    chart.draw_series(std::iter::once(Rectangle::new(
                        [(lo, 0.0), (hi, y_max)],
                        BLACK.mix(0.1).filled(),
                    )))?;
                }
            }

            let first_panel = w == 0 && d == 0;
            for (index, data) in series {
                if data.is_empty() {
                    continue;
                }
                let style = names.style(index);
                let color = style.color;
                let line = color.stroke_width(3);

                let anno = if style.solid {
                    chart.draw_series(LineSeries::new(data.clone(), line))?
                } else {
                    chart.draw_series(DashedLineSeries::new(data.clone(), 10, 6, line))?
                };
                if first_panel {
                    anno.label(names.display_name_or_id(index)).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3))
                    });
                }

                let (outline, _) = marker_shape(style.marker, MARKER_SIZE);
                chart.draw_series(
                    data.into_iter()
                        .map(|c| EmptyElement::at(c) + Polygon::new(outline.clone(), color.filled())),
                )?;
            }

            if first_panel {
                draw_legend(&mut chart, SeriesLabelPosition::UpperLeft)?;
            }
        }
    }

    root.present()?;
    println!("Generated: {}", path.display());
    Ok(())
}

/// Mean memory consumption in GiB
fn memory_gib(table: &MeasurementTable, dataset: &str, index: &str) -> Option<f64> {
    mean_where(table, Attribute::MemoryConsumption, |m| {
        m.dataset == dataset && m.index_type == index
    })
    .map(|bytes| bytes / GIB)
}

fn draw_bar<'a, 'b: 'a>(
    chart: &mut ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    position: usize,
    base: f64,
    value: f64,
    color: RGBColor,
) -> Result<()> {
    let x = position as f64;
    chart.draw_series([
        Rectangle::new([(x - 0.4, base), (x + 0.4, value)], color.mix(0.9).filled()),
        Rectangle::new([(x - 0.4, base), (x + 0.4, value)], BLACK.stroke_width(1)),
    ])?;
    Ok(())
}

fn draw_separator<'a, 'b: 'a>(
    chart: &mut ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    position: Option<usize>,
    y_range: (f64, f64),
) -> Result<()> {
    if let Some(p) = position {
        let x = p as f64 - 0.5;
        chart.draw_series(DashedLineSeries::new(
            vec![(x, y_range.0), (x, y_range.1)],
            8,
            6,
            BLACK.stroke_width(2),
        ))?;
    }
    Ok(())
}

/// Register a legend entry for a bar color without drawing anything visible
fn bar_legend<'a, 'b: 'a>(
    chart: &mut ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    label: &str,
    color: RGBColor,
) -> Result<()> {
    chart
        .draw_series(std::iter::empty::<Rectangle<(f64, f64)>>())?
        .label(label)
        .legend(move |(x, y)| Rectangle::new([(x, y - 8), (x + 20, y + 8)], color.filled()));
    Ok(())
}

/// Per-dataset bars of mean memory per index
pub fn memory_chart(
    table: &MeasurementTable,
    names: &DisplayNames,
    config: &StudyConfig,
    output_dir: &Path,
) -> Result<()> {
    ensure_dir(output_dir)?;
    let path = output_dir.join("memory.svg");
    let cols = config.datasets.len();
    let root = new_canvas(&path, (420 * cols as u32 + 260, 520), "Memory Consumption")?;

    let values: Vec<Vec<Option<f64>>> = config
        .datasets
        .iter()
        .map(|short| {
            let dataset = names.dataset_full(short);
            config
                .indexes
                .iter()
                .map(|i| memory_gib(table, dataset, i))
                .collect()
        })
        .collect();
    let y_max = values.iter().flatten().flatten().copied().fold(0.0, f64::max) * 1.1 + 1e-3;
    let n = config.indexes.len();
    // Memory charts split the index list in half
    let separator = Some(n / 2);

    let panels = root.split_evenly((1, cols));
    for (d, short) in config.datasets.iter().enumerate() {
        let mut chart = ChartBuilder::on(&panels[d])
            .caption(short, ("sans-serif", PANEL_TITLE_FONT_SIZE))
            .margin(10)
            .x_label_area_size(20)
            .y_label_area_size(if d == 0 { 80 } else { 50 })
            .build_cartesian_2d(-0.5..(n as f64 - 0.5), 0.0..y_max)?;

        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .x_labels(0)
            .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
            .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE));
        if d == 0 {
            mesh.y_desc("Size (GiB)");
        }
        mesh.draw()?;

        for (k, index) in config.indexes.iter().enumerate() {
            let color = names.style(index).color;
            match values[d][k] {
                Some(v) => draw_bar(&mut chart, k, 0.0, v, color)?,
                None => tracing::warn!(dataset = %short, index = %index, "no memory measurement"),
            }
            if d == 0 {
                bar_legend(&mut chart, names.display_name_or_id(index), color)?;
            }
        }
        draw_separator(&mut chart, separator, (0.0, y_max))?;

        if d == 0 {
            draw_legend(&mut chart, SeriesLabelPosition::UpperLeft)?;
        }
    }

    root.present()?;
    println!("Generated: {}", path.display());
    Ok(())
}

/// Tail-latency rows of the latency chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyCategory {
    /// 99.9th percentile latency
    P999,
    /// Standard deviation, from the recorded variance
    Std,
}

impl LatencyCategory {
    pub fn all() -> [LatencyCategory; 2] {
        [LatencyCategory::P999, LatencyCategory::Std]
    }

    pub fn label(&self) -> &'static str {
        match self {
            LatencyCategory::P999 => "99.9% (ns)",
            LatencyCategory::Std => "STD (ns)",
        }
    }

    /// Mean of the category over matching measurements
    pub fn value(
        &self,
        table: &MeasurementTable,
        dataset: &str,
        insert_ratio: f64,
        index: &str,
        thread_num: u32,
    ) -> Option<f64> {
        let pred = |m: &Measurement| {
            m.dataset == dataset
                && m.index_type == index
                && same(m.insert_ratio, insert_ratio)
                && m.thread_num == thread_num
        };
        match self {
            LatencyCategory::P999 => mean_where(table, Attribute::LatencyP999, pred),
            LatencyCategory::Std => {
                mean_where(table, Attribute::LatencyVariance, pred).map(f64::sqrt)
            }
        }
    }
}

/// Fixed y limit of a latency panel
pub fn latency_ylim(thread_num: u32, write_only: bool, category: LatencyCategory) -> f64 {
    use LatencyCategory::*;
    match (thread_num > 1, write_only, category) {
        (false, false, P999) => 4000.0,
        (false, false, Std) => 10000.0,
        (false, true, P999) => 6000.0,
        (false, true, Std) => 10000.0,
        (true, false, P999) => 4000.0,
        (true, false, Std) => 3000.0,
        (true, true, P999) => 40000.0,
        (true, true, Std) => 50000.0,
    }
}

/// Drawn bar height and, when the value exceeds the limit, its overflow factor.
///
/// Bars are at least 5% of the limit so tiny values stay visible.
fn latency_bar(value: f64, ylim: f64) -> (f64, Option<f64>) {
    let value = value.max(ylim * MIN_BAR_FRACTION);
    if value > ylim {
        (ylim, Some(value / ylim))
    } else {
        (value, None)
    }
}

/// Read-only (`latency_0.svg`) and write-only (`latency_1.svg`) tail latency
pub fn latency_charts(
    table: &MeasurementTable,
    names: &DisplayNames,
    config: &StudyConfig,
    output_dir: &Path,
) -> Result<()> {
    ensure_dir(output_dir)?;
    for write_only in [false, true] {
        latency_chart(table, names, config, write_only, output_dir)?;
    }
    Ok(())
}

fn latency_chart(
    table: &MeasurementTable,
    names: &DisplayNames,
    config: &StudyConfig,
    write_only: bool,
    output_dir: &Path,
) -> Result<()> {
    let insert_ratio = if write_only { 1.0 } else { 0.0 };
    let path = output_dir.join(format!("latency_{}.svg", insert_ratio as u32));
    let cols = config.datasets.len();
    let title = format!(
        "{} tail latency ({})",
        if write_only { "Insert" } else { "Lookup" },
        if config.thread_num == 1 {
            "single core".to_string()
        } else {
            format!("{} cores", config.thread_num)
        }
    );
    let root = new_canvas(&path, (420 * cols as u32 + 260, 900), &title)?;
    let panels = root.split_evenly((2, cols));
    let n = config.indexes.len();
    let separator = config.separator(names);

    for (c, category) in LatencyCategory::all().into_iter().enumerate() {
        let ylim = latency_ylim(config.thread_num, write_only, category);
        for (d, short) in config.datasets.iter().enumerate() {
            let dataset = names.dataset_full(short);
            let mut builder = ChartBuilder::on(&panels[c * cols + d]);
            builder
                .margin(10)
                .x_label_area_size(20)
                .y_label_area_size(if d == 0 { 90 } else { 60 });
            if c == 0 {
                builder.caption(short, ("sans-serif", PANEL_TITLE_FONT_SIZE));
            }
            // Headroom above the limit for overflow annotations
            let mut chart =
                builder.build_cartesian_2d(-0.5..(n as f64 - 0.5), 0.0..(ylim * 1.3))?;

            let mut mesh = chart.configure_mesh();
            mesh.disable_x_mesh()
                .x_labels(0)
                .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
                .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE - 4));
            if d == 0 {
                mesh.y_desc(category.label());
            }
            mesh.draw()?;

            for (k, index) in config.indexes.iter().enumerate() {
                let color = names.style(index).color;
                let Some(value) =
                    category.value(table, dataset, insert_ratio, index, config.thread_num)
                else {
                    tracing::warn!(dataset = %short, index = %index, "no latency measurement");
                    continue;
                };

                let (height, overflow) = latency_bar(value, ylim);
                draw_bar(&mut chart, k, 0.0, height, color)?;
                if let Some(factor) = overflow {
                    chart.draw_series(std::iter::once(Text::new(
                        format!("{:.1}x", factor),
                        (k as f64, ylim * 1.05),
                        ("sans-serif", DATA_LABEL_FONT_SIZE)
                            .into_font()
                            .transform(FontTransform::Rotate270)
                            .color(&BLACK),
                    )))?;
                }
                if c == 0 && d == 0 {
                    bar_legend(&mut chart, names.display_name_or_id(index), color)?;
                }
            }
            draw_separator(&mut chart, separator, (0.0, ylim))?;

            if c == 0 && d == 0 {
                draw_legend(&mut chart, SeriesLabelPosition::UpperRight)?;
            }
        }
    }

    root.present()?;
    println!("Generated: {}", path.display());
    Ok(())
}

/// Mean scanned keys per second (millions) by scan length, shortest scans first
pub fn range_series(
    table: &MeasurementTable,
    dataset: &str,
    index: &str,
    thread_num: u32,
) -> Vec<(u32, f64)> {
    let mut scan_nums: Vec<u32> = table
        .iter()
        .filter(|m| m.dataset == dataset && m.index_type == index && m.thread_num == thread_num)
        .map(|m| m.scan_num)
        .collect();
    scan_nums.sort_unstable();
    scan_nums.dedup();

    scan_nums
        .into_iter()
        .filter_map(|scan| {
            let keys: Vec<f64> = table
                .iter()
                .filter(|m| {
                    m.dataset == dataset
                        && m.index_type == index
                        && m.thread_num == thread_num
                        && m.scan_num == scan
                })
                .map(|m| m.throughput * m.scan_num as f64)
                .collect();
            mean(&keys).map(|k| (scan, k / 1e6))
        })
        .collect()
}

/// Per-dataset scan throughput by scan length
pub fn range_chart(
    table: &MeasurementTable,
    names: &DisplayNames,
    config: &StudyConfig,
    output_dir: &Path,
) -> Result<()> {
    ensure_dir(output_dir)?;
    let path = output_dir.join("range.svg");
    let cols = config.datasets.len();
    let root = new_canvas(&path, (460 * cols as u32 + 260, 560), "Range Queries")?;
    let panels = root.split_evenly((1, cols));

    let mut scan_nums: Vec<u32> = table.iter().map(|m| m.scan_num).collect();
    scan_nums.sort_unstable();
    scan_nums.dedup();
    let positions = scan_nums.len().max(1);

    for (d, short) in config.datasets.iter().enumerate() {
        let dataset = names.dataset_full(short);
        let series: Vec<(&str, Vec<(f64, f64)>)> = config
            .indexes
            .iter()
            .map(|i| {
                let points = range_series(table, dataset, i, config.thread_num)
                    .into_iter()
                    .filter_map(|(scan, keys)| {
                        scan_nums
                            .iter()
                            .position(|s| *s == scan)
                            .map(|p| (p as f64, keys))
                    })
                    .collect();
                (i.as_str(), points)
            })
            .collect();
        let y_max = series
            .iter()
            .flat_map(|(_, s)| s.iter().map(|(_, y)| *y))
            .fold(0.0, f64::max)
            * 1.1
            + 1e-3;

        let mut chart = ChartBuilder::on(&panels[d])
            .caption(short, ("sans-serif", PANEL_TITLE_FONT_SIZE))
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(if d == 0 { 80 } else { 60 })
            .build_cartesian_2d(-0.25..(positions as f64 - 0.75), 0.0..y_max)?;

        let scan_label = |x: &f64| {
            let idx = x.round();
            if idx < 0.0 || (x - idx).abs() > 0.2 {
                return String::new();
            }
            scan_nums
                .get(idx as usize)
                .map(|s| format!("10^{:.0}", (*s as f64).log10()))
                .unwrap_or_default()
        };
        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .x_labels(positions)
            .x_label_formatter(&scan_label)
            .x_desc("Range")
            .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
            .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE - 4));
        if d == 0 {
            mesh.y_desc("Throughput (M keys/s)");
        }
        mesh.draw()?;

        for (index, data) in series {
            if data.is_empty() {
                continue;
            }
            let style = names.style(index);
            let color = style.color;
            let line = color.stroke_width(3);
            let anno = if style.solid {
                chart.draw_series(LineSeries::new(data.clone(), line))?
            } else {
                chart.draw_series(DashedLineSeries::new(data.clone(), 10, 6, line))?
            };
            if d == 0 {
                anno.label(names.display_name_or_id(index)).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3))
                });
            }
            let (outline, _) = marker_shape(style.marker, MARKER_SIZE);
            chart.draw_series(
                data.into_iter()
                    .map(|c| EmptyElement::at(c) + Polygon::new(outline.clone(), color.filled())),
            )?;
        }

        if d == 0 {
            draw_legend(&mut chart, SeriesLabelPosition::UpperRight)?;
        }
    }

    root.present()?;
    println!("Generated: {}", path.display());
    Ok(())
}

/// Percent change of throughput on a shifted dataset against its source at read ratio 0.5
pub fn datashift_change(
    shifted: &MeasurementTable,
    original: &MeasurementTable,
    shifted_dataset: &str,
    source_dataset: &str,
    index: &str,
    thread_num: u32,
) -> Option<f64> {
    let after = mean_where(shifted, Attribute::Throughput, |m| {
        m.dataset == shifted_dataset && m.index_type == index && m.thread_num == thread_num
    })?;
    let before = mean_where(original, Attribute::Throughput, |m| {
        m.dataset == source_dataset
            && m.index_type == index
            && same(m.read_ratio, 0.5)
            && m.thread_num == thread_num
    })?;
    if before == 0.0 {
        return None;
    }
    Some((after / before - 1.0) * 100.0)
}

/// Per shifted dataset, bars of throughput change per index
pub fn datashift_chart(
    shifted: &MeasurementTable,
    original: &MeasurementTable,
    names: &DisplayNames,
    config: &StudyConfig,
    output_dir: &Path,
) -> Result<()> {
    ensure_dir(output_dir)?;
    let path = output_dir.join("datashift.svg");
    let cols = config.datasets.len();
    let root = new_canvas(&path, (400 * cols as u32 + 260, 560), "Data Shift")?;
    let panels = root.split_evenly((1, cols));
    let n = config.indexes.len();
    let separator = config.separator(names);

    let changes: Vec<Vec<Option<f64>>> = config
        .datasets
        .iter()
        .map(|short| {
            let dataset = names.dataset_full(short);
            // "covid->osm" starts from covid
            let source_short = short.split("->").next().unwrap_or(short.as_str());
            let source = names.dataset_full(source_short);
            config
                .indexes
                .iter()
                .map(|i| datashift_change(shifted, original, dataset, source, i, config.thread_num))
                .collect()
        })
        .collect();

    let all: Vec<f64> = changes.iter().flatten().flatten().copied().collect();
    let y_min = all.iter().copied().fold(0.0, f64::min) * 1.15 - 1.0;
    let y_max = all.iter().copied().fold(0.0, f64::max) * 1.15 + 1.0;

    for (d, short) in config.datasets.iter().enumerate() {
        let mut chart = ChartBuilder::on(&panels[d])
            .caption(short, ("sans-serif", PANEL_TITLE_FONT_SIZE))
            .margin(10)
            .x_label_area_size(20)
            .y_label_area_size(if d == 0 { 80 } else { 60 })
            .build_cartesian_2d(-0.5..(n as f64 - 0.5), y_min..y_max)?;

        let percent = |y: &f64| format!("{:.0}%", y);
        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .x_labels(0)
            .y_label_formatter(&percent)
            .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
            .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE - 4));
        if d == 0 {
            mesh.y_desc("Throughput % change");
        }
        mesh.draw()?;

        for (k, index) in config.indexes.iter().enumerate() {
            let color = names.style(index).color;
            match changes[d][k] {
                Some(v) => {
                    draw_bar(&mut chart, k, 0.0, v, color)?;
                    let (anchor, y) = if v >= 0.0 {
                        (VPos::Bottom, v)
                    } else {
                        (VPos::Top, v)
                    };
                    chart.draw_series(std::iter::once(Text::new(
                        format!("{:.0}", v),
                        (k as f64, y),
                        ("sans-serif", DATA_LABEL_FONT_SIZE - 2)
                            .into_font()
                            .color(&BLACK)
                            .pos(Pos::new(HPos::Center, anchor)),
                    )))?;
                }
                None => tracing::warn!(dataset = %short, index = %index, "no data shift measurement"),
            }
            if d == 0 {
                bar_legend(&mut chart, names.display_name_or_id(index), color)?;
            }
        }
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(-0.5, 0.0), (n as f64 - 0.5, 0.0)],
            BLACK.stroke_width(1),
        )))?;
        draw_separator(&mut chart, separator, (y_min, y_max))?;

        if d == 0 {
            draw_legend(&mut chart, SeriesLabelPosition::LowerLeft)?;
        }
    }

    root.present()?;
    println!("Generated: {}", path.display());
    Ok(())
}
