use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use index_combat::chart::{
    combat_charts, datashift_chart, latency_charts, memory_chart, range_chart,
    scalability_chart, CombatChartOptions, Shade, StudyConfig, DEFAULT_STUDY_DATASETS,
    DEFAULT_THREADS, DEFAULT_WORKLOADS, MEMORY_INDEXES, MT_INDEXES, RANGE_INDEXES, ST_INDEXES,
};
use index_combat::combat::{Combat, CombatConfig};
use index_combat::display::DisplayNames;
use index_combat::hardness::{HardnessTable, GLOBAL_ERROR_BOUND, LOCAL_ERROR_BOUND};
use index_combat::report::{print_combat, CombatSummary};
use index_combat::stats::{Aggregator, Comparator};
use index_combat::synth::{Generator, SynthConfig};
use index_combat::table::{Attribute, MeasurementTable};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_EXCLUDED: &[&str] = &["eth", "wiki_rev", "planetways", "gnomad"];
const DEFAULT_SHIFTED: &[&str] = &["covid->osm", "osm->covid", "covid->genome", "genome->covid"];

#[derive(Parser)]
#[command(name = "index-combat")]
#[command(about = "Learned vs traditional index benchmark analysis and charts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,
}

/// Benchmark inputs and chart output shared by every chart command
#[derive(Args)]
struct IoArgs {
    /// Benchmark result CSV files
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Output directory for charts
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,
}

/// Which datasets and indexes a study chart shows
#[derive(Args)]
struct SelectionArgs {
    /// Short dataset names, one panel each
    #[arg(long, value_delimiter = ',')]
    datasets: Vec<String>,

    /// Index identifiers, learned ones first
    #[arg(long, value_delimiter = ',')]
    indexes: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlotOn {
    Insert,
    Delete,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic benchmark results
    Synth {
        /// Output directory for CSV files
        #[arg(short, long, default_value = "./data")]
        output: PathBuf,

        /// Measurements per configuration
        #[arg(short, long, default_value = "2")]
        repeats: usize,

        /// Random seed for data generation
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },

    /// Compare learned and traditional indexes cell by cell
    Combat {
        #[command(flatten)]
        io: IoArgs,

        /// Hardness CSV; without it the input must carry pgm columns
        #[arg(long)]
        hardness: Option<PathBuf>,

        /// Learned index candidates
        #[arg(long, value_delimiter = ',')]
        learned: Vec<String>,

        /// Traditional index candidates
        #[arg(long, value_delimiter = ',')]
        traditional: Vec<String>,

        /// Drop datasets whose name contains any of these
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_EXCLUDED.iter().map(|s| s.to_string()))]
        exclude: Vec<String>,

        /// Only use measurements taken with this many threads
        #[arg(long, default_value = "1")]
        thread_num: u32,

        #[arg(long, default_value = "read_ratio")]
        row: Attribute,

        #[arg(long, default_value = "pgm")]
        col: Attribute,

        #[arg(long, default_value = "throughput")]
        value: Attribute,

        /// mean, min, max or median
        #[arg(long, default_value = "mean")]
        aggregator: Aggregator,

        /// gt (higher wins) or lt (lower wins)
        #[arg(long, default_value = "gt")]
        comparator: Comparator,

        /// Treat cells with |ratio| below this as ties
        #[arg(long)]
        tie: Option<f64>,

        /// Ratio magnitude at which colors saturate
        #[arg(long)]
        max_ratio: Option<f64>,

        /// Workload axis of the charts
        #[arg(long, value_enum, default_value = "insert")]
        plot_on: PlotOn,

        /// Elevation and azimuth of the 3D view, in degrees
        #[arg(long, value_delimiter = ',', num_args = 2, allow_hyphen_values = true, default_values_t = [53.0, -35.0])]
        view_angle: Vec<f64>,

        /// Also write the derived grids as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Throughput against thread count per workload and dataset
    Scalability {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        select: SelectionArgs,

        /// Thread counts on the x axis
        #[arg(long, value_delimiter = ',')]
        threads: Vec<u32>,

        /// Insert ratios, one row of panels each
        #[arg(long, value_delimiter = ',')]
        workloads: Vec<f64>,

        /// Shade the hyper-threading (ht) or second-socket (numa) range
        #[arg(long)]
        shade: Option<Shade>,
    },

    /// Mean memory consumption per index
    Memory {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        select: SelectionArgs,
    },

    /// Tail latency for read-only and write-only workloads
    Latency {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        select: SelectionArgs,

        #[arg(long, default_value = "1")]
        thread_num: u32,
    },

    /// Scanned keys per second by scan length
    Range {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        select: SelectionArgs,

        #[arg(long, default_value = "1")]
        thread_num: u32,
    },

    /// Throughput change on shifted datasets
    Datashift {
        #[command(flatten)]
        io: IoArgs,

        /// Results on the unshifted source datasets
        #[arg(long, required = true, num_args = 1..)]
        original: Vec<PathBuf>,

        #[command(flatten)]
        select: SelectionArgs,

        #[arg(long, default_value = "1")]
        thread_num: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let names = DisplayNames::default();

    match cli.command {
        Commands::Synth {
            output,
            repeats,
            seed,
        } => {
            synthesize(&output, repeats, seed)?;
        }
        Commands::Combat {
            io,
            hardness,
            learned,
            traditional,
            exclude,
            thread_num,
            row,
            col,
            value,
            aggregator,
            comparator,
            tie,
            max_ratio,
            plot_on,
            view_angle,
            json,
        } => {
            let mut config = CombatConfig::for_threads(thread_num);
            if !learned.is_empty() {
                config.learned = learned;
            }
            if !traditional.is_empty() {
                config.traditional = traditional;
            }
            config.row_attr = row;
            config.col_attr = col;
            config.value_attr = value;
            config.aggregator = aggregator;
            config.comparator = comparator;
            config.tie_threshold = tie;

            let (sort_attr, ratio_label) = match plot_on {
                PlotOn::Insert => (Attribute::InsertRatio, "Write Ratio"),
                PlotOn::Delete => (Attribute::DeleteRatio, "Delete Ratio"),
            };
            let options = CombatChartOptions {
                max_ratio,
                view_angle: (view_angle[0], view_angle[1]),
                ratio_label: ratio_label.to_string(),
            };

            let mut table = MeasurementTable::load_all(&io.input)?;
            if let Some(path) = hardness {
                HardnessTable::load(&path)?.attach(
                    &mut table,
                    LOCAL_ERROR_BOUND,
                    GLOBAL_ERROR_BOUND,
                );
            }
            table.exclude_datasets(&exclude);
            let mut table = table.filter(|m| m.thread_num == thread_num);
            table.sort_by(&[sort_attr, config.col_attr]);

            run_combat(&table, &config, &names, &options, &io.output, json.as_deref())?;
        }
        Commands::Scalability {
            io,
            select,
            threads,
            workloads,
            shade,
        } => {
            let table = MeasurementTable::load_all(&io.input)?;
            let config = study_config(select, MT_INDEXES, 1);
            let threads = if threads.is_empty() {
                DEFAULT_THREADS.to_vec()
            } else {
                threads
            };
            let workloads = if workloads.is_empty() {
                DEFAULT_WORKLOADS.to_vec()
            } else {
                workloads
            };
            scalability_chart(&table, &names, &config, &threads, &workloads, shade, &io.output)?;
        }
        Commands::Memory { io, select } => {
            let table = MeasurementTable::load_all(&io.input)?;
            let config = study_config(select, MEMORY_INDEXES, 1);
            memory_chart(&table, &names, &config, &io.output)?;
        }
        Commands::Latency {
            io,
            select,
            thread_num,
        } => {
            let table = MeasurementTable::load_all(&io.input)?;
            let defaults = if thread_num > 1 { MT_INDEXES } else { ST_INDEXES };
            let config = study_config(select, defaults, thread_num);
            latency_charts(&table, &names, &config, &io.output)?;
        }
        Commands::Range {
            io,
            select,
            thread_num,
        } => {
            let table = MeasurementTable::load_all(&io.input)?;
            let config = study_config(select, RANGE_INDEXES, thread_num);
            range_chart(&table, &names, &config, &io.output)?;
        }
        Commands::Datashift {
            io,
            original,
            mut select,
            thread_num,
        } => {
            let shifted = MeasurementTable::load_all(&io.input)?;
            let original = MeasurementTable::load_all(&original)?;
            if select.datasets.is_empty() {
                select.datasets = DEFAULT_SHIFTED.iter().map(|s| s.to_string()).collect();
            }
            let defaults = if thread_num > 1 { MT_INDEXES } else { ST_INDEXES };
            let config = study_config(select, defaults, thread_num);
            datashift_chart(&shifted, &original, &names, &config, &io.output)?;
        }
    }

    Ok(())
}

fn study_config(select: SelectionArgs, default_indexes: &[&str], thread_num: u32) -> StudyConfig {
    let mut config = StudyConfig::new(DEFAULT_STUDY_DATASETS, default_indexes, thread_num);
    if !select.datasets.is_empty() {
        config.datasets = select.datasets;
    }
    if !select.indexes.is_empty() {
        config.indexes = select.indexes;
    }
    config
}

fn synthesize(output_dir: &Path, repeats: usize, seed: u64) -> Result<()> {
    std::fs::create_dir_all(output_dir).context("Failed to create output directory")?;

    let config = SynthConfig {
        repeats,
        seed,
        ..Default::default()
    };
    let all = Generator::new(config).generate_all_with_logging();

    let files = [
        ("results.csv", &all.results),
        ("range.csv", &all.range),
        ("datashift.csv", &all.datashift),
    ];
    for (name, table) in files {
        let path = output_dir.join(name);
        table.save(&path)?;
        println!("  Created: {} ({} rows)", path.display(), table.len());
    }

    let path = output_dir.join("hardness.csv");
    all.hardness.save(&path)?;
    println!(
        "  Created: {} ({} rows)",
        path.display(),
        all.hardness.records.len()
    );
    Ok(())
}

fn run_combat(
    table: &MeasurementTable,
    config: &CombatConfig,
    names: &DisplayNames,
    options: &CombatChartOptions,
    output_dir: &Path,
    json: Option<&Path>,
) -> Result<()> {
    if table.is_empty() {
        bail!("No measurements left after filtering");
    }
    tracing::info!(
        rows = table.len(),
        datasets = table.datasets().len(),
        learned = ?config.learned,
        traditional = ?config.traditional,
        "running combat"
    );

    let combat = Combat::derive(table, config, names).context("Failed to derive combat grid")?;
    print_combat(&combat, names);

    if let Some(path) = json {
        CombatSummary::new(&combat, names).write_json(path)?;
    }

    println!("\nGenerating charts...");
    combat_charts(&combat, names, options, output_dir)?;
    println!("\nCharts saved to: {}", output_dir.display());
    Ok(())
}
