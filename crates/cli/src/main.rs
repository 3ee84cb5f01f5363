use anyhow::{bail, Context as AnyhowContext, Result};
use batchtrace_index::{
    build_index, cache_dir_for_data_root, open_index_dir, BuildStats, ProcessIndex,
};
use batchtrace_model::{EntityKind, TimeMs};
use batchtrace_query::{Catalog, ModificationSearch, Navigator, SensorCorrelator};
use batchtrace_source::{JsonDirSource, MemorySensorTable, SensorReader};
use clap::{Args, Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

/// Fallback data directory when `--data-dir` is absent.
const DATA_PATH_ENV: &str = "BATCHTRACE_DATA_PATH";

#[derive(Parser)]
#[command(name = "batchtrace")]
#[command(about = "Query engine over exported manufacturing batch-trace data", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the exported JSON collections
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Index cache directory (default: <data-dir>/.batchtrace)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Rebuild from source without reading or writing the cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or restore the process index and print its stats
    Index,

    /// Print one record by identifier
    Record(RecordArgs),

    /// List indexed identifiers of one kind
    Ids(KindArgs),

    /// List the descendants of an identifier at one kind
    Children(ChildrenArgs),

    /// List stored modification codes of one kind
    Modifications(KindArgs),

    /// Find records by modification code, oldest first
    Search(SearchArgs),

    /// Slice the sensor table over a record's execution window
    Measures(MeasuresArgs),

    /// Slice the sensor table over an explicit interval
    Interval(IntervalArgs),

    /// List sensors, or one sensor's unit and signal type
    Sensors(SensorsArgs),

    /// List operator badges, or the operators of one step
    Operators(OperatorsArgs),

    /// List the recipe collection
    Recipes,
}

#[derive(Args)]
struct RecordArgs {
    /// Record identifier, e.g. B12.S1.O1
    id: String,
}

#[derive(Args)]
struct KindArgs {
    /// Hierarchical kind: step|sequence|operation|function
    #[arg(long)]
    kind: String,
}

#[derive(Args)]
struct ChildrenArgs {
    /// Ancestor identifier whose subtree to scan
    parent: String,

    /// Kind of the descendants to list
    #[arg(long)]
    kind: String,
}

#[derive(Args)]
struct SearchArgs {
    /// Modification code, matched by suffix unless --exact
    code: String,

    /// Restrict matches to one kind
    #[arg(long)]
    kind: Option<String>,

    /// Match the stored code exactly
    #[arg(long)]
    exact: bool,

    /// Keep only records whose owning step label equals this
    #[arg(long)]
    step: Option<String>,
}

#[derive(Args)]
struct MeasuresArgs {
    /// Record identifier whose execution window to slice
    id: String,

    /// Comma-separated sensor columns (default: all)
    #[arg(long, value_delimiter = ',')]
    sensors: Vec<String>,

    /// Sensor table file (default: <data-dir>/SENSORS.json)
    #[arg(long)]
    table: Option<PathBuf>,
}

#[derive(Args)]
struct IntervalArgs {
    /// Inclusive lower bound, epoch milliseconds (default: open)
    #[arg(long)]
    start: Option<i64>,

    /// Inclusive upper bound, epoch milliseconds (default: open)
    #[arg(long)]
    end: Option<i64>,

    /// Comma-separated sensor columns (default: all)
    #[arg(long, value_delimiter = ',')]
    sensors: Vec<String>,

    /// Sensor table file (default: <data-dir>/SENSORS.json)
    #[arg(long)]
    table: Option<PathBuf>,
}

#[derive(Args)]
struct SensorsArgs {
    /// Report unit and signal type of this sensor instead of all names
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args)]
struct OperatorsArgs {
    /// Step label; list who worked it instead of all badges
    #[arg(long)]
    step: Option<String>,

    /// Report operator full names instead of badges
    #[arg(long, requires = "step")]
    full_names: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let workspace = Workspace::resolve(&cli);

    match cli.command {
        Commands::Index => run_index(&workspace).await?,
        Commands::Record(args) => run_record(&workspace, args).await?,
        Commands::Ids(args) => run_ids(&workspace, args).await?,
        Commands::Children(args) => run_children(&workspace, args).await?,
        Commands::Modifications(args) => run_modifications(&workspace, args).await?,
        Commands::Search(args) => run_search(&workspace, args).await?,
        Commands::Measures(args) => run_measures(&workspace, args).await?,
        Commands::Interval(args) => run_interval(&workspace, args).await?,
        Commands::Sensors(args) => run_sensors(&workspace, args).await?,
        Commands::Operators(args) => run_operators(&workspace, args).await?,
        Commands::Recipes => run_recipes(&workspace).await?,
    }

    Ok(())
}

/// Resolved data layout shared by every subcommand.
struct Workspace {
    data_dir: PathBuf,
    cache_dir: PathBuf,
    no_cache: bool,
}

impl Workspace {
    fn resolve(cli: &Cli) -> Self {
        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| env::var_os(DATA_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| {
                log::warn!("no --data-dir given and {DATA_PATH_ENV} unset, using the current directory");
                PathBuf::from(".")
            });
        let cache_dir = cli
            .cache_dir
            .clone()
            .unwrap_or_else(|| cache_dir_for_data_root(&data_dir));
        Self {
            data_dir,
            cache_dir,
            no_cache: cli.no_cache,
        }
    }

    async fn open_index(&self) -> Result<(Arc<ProcessIndex>, BuildStats)> {
        if self.no_cache {
            let source = self.source();
            let (index, stats) = build_index(&source).await?;
            return Ok((Arc::new(index), stats));
        }
        Ok(open_index_dir(&self.data_dir, &self.cache_dir).await?)
    }

    fn source(&self) -> JsonDirSource {
        JsonDirSource::new(&self.data_dir)
    }

    fn table_path(&self, flag: Option<&PathBuf>) -> PathBuf {
        flag.cloned()
            .unwrap_or_else(|| self.data_dir.join("SENSORS.json"))
    }
}

fn non_empty(sensors: &[String]) -> Option<&[String]> {
    if sensors.is_empty() {
        None
    } else {
        Some(sensors)
    }
}

async fn run_index(ws: &Workspace) -> Result<()> {
    let (_, stats) = ws.open_index().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    eprintln!(
        "{} {} records, {} distinct modification codes in {}ms",
        if stats.restored_from_cache { "Restored" } else { "Indexed" },
        stats.records,
        stats.distinct_codes,
        stats.time_ms
    );
    Ok(())
}

async fn run_record(ws: &Workspace, args: RecordArgs) -> Result<()> {
    let (index, _) = ws.open_index().await?;
    let navigator = Navigator::new(index);
    match navigator.record_by_id(&args.id) {
        Some(record) => println!("{}", serde_json::to_string_pretty(record)?),
        None => bail!("no indexed record with id {:?}", args.id),
    }
    Ok(())
}

async fn run_ids(ws: &Workspace, args: KindArgs) -> Result<()> {
    let kind: EntityKind = args.kind.parse()?;
    let (index, _) = ws.open_index().await?;
    let ids = index.identifiers_of(kind);
    println!("{}", serde_json::to_string_pretty(&ids)?);
    eprintln!("{} {} identifiers", ids.len(), kind);
    Ok(())
}

async fn run_children(ws: &Workspace, args: ChildrenArgs) -> Result<()> {
    let (index, _) = ws.open_index().await?;
    let navigator = Navigator::new(index);
    let children = navigator.elements_under(&args.parent, &args.kind)?;
    println!("{}", serde_json::to_string_pretty(&children)?);
    eprintln!("{} {} records under {}", children.len(), args.kind, args.parent);
    Ok(())
}

async fn run_modifications(ws: &Workspace, args: KindArgs) -> Result<()> {
    let kind: EntityKind = args.kind.parse()?;
    let (index, _) = ws.open_index().await?;
    let codes = index.modification_codes_of(kind);
    println!("{}", serde_json::to_string_pretty(&codes)?);
    eprintln!("{} stored {} codes", codes.len(), kind);
    Ok(())
}

async fn run_search(ws: &Workspace, args: SearchArgs) -> Result<()> {
    let (index, _) = ws.open_index().await?;
    let search = ModificationSearch::new(index);
    let step = args.step.as_deref();
    let matches = match &args.kind {
        Some(kind) => search.ranked(kind.parse()?, &args.code, args.exact, step),
        None => search.ranked_all(&args.code, args.exact, step),
    };
    println!("{}", serde_json::to_string_pretty(&matches)?);
    eprintln!(
        "{} records match {:?} ({})",
        matches.len(),
        args.code,
        if args.exact { "exact" } else { "suffix" }
    );
    Ok(())
}

async fn run_measures(ws: &Workspace, args: MeasuresArgs) -> Result<()> {
    let (index, _) = ws.open_index().await?;
    let record = index
        .record_by_id(&args.id)
        .with_context(|| format!("no indexed record with id {:?}", args.id))?
        .clone();

    let table = MemorySensorTable::load(ws.table_path(args.table.as_ref())).await?;
    let correlator = SensorCorrelator::new(index, Arc::new(table));
    let measures = correlator
        .measures_for(&record, non_empty(&args.sensors))
        .await?;

    println!("{}", serde_json::to_string_pretty(&measures)?);
    match &measures.frame {
        Some(frame) => eprintln!(
            "{} rows x {} columns ({})",
            frame.len(),
            frame.columns.len(),
            measures.state
        ),
        None => eprintln!("measurements withheld ({})", measures.state),
    }
    Ok(())
}

async fn run_interval(ws: &Workspace, args: IntervalArgs) -> Result<()> {
    let table = MemorySensorTable::load(ws.table_path(args.table.as_ref())).await?;
    let frame = table
        .time_query(
            args.start.map(TimeMs),
            args.end.map(TimeMs),
            non_empty(&args.sensors),
        )
        .await?;
    println!("{}", serde_json::to_string_pretty(&frame)?);
    eprintln!("{} rows x {} columns", frame.len(), frame.columns.len());
    Ok(())
}

async fn run_sensors(ws: &Workspace, args: SensorsArgs) -> Result<()> {
    let catalog = Catalog::new(Arc::new(ws.source()));
    match &args.name {
        Some(name) => {
            let unit_type = catalog.sensor_unit_type(name).await?;
            if unit_type.is_empty() {
                bail!("no sensor named {:?}", name);
            }
            println!("{}", serde_json::to_string_pretty(&unit_type)?);
        }
        None => {
            let names = catalog.sensor_names().await?;
            println!("{}", serde_json::to_string_pretty(&names)?);
            eprintln!("{} sensors", names.len());
        }
    }
    Ok(())
}

async fn run_operators(ws: &Workspace, args: OperatorsArgs) -> Result<()> {
    let catalog = Catalog::new(Arc::new(ws.source()));
    let operators = match &args.step {
        Some(step) => catalog.operators_of_step(step, args.full_names).await?,
        None => catalog.operator_badges().await?,
    };
    println!("{}", serde_json::to_string_pretty(&operators)?);
    eprintln!("{} operators", operators.len());
    Ok(())
}

async fn run_recipes(ws: &Workspace) -> Result<()> {
    let catalog = Catalog::new(Arc::new(ws.source()));
    let recipes = catalog.recipes().await?;
    println!("{}", serde_json::to_string_pretty(&recipes)?);
    eprintln!("{} recipes", recipes.len());
    Ok(())
}
