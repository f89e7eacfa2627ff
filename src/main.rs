use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use attrition_io::{CleanTable, ResultWriter, RunName, TableReader, charts, clean};
use attrition_rf::{
    HoldoutScore, InputRecord, MaxFeatures, RandomForestConfig, SplitCriterion, TrainerConfig,
};

#[derive(Parser)]
#[command(name = "attrition")]
#[command(about = "Employee attrition classification with a random forest")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for the train/test split and forest bootstraps
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel tree fitting (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Run name for JSON artifact files (must match [a-zA-Z0-9_-]+)
    #[arg(long, global = true)]
    run: Option<String>,

    /// Output directory for artifact files
    #[arg(long, default_value = ".", global = true)]
    output_dir: PathBuf,
}

/// Shared forest tuning parameters.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Number of trees in the forest
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum samples required to split an internal node
    #[arg(long, default_value_t = 2)]
    min_samples_split: usize,

    /// Minimum samples required in each leaf
    #[arg(long, default_value_t = 1)]
    min_samples_leaf: usize,

    /// Features sampled per split: "sqrt", "log2", "all", a fraction, or a count
    #[arg(long, default_value = "sqrt")]
    max_features: String,

    /// Split criterion: "gini" or "entropy"
    #[arg(long, default_value = "gini")]
    criterion: String,

    /// Fraction of rows held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,
}

#[derive(Subcommand)]
enum Command {
    /// Train a forest on an HR CSV and report held-out accuracy
    Train {
        /// Path to the HR CSV file
        #[arg(long, default_value = "data/HR-Employee-Attrition.csv")]
        data: PathBuf,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Train a forest, then score a single employee profile
    Predict {
        /// Path to the HR CSV file
        #[arg(long, default_value = "data/HR-Employee-Attrition.csv")]
        data: PathBuf,

        /// Employee age in years
        #[arg(long, default_value_t = 0.0)]
        age: f64,

        /// Commute distance
        #[arg(long, default_value_t = 0.0)]
        distance_from_home: f64,

        /// Monthly income
        #[arg(long, default_value_t = 0.0)]
        monthly_income: f64,

        /// Number of companies previously worked at
        #[arg(long, default_value_t = 0.0)]
        num_companies_worked: f64,

        /// Total working years across all employers
        #[arg(long, default_value_t = 0.0)]
        total_working_years: f64,

        /// Years at the current company
        #[arg(long, default_value_t = 0.0)]
        years_at_company: f64,

        /// Employee works overtime
        #[arg(long, default_value_t = false)]
        overtime: bool,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Summarize the dataset for plotting: counts, scatter, box plots
    Charts {
        /// Path to the HR CSV file
        #[arg(long, default_value = "data/HR-Employee-Attrition.csv")]
        data: PathBuf,

        /// Feature on the scatter x axis
        #[arg(long, default_value = "Age")]
        x: String,

        /// Feature on the scatter y axis
        #[arg(long, default_value = "MonthlyIncome")]
        y: String,

        /// Feature summarized per class as a box plot
        #[arg(long = "box", default_value = "YearsAtCompany")]
        box_column: String,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    n_rows: usize,
    n_features: usize,
    retained: usize,
    attrition: usize,
    n_trees: usize,
    holdout_accuracy: Option<f64>,
    holdout_n_test: Option<usize>,
}

#[derive(Serialize)]
struct PredictOutput {
    label: usize,
    at_risk: bool,
    holdout_accuracy: Option<f64>,
    inputs: BTreeMap<String, f64>,
}

#[derive(Serialize)]
struct ChartsOutput {
    n_rows: usize,
    counts: charts::TargetCounts,
    scatter: Vec<charts::ScatterPoint>,
    boxes: Vec<charts::BoxSummary>,
}

fn parse_criterion(s: &str) -> Result<SplitCriterion> {
    match s {
        "gini" => Ok(SplitCriterion::Gini),
        "entropy" => Ok(SplitCriterion::Entropy),
        other => anyhow::bail!("unknown criterion: {other} (expected gini or entropy)"),
    }
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s {
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "log2" => Ok(MaxFeatures::Log2),
        "all" => Ok(MaxFeatures::All),
        other => {
            if let Ok(count) = other.parse::<usize>() {
                Ok(MaxFeatures::Fixed(count))
            } else if let Ok(fraction) = other.parse::<f64>() {
                Ok(MaxFeatures::Fraction(fraction))
            } else {
                anyhow::bail!(
                    "unknown max features: {other} (expected sqrt, log2, all, a fraction, or a count)"
                )
            }
        }
    }
}

fn build_trainer(args: &ForestArgs, seed: u64) -> Result<TrainerConfig> {
    let forest = RandomForestConfig::new(args.n_trees)?
        .with_max_features(parse_max_features(&args.max_features)?)
        .with_max_depth(args.max_depth)
        .with_min_samples_split(args.min_samples_split)
        .with_min_samples_leaf(args.min_samples_leaf)
        .with_criterion(parse_criterion(&args.criterion)?)
        .with_seed(seed);
    Ok(TrainerConfig::new(forest)
        .with_test_fraction(args.test_fraction)
        .with_seed(seed))
}

fn load_table(data: &PathBuf) -> Result<CleanTable> {
    let raw = TableReader::new(data)
        .read()
        .context("failed to read input CSV")?;
    let table = clean(&raw).context("failed to clean dataset")?;
    info!(
        n_rows = table.n_rows(),
        n_features = table.n_features(),
        "dataset loaded and encoded"
    );
    Ok(table)
}

fn make_writer(run: &Option<String>, output_dir: &PathBuf) -> Result<Option<ResultWriter>> {
    match run {
        Some(name) => {
            let run_name = RunName::new(name.clone())?;
            Ok(Some(ResultWriter::new(output_dir, run_name)?))
        }
        None => Ok(None),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train { data, forest } => {
            let table = load_table(&data)?;
            let counts = charts::target_counts(&table);

            let trainer = build_trainer(&forest, cli.seed)?;
            let model = trainer
                .fit(table.features(), table.target(), table.feature_names())
                .context("training failed")?;
            info!(
                n_trees = model.forest().n_trees(),
                holdout_accuracy = model.holdout().map(|h| h.accuracy),
                "model trained"
            );

            if let Some(writer) = make_writer(&cli.run, &cli.output_dir)? {
                writer.write_training(
                    table.n_rows(),
                    table.n_features(),
                    counts,
                    model.holdout().map(|h| h.accuracy),
                    model.forest().n_trees(),
                )?;
            }

            let output = TrainOutput {
                n_rows: table.n_rows(),
                n_features: table.n_features(),
                retained: counts.retained,
                attrition: counts.attrition,
                n_trees: model.forest().n_trees(),
                holdout_accuracy: model.holdout().map(|h| h.accuracy),
                holdout_n_test: model.holdout().map(|h| h.n_test),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            data,
            age,
            distance_from_home,
            monthly_income,
            num_companies_worked,
            total_working_years,
            years_at_company,
            overtime,
            forest,
        } => {
            let table = load_table(&data)?;

            let trainer = build_trainer(&forest, cli.seed)?;
            let model = trainer
                .fit(table.features(), table.target(), table.feature_names())
                .context("training failed")?;
            let holdout: Option<HoldoutScore> = model.holdout().copied();

            let record = InputRecord::new()
                .with("Age", age)
                .with("DistanceFromHome", distance_from_home)
                .with("MonthlyIncome", monthly_income)
                .with("NumCompaniesWorked", num_companies_worked)
                .with("TotalWorkingYears", total_working_years)
                .with("YearsAtCompany", years_at_company)
                .with("OverTime_Yes", if overtime { 1.0 } else { 0.0 });

            let predictor = model.into_predictor()?;
            let label = predictor.predict(&record).context("prediction failed")?;
            info!(label, "profile scored");

            if let Some(writer) = make_writer(&cli.run, &cli.output_dir)? {
                writer.write_prediction(label, record.fields())?;
            }

            let output = PredictOutput {
                label,
                at_risk: label == 1,
                holdout_accuracy: holdout.map(|h| h.accuracy),
                inputs: record.fields().clone(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Charts {
            data,
            x,
            y,
            box_column,
        } => {
            let table = load_table(&data)?;

            let counts = charts::target_counts(&table);
            let scatter = charts::scatter(&table, &x, &y)
                .context("failed to build scatter summary")?;
            let boxes = charts::box_by_target(&table, &box_column)
                .context("failed to build box summary")?;

            if let Some(writer) = make_writer(&cli.run, &cli.output_dir)? {
                writer.write_charts(counts, &scatter, &boxes)?;
            }

            let output = ChartsOutput {
                n_rows: table.n_rows(),
                counts,
                scatter,
                boxes,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
