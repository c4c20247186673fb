use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use c45_io::{CsvReader, IoError, PredictionWriter};
use c45_tree::{C45Config, C45Error, Instance, Model, UNKNOWN_CLASS};

#[derive(Parser)]
#[command(name = "c45")]
#[command(about = "C4.5 decision-tree classifier for mixed-type CSV data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for row sampling
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Train a decision tree on a CSV file and save it as JSON
    Train {
        /// Path to the training CSV file
        #[arg(long)]
        input: PathBuf,

        /// Name of the column to predict
        #[arg(long)]
        target: String,

        /// Where to write the model JSON
        #[arg(long)]
        output: PathBuf,

        /// Maximum tree depth
        #[arg(long, default_value_t = 20)]
        max_depth: usize,

        /// Minimum rows a node needs before it may split
        #[arg(long, default_value_t = 2)]
        min_instances: usize,

        /// Columns never used as split features (repeatable)
        #[arg(long, num_args = 1..)]
        exclude: Vec<String>,

        /// Stop reading after this many rows
        #[arg(long)]
        max_rows: Option<usize>,

        /// Keep columns that look like row identifiers
        #[arg(long, default_value_t = false)]
        no_id_detection: bool,
    },

    /// Predict every row of a CSV file with a saved model
    Predict {
        /// Path to the CSV file to score
        #[arg(long)]
        input: PathBuf,

        /// Path to the model JSON written by `train`
        #[arg(long)]
        model: PathBuf,

        /// Where to write the predictions CSV
        #[arg(long)]
        output: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    model: PathBuf,
    target: String,
    n_rows: usize,
    n_instances: usize,
    n_features: usize,
    id_columns: Vec<String>,
    root_feature: Option<String>,
    n_nodes: usize,
    n_leaves: usize,
    depth: usize,
    training_accuracy: f64,
}

#[derive(Serialize)]
struct PredictOutput {
    output: PathBuf,
    target: String,
    n_instances: usize,
    n_unknown: usize,
    mean_confidence: f64,
    /// Present when the input still carries the target column.
    accuracy: Option<f64>,
}

fn accuracy(model: &Model, instances: &[Instance]) -> Option<f64> {
    let target = model.target_name();
    let labelled: Vec<_> = instances
        .iter()
        .filter_map(|row| row.category(target).map(|truth| (row, truth)))
        .collect();
    if labelled.is_empty() {
        return None;
    }
    let correct = labelled
        .iter()
        .filter(|(row, truth)| model.predict_class(row) == *truth)
        .count();
    Some(correct as f64 / labelled.len() as f64)
}

fn run(cli: Cli) -> Result<()> {
    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            input,
            target,
            output,
            max_depth,
            min_instances,
            exclude,
            max_rows,
            no_id_detection,
        } => {
            // 1. Read dataset
            let dataset = CsvReader::new(&input)
                .with_target(target.clone())
                .with_max_rows(max_rows)
                .with_seed(cli.seed)
                .with_id_detection(!no_id_detection)
                .read()
                .context("failed to read training CSV")?;

            // 2. Train
            let config = C45Config::new()
                .with_max_depth(max_depth)
                .with_min_instances_per_leaf(min_instances)
                .with_excluded_features(&exclude);
            let model = config
                .fit(
                    &dataset.instances,
                    &dataset.feature_names,
                    &target,
                    &dataset.feature_types,
                )
                .context("training failed")?;

            // 3. Save model
            model.save(&output).context("failed to save model")?;

            // 4. Print summary
            let summary = TrainOutput {
                model: output,
                n_rows: dataset.n_rows,
                n_instances: dataset.instances.len(),
                n_features: model.feature_names().len(),
                id_columns: dataset.id_columns,
                root_feature: model.root().feature().map(str::to_owned),
                n_nodes: model.n_nodes(),
                n_leaves: model.n_leaves(),
                depth: model.depth(),
                training_accuracy: accuracy(&model, &dataset.instances).unwrap_or(0.0),
                target,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Predict {
            input,
            model,
            output,
        } => {
            // 1. Load model
            let model = Model::load(&model).context("failed to load model")?;
            info!(
                n_nodes = model.n_nodes(),
                depth = model.depth(),
                target = model.target_name(),
                "model loaded"
            );

            // 2. Read input with the model's column types
            let dataset = CsvReader::new(&input)
                .read_for_model(model.feature_types())
                .context("failed to read prediction CSV")?;

            // 3. Predict and write
            let predictions = model.batch_predict(&dataset.instances);
            PredictionWriter::new(&output).write(&predictions)?;

            // 4. Print summary
            let n = predictions.len();
            let summary = PredictOutput {
                output,
                target: model.target_name().to_owned(),
                n_instances: n,
                n_unknown: predictions
                    .iter()
                    .filter(|p| p.label == UNKNOWN_CLASS)
                    .count(),
                mean_confidence: predictions.iter().map(|p| p.confidence).sum::<f64>()
                    / n.max(1) as f64,
                accuracy: accuracy(&model, &dataset.instances),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

/// Log the cause and suggested fix of a library error, if the chain has one.
fn report(err: &anyhow::Error) {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<IoError>() {
            error!(cause = e.cause(), fix = e.suggested_fix(), "{e}");
            return;
        }
        if let Some(e) = cause.downcast_ref::<C45Error>() {
            error!(cause = e.cause(), fix = e.suggested_fix(), "{e}");
            return;
        }
    }
}

fn main() -> ExitCode {
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

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
