use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use penguin_flow::{WorkflowConfig, training_workflow};

/// Train and score a penguin species classifier.
#[derive(Parser)]
#[command(name = "penguin-flow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run the penguin training workflow locally", long_about = None)]
struct Cli {
    /// Workflow config (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset file (.csv, .json or .parquet)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Inverse regularisation strength
    #[arg(long = "c")]
    c: Option<f64>,

    /// Gradient-descent iteration limit
    #[arg(long)]
    max_iter: Option<usize>,

    /// Fraction of rows held out for testing
    #[arg(long)]
    test_size: Option<f64>,

    /// Seed for the train/test shuffle
    #[arg(long)]
    random_state: Option<u64>,

    /// Write the fitted model as JSON
    #[arg(long)]
    save_model: Option<PathBuf>,

    /// Print per-stage timings
    #[arg(long)]
    report: bool,
}

impl Cli {
    fn workflow_config(&self) -> Result<WorkflowConfig> {
        let mut config = match &self.config {
            Some(path) => WorkflowConfig::from_file(path)?,
            None => WorkflowConfig::default(),
        };
        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if let Some(c) = self.c {
            config.hyperparameters.c = c;
        }
        if let Some(max_iter) = self.max_iter {
            config.hyperparameters.max_iter = max_iter;
        }
        if let Some(test_size) = self.test_size {
            config.test_size = test_size;
        }
        if let Some(random_state) = self.random_state {
            config.random_state = random_state;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.workflow_config()?;
    log::debug!("{config:?}");

    let output = training_workflow(&config)?;
    println!("{output}");

    if cli.report {
        println!("train rows: {}, test rows: {}", output.n_train, output.n_test);
        for report in &output.reports {
            println!(
                "  [{}] {:<16} {:>10.3?}",
                report.level, report.stage, report.duration
            );
        }
    }

    if let Some(path) = &cli.save_model {
        let json = serde_json::to_string_pretty(&output.model).context("serialising model")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing model to {}", path.display()))?;
        log::info!("Saved model to {}", path.display());
    }

    Ok(())
}
