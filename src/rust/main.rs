use std::io;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use shipclass::config::{Cli, ClientArgs, Command, GenerateArgs, ServeArgs, TrainArgs};
use shipclass::dataset::{self, DatasetConfig};
use shipclass::training::{self, TrainingConfig};
use shipclass::{client, ApiServer, ArtifactPaths, PredictClient, PredictionService};

async fn serve(args: ServeArgs) -> Result<()> {
    let addr = args.socket_addr()?;
    let paths: ArtifactPaths = args.artifacts.into();

    let mut service = PredictionService::new(paths);
    if let Err(e) = service.load() {
        // Keep serving: /health reports the failure and /predict answers 503
        error!("Starting without a usable model: {}", e);
    }

    let handle = ApiServer::new(addr, Arc::new(service)).start().await?;
    info!("Press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down...");
    handle.shutdown().await
}

async fn predict(args: ClientArgs) -> Result<()> {
    let client = PredictClient::new(args.url).context("Failed to build HTTP client")?;
    let stdin = io::stdin();
    client::run_interactive(&client, stdin.lock(), io::stdout())
        .await
        .context("Client session failed")
}

fn generate(args: GenerateArgs) -> Result<()> {
    let config = DatasetConfig {
        rows: args.rows,
        seed: args.seed,
        ..Default::default()
    };

    info!("Generating {} rows with seed {}...", config.rows, config.seed);
    let records = dataset::generate(&config)?;
    dataset::write_csv(&args.output, &records)
        .with_context(|| format!("Failed to write dataset to {:?}", args.output))?;

    info!("Dataset saved to {:?}", args.output);
    for (product, count) in dataset::class_distribution(&records) {
        info!("  {}: {} ({:.1}%)", product, count, count as f64 * 100.0 / records.len() as f64);
    }
    Ok(())
}

fn train(args: TrainArgs) -> Result<()> {
    let start_time = Instant::now();
    info!("Loading dataset from {:?}...", args.data);
    let records = dataset::read_csv(&args.data)
        .with_context(|| format!("Failed to read dataset from {:?}", args.data))?;
    info!("Loaded {} rows", records.len());

    let config = TrainingConfig {
        test_size: args.test_size,
        seed: args.seed,
        max_depth: Some(args.max_depth),
    };
    let paths: ArtifactPaths = args.artifacts.into();
    let report = training::train_and_save(&records, &config, &paths)?;

    println!("Train accuracy: {:.4}", report.train_accuracy);
    println!("Test accuracy:  {:.4}", report.test_accuracy);
    println!("Tree depth: {}, leaves: {}", report.tree_depth, report.n_leaves);
    println!("Package sizes: {:?}", report.package_sizes);
    println!("Product types: {:?}", report.product_types);
    println!("Model saved to {:?}", paths.model);

    info!("=== Training complete (took {:.2?}) ===", start_time.elapsed());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    shipclass::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Predict(args) => predict(args).await,
        Command::Generate(args) => generate(args),
        Command::Train(args) => train(args),
    }
}
