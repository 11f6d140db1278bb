//! Command line and environment settings.
//!
//! Every option can be given as a flag or through the environment variable
//! named next to it; flags win over the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::artifacts::{
    ArtifactPaths, DEFAULT_MODEL_PATH, DEFAULT_SIZE_ENCODER_PATH, DEFAULT_TYPE_ENCODER_PATH,
};
use crate::client::DEFAULT_API_URL;

#[derive(Parser, Debug)]
#[command(author, version, about = "Predicts product types from package weight and size", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the artifacts and serve predictions over HTTP
    Serve(ServeArgs),
    /// Interactive client for a running server
    Predict(ClientArgs),
    /// Write a synthetic shipping dataset as CSV
    Generate(GenerateArgs),
    /// Fit encoders and model on a dataset and save the artifacts
    Train(TrainArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ArtifactArgs {
    /// Serialized decision tree
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,
    /// Serialized package-size encoder
    #[arg(long, env = "SIZE_ENCODER_PATH", default_value = DEFAULT_SIZE_ENCODER_PATH)]
    pub size_encoder_path: PathBuf,
    /// Serialized product-type encoder
    #[arg(long, env = "TYPE_ENCODER_PATH", default_value = DEFAULT_TYPE_ENCODER_PATH)]
    pub type_encoder_path: PathBuf,
}

impl From<ArtifactArgs> for ArtifactPaths {
    fn from(args: ArtifactArgs) -> Self {
        ArtifactPaths::new(args.model_path, args.size_encoder_path, args.type_encoder_path)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "SHIPCLASS_HOST", default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, env = "SHIPCLASS_PORT", default_value_t = 5000)]
    pub port: u16,
    #[command(flatten)]
    pub artifacts: ArtifactArgs,
}

impl ServeArgs {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address '{}': {}", addr, e))
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Full URL of the predict endpoint
    #[arg(long, env = "SHIPCLASS_API_URL", default_value = DEFAULT_API_URL)]
    pub url: String,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Output CSV file
    #[arg(short, long, default_value = "dataset/synthetic_shipping_data.csv")]
    pub output: PathBuf,
    #[arg(long, default_value_t = 5000)]
    pub rows: usize,
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Input CSV produced by `generate`
    #[arg(short, long, default_value = "dataset/synthetic_shipping_data.csv")]
    pub data: PathBuf,
    /// Fraction of rows held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    pub test_size: f64,
    #[arg(long, default_value_t = 1)]
    pub seed: u64,
    #[arg(long, default_value_t = 5)]
    pub max_depth: usize,
    #[command(flatten)]
    pub artifacts: ArtifactArgs,
}
