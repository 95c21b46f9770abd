use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "kanjo-server")]
#[command(author, version, about = "Japanese sentiment classification service", long_about = None)]
pub struct Cli {
    /// Configuration file path (optional; defaults apply when missing)
    #[arg(short, long, env = "KANJO_CONFIG", default_value = "kanjo.yaml")]
    pub config: String,

    /// Model identifier: HuggingFace repository or local directory
    #[arg(short, long, env = "KANJO_MODEL")]
    pub model: Option<String>,

    /// HuggingFace revision of the model
    #[arg(long, env = "KANJO_MODEL_REVISION")]
    pub revision: Option<String>,

    /// Inference device: cpu, cuda or metal
    #[arg(long, env = "KANJO_DEVICE")]
    pub device: Option<String>,

    /// Listen address
    #[arg(short = 'H', long, env = "KANJO_HOST")]
    pub host: Option<String>,

    /// Listen port
    #[arg(short = 'P', long, env = "KANJO_PORT")]
    pub port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long, env = "KANJO_DEBUG")]
    pub debug: bool,

    /// Load the model at startup instead of on the first request
    #[arg(long, env = "KANJO_EAGER_LOAD")]
    pub eager_load: bool,

    /// Expose Prometheus metrics on /metrics
    #[arg(long, env = "KANJO_METRICS")]
    pub metrics: bool,
}
