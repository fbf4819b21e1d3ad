use compose_redeploy::DeployConfig;
use compose_redeploy::deploy::Deployer;
use compose_redeploy::error::RedeployError;
use std::fs;
use std::path::Path;
use tracing::{self, error, info};

const DEFAULT_CONFIG_PATH: &str = "redeploy_config.toml";

/// Load and parse the configuration file, falling back to defaults when the
/// file does not exist.
fn load_config(path: &str) -> Result<DeployConfig, RedeployError> {
    if !Path::new(path).exists() {
        return Ok(DeployConfig::default());
    }

    let config_str = fs::read_to_string(path)?;
    let config: DeployConfig = toml::from_str(&config_str)?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config_path =
        std::env::var("REDEPLOY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config: DeployConfig = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config '{}': {}", config_path, e);
            std::process::exit(1);
        }
    };

    let deployer = match Deployer::new(config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Startup error: {}", e);
            std::process::exit(1);
        }
    };

    let summary = deployer.run().await;

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize run summary: {}", e),
    }

    if summary.skipped {
        info!("Run {} skipped: change set undetermined", summary.run_id);
    } else {
        info!(
            "Run {} finished: {} deployed, {} failed",
            summary.run_id,
            summary.deployed.len(),
            summary.failed.len()
        );
    }

    std::process::exit(if summary.success { 0 } else { 1 });
}
