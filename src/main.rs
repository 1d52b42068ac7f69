use std::path::PathBuf;

use anyhow::Context;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use property_locator::{init_tracing, AppConfig, Property, PropertyLocator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = AppConfig::from_env();
    let input = std::env::args_os().nth(1).map(PathBuf::from);

    let raw = match &input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("failed to read properties from stdin")?;
            buffer
        }
    };
    let properties: Vec<Property> =
        serde_json::from_str(&raw).context("properties must be a JSON array")?;

    let locator = PropertyLocator::from_config(config)?;
    info!(count = properties.len(), "resolving property locations");
    let report = locator.report(&properties).await;

    if let Some(path) = &locator.config().diagnostics_file {
        match locator.resolver().diagnostics().flush_to(path) {
            Ok(written) => info!(written, path = %path.display(), "flushed geocode diagnostics"),
            Err(err) => warn!(?err, "failed to flush geocode diagnostics"),
        }
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
