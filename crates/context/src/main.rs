//! Cityscope Context Engine CLI
//!
//! Builds one scenario packet for the query given on the command line and
//! prints it as JSON. Thin plumbing: all behavior lives in the library
//! crates.

use cityscope_common::{config::AppConfig, embeddings, index, VERSION};
use cityscope_context::PacketAssembler;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("Starting Cityscope Context Engine v{}", VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.is_empty() {
        eprintln!("usage: context <scenario query>");
        std::process::exit(2);
    }

    let embedder = embeddings::create_embedder(&config.embedding)?;
    let index = index::create_index(&config.index)?;
    let assembler = PacketAssembler::new(&config, embedder, index);

    let packet = assembler.build_packet(&query).await?;
    println!("{}", serde_json::to_string_pretty(&packet)?);

    Ok(())
}
