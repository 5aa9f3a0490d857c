use std::sync::Arc;

use clap::Parser;
use medbot_core::MedbotConfig;
use tracing_subscriber::{fmt, EnvFilter};

use medbot_server::subsystems::providers;
use medbot_server::Assistant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "medbot.toml")]
    config: String,

    /// Load the corpus, build the index, print a status report and exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // GEMINI_API_KEY may come from a local .env
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match MedbotConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.service.log_level.as_str()));
    fmt().with_env_filter(filter).init();

    let embedder = providers::create_embedding_backend(&config)?;
    let generator = providers::create_generation_backend(&config)?;
    tracing::info!(
        embedding = embedder.name(),
        model = embedder.model(),
        generation = generator.name(),
        "Providers ready"
    );

    let assistant = Arc::new(Assistant::bootstrap(config, embedder, generator).await);

    if args.health {
        let stats = assistant.stats();
        println!("✅ Corpus loaded: {} records", stats.records);
        for (kind, count) in &stats.counts {
            println!("   {:<10} {}", kind, count);
        }
        println!(
            "✅ Index built: {} entries ({} from cache, {} skipped)",
            stats.indexed, stats.cache_hits, stats.skipped
        );
        println!(
            "✅ Embeddings: {} / {}",
            stats.embedding_backend, stats.embedding_model
        );
        println!("✅ Generation: {}", stats.generation_backend);
        if stats.records == 0 {
            println!("❌ No corpus records found");
            std::process::exit(1);
        }
        return Ok(());
    }

    if !assistant.config().http.enabled {
        tracing::warn!("HTTP API disabled in config, nothing to serve");
        return Ok(());
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    medbot_server::http::start_http_server(assistant, shutdown).await
}
