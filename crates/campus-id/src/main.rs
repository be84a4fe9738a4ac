//! Campus-ID authorization server - entry point.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use campus_id::config::Config;
use campus_id::server::create_router;
use campus_id::store::OAuthStore;

#[derive(Parser, Debug)]
#[command(name = "campus-id")]
#[command(about = "OAuth 2.0 authorization server for campus identity profiles")]
#[command(version)]
struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, default_value = "127.0.0.1:8080", env = "BIND_ADDR")]
    bind: String,

    /// Public base URL of this server
    #[arg(long, env = "BASE_URL")]
    base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    let mut config = Config::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind = %cli.bind,
        base_url = %config.base_url,
        admins = config.admin_users.len(),
        "Starting campus-id authorization server"
    );

    let store = OAuthStore::new();
    let app = create_router(store, config);

    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
