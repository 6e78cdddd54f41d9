use clap::{Parser, Subcommand};
use memokv::CacheContext;
use serde_json::Value;
use shared::config::{Backend, StoreConfig};
use shared::TtlSecs;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Inspect and edit a namespaced cache
#[derive(Parser, Debug)]
#[command(name = "memokv", version)]
struct Cli {
    /// Store host [env: MEMOKV_HOST, default 127.0.0.1]
    #[arg(long)]
    host: Option<String>,

    /// Store port [env: MEMOKV_PORT, default 6379]
    #[arg(long)]
    port: Option<u16>,

    /// Key prefix [env: MEMOKV_NAMESPACE]
    #[arg(long, short = 'n')]
    namespace: Option<String>,

    /// `redis` or `memory` [env: MEMOKV_BACKEND]
    #[arg(long)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the value stored under a key
    Get { key: String },
    /// Store a value; text that is not JSON is stored as a JSON string
    Set {
        key: String,
        value: String,
        /// Expiry in seconds
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Delete a key
    Del { key: String },
    /// Delete every key matching a glob pattern
    Flush { pattern: String },
}

impl Cli {
    fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::from_env();
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(namespace) = &self.namespace {
            config.options.namespace = namespace.clone();
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        config
    }
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables
    match dotenvy::dotenv() {
        Ok(_) => debug!("Loaded environment variables from .env file"),
        Err(_) => debug!("No .env file found, using system environment variables"),
    }

    let cli = Cli::parse();
    let config = cli.store_config();
    if config.backend == Backend::Memory {
        info!("Using the in-process backend; nothing outlives this command");
    }

    let connector = storage_engine::connector_for(config.backend)?;
    let ctx = CacheContext::new(config);
    ctx.open(connector.as_ref()).await?;

    let outcome = run(&ctx, cli.command).await;
    ctx.close().await?;
    outcome
}

async fn run(ctx: &CacheContext, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Get { key } => match ctx.get::<Value>(&key).await? {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => println!("(nil)"),
        },
        Command::Set { key, value, ttl } => {
            let ttl = ttl.and_then(TtlSecs::non_zero);
            ctx.set(&key, &parse_value(&value), ttl).await?;
            println!("OK");
        }
        Command::Del { key } => {
            let removed = ctx.del(&key).await?;
            println!("{}", u8::from(removed));
        }
        Command::Flush { pattern } => {
            let deleted = ctx.flush(&pattern).await?;
            println!("{}", deleted);
        }
    }
    Ok(())
}
