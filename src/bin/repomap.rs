use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use repomap_service::settings::{Settings, CLIENT_API_KEY_ENV};

#[derive(Parser)]
#[command(author, version = "0.1.0", about, long_about = None)]
#[command(propagate_version = true)]
#[command(disable_version_flag = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ServiceArgs {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Accepted API key; repeatable, comma separated lists allowed
    /// (overrides REPOMAP_API_KEYS environment variable)
    #[arg(short = 'k', long = "api-key")]
    api_keys: Vec<String>,

    /// Directory in which per-request clones are created
    /// Defaults to system temp directory if not specified
    #[arg(short = 'w', long = "work-dir")]
    work_dir: Option<PathBuf>,

    /// Command line of the mapping engine executable
    /// (overrides REPOMAP_ENGINE_COMMAND environment variable)
    #[arg(short = 'e', long = "engine-command")]
    engine_command: Option<String>,
}

impl ServiceArgs {
    fn settings(&self) -> Settings {
        Settings::resolve(
            self.api_keys.clone(),
            self.work_dir.clone(),
            self.engine_command.clone(),
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server in stdin/stdout mode
    Stdio {
        #[command(flatten)]
        service: ServiceArgs,

        /// API key presented on behalf of the MCP client
        /// (overrides REPOMAP_CLIENT_API_KEY environment variable)
        #[arg(long = "client-api-key")]
        client_api_key: Option<String>,
    },
    /// Run the HTTP API server
    Http {
        /// Address to bind the HTTP server to
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        address: String,

        #[command(flatten)]
        service: ServiceArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Stdio {
            service,
            client_api_key,
        } => run_stdio_server(service, client_api_key).await,
        Commands::Http { address, service } => run_http_server(address, service).await,
    }
}

async fn run_stdio_server(args: ServiceArgs, client_api_key: Option<String>) -> Result<()> {
    // Initialize the tracing subscriber with stderr logging
    let level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr) // stdout carries the MCP protocol
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .init();

    tracing::info!("Starting repository map server in STDIN/STDOUT mode");

    let settings = args.settings();
    tracing::info!("Using work directory: {}", settings.work_dir.display());
    let service = settings.build_service()?;

    let credential = client_api_key.or_else(|| std::env::var(CLIENT_API_KEY_ENV).ok());
    if credential.is_none() {
        tracing::warn!(
            "No client API key given; tool calls will be rejected. Pass --client-api-key or set {}",
            CLIENT_API_KEY_ENV
        );
    }

    repomap_service::transport::stdio::run_stdio_server(service, credential)
        .await
        .map_err(|e| anyhow::anyhow!("Error running STDIO server: {}", e))
}

async fn run_http_server(address: String, args: ServiceArgs) -> Result<()> {
    // Setup tracing
    let level = if args.debug { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},{}", level, env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_ansi(false)) // Disable ANSI color codes
        .init();

    // Parse socket address
    let addr: SocketAddr = address.parse()?;

    let settings = args.settings();
    tracing::info!("Using work directory: {}", settings.work_dir.display());
    let service = settings.build_service()?;

    tracing::info!(
        "Generate maps with POST http://{}/api/v1/repomap/generate",
        addr
    );

    let app = repomap_service::transport::http_server::HttpServerApp::new(addr, service);
    app.serve().await?;

    Ok(())
}
