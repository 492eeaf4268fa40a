mod audit;
mod config;
mod jail;
mod listener;
mod seed;
mod shell;
mod throttle;
mod transport;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::audit::AuditSink;
use crate::config::Config;
use crate::jail::Jail;
use crate::transport::SessionBootstrap;

fn print_help() {
    println!(
        "\
mireshell v{}

A deception shell endpoint. Presents what looks like administrative
access to a server while confining every interaction to a jailed
synthetic filesystem and recording credentials and commands.

USAGE:
    mireshell [OPTIONS] [CONFIG_PATH]

ARGUMENTS:
    CONFIG_PATH    Path to TOML configuration file [default: config/mireshell.toml]

OPTIONS:
    -h, --help       Print this help message and exit
    -V, --version    Print version and exit

ENVIRONMENT VARIABLES:
    Variables are referenced in the config file via ${{VAR_NAME}} syntax.

    RUST_LOG    Log level filter for tracing
                (e.g. debug, mireshell=debug,warn)

EXAMPLES:
    mireshell                            # uses config/mireshell.toml
    mireshell /etc/mireshell/prod.toml   # custom config path
    RUST_LOG=debug mireshell             # with debug logging",
        env!("CARGO_PKG_VERSION"),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --help / --version before anything else
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("mireshell v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {}
        }
    }

    // Initialize logging (RUST_LOG=debug for debug mode)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mireshell=info")),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/mireshell.toml".to_string());

    info!("Loading configuration from {config_path}");
    let config = Config::load(&config_path)?;

    info!("Bind address: {}:{}", config.server.host, config.server.port);
    info!("Sandbox root: {}", config.sandbox.root.display());
    info!("Prompt identity: {}", config.sandbox.prompt().trim_end());
    info!(
        "Throttle: {}ms initial, +{}ms per command, {}ms ceiling",
        config.throttle.initial_ms, config.throttle.increment_ms, config.throttle.max_ms
    );
    info!(
        "Audit logs under {} (rotate at {} bytes, {} backups)",
        config.audit.dir.display(),
        config.audit.max_bytes,
        config.audit.backups
    );

    // Provision the decoy tree, then wire up the shared pieces: one
    // jail, one audit sink, one bootstrap for every connection.
    seed::provision(&config.sandbox.root).await?;
    let jail = Arc::new(Jail::new(
        config.sandbox.root.clone(),
        &config.sandbox.home,
    ));
    let sink = Arc::new(AuditSink::open(&config.audit));
    let server = config.server.clone();
    let bootstrap = Arc::new(SessionBootstrap::new(config, jail, sink.clone()));

    tokio::select! {
        result = listener::run(&server, bootstrap, sink) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, exiting");
            Ok(())
        }
    }
}
