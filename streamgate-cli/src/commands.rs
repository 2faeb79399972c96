//! CLI command implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::Subcommand;
use streamgate_core::remote::DEFAULT_DISPLAY_NAME;
use streamgate_core::tracing_setup::{CliLogLevel, init_tracing};
use streamgate_core::{LinkBuilder, ObjectHandle, RemoteObjectClient, StreamgateConfig};
use streamgate_sim::{DirectoryObjectClient, InMemoryObjectClient};
use tracing::{info, warn};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the streaming server
    Serve {
        /// Host to bind to (overrides STREAMGATE_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides STREAMGATE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
        /// Serve the files of this directory as numbered objects
        #[arg(long)]
        media_dir: Option<PathBuf>,
        /// Console log level
        #[arg(long, value_enum, default_value = "info")]
        log_level: CliLogLevel,
    },
    /// Print the watch and download links for an object
    Link {
        /// Numeric object handle
        handle: String,
        /// File name carried in the download link
        #[arg(short, long)]
        name: Option<String>,
        /// Look the name up in this media directory when `--name` is absent
        #[arg(long)]
        media_dir: Option<PathBuf>,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the failure of the command that ran
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve {
            host,
            port,
            media_dir,
            log_level,
        } => serve(host, port, media_dir, log_level).await,
        Commands::Link {
            handle,
            name,
            media_dir,
        } => print_links(&handle, name, media_dir.as_deref()).await,
    }
}

/// Start the HTTP server in front of the selected backend
///
/// # Errors
/// - Tracing cannot be initialized
/// - The media directory cannot be scanned
/// - The server fails to bind or exits with an error
pub async fn serve(
    host: Option<String>,
    port: Option<u16>,
    media_dir: Option<PathBuf>,
    log_level: CliLogLevel,
) -> anyhow::Result<()> {
    let config = server_config(StreamgateConfig::from_env(), host, port);
    init_tracing(log_level.into(), &config.logging).context("failed to initialize logging")?;

    if let Err(e) = config.validate_public_links() {
        warn!("{e}; set STREAMGATE_PUBLIC_HOST before sharing links");
    }

    let client: Arc<dyn RemoteObjectClient> = match media_dir {
        Some(dir) => {
            let store = DirectoryObjectClient::scan(&dir)
                .await
                .with_context(|| format!("failed to scan media directory {}", dir.display()))?;
            info!(
                "Serving {} files from {}",
                store.entries().len(),
                store.root().display()
            );
            Arc::new(store)
        }
        None => {
            warn!("No media directory given; every handle will return 404");
            Arc::new(InMemoryObjectClient::new())
        }
    };

    streamgate_web::run_server(config, client)
        .await
        .context("server stopped with an error")
}

/// Print shareable links for `handle`
///
/// # Errors
/// - The handle is not a positive integer
/// - The media directory cannot be scanned
pub async fn print_links(
    handle: &str,
    name: Option<String>,
    media_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let handle: ObjectHandle = handle.parse()?;
    let config = StreamgateConfig::from_env();
    if let Err(e) = config.validate_public_links() {
        eprintln!("Warning: {e}");
    }

    let name = match (name, media_dir) {
        (Some(name), _) => name,
        (None, Some(dir)) => lookup_name(dir, handle).await?,
        (None, None) => DEFAULT_DISPLAY_NAME.to_string(),
    };

    let links = LinkBuilder::new(config.server.base_url());
    println!("Watch:    {}", links.watch_url(handle));
    println!("Download: {}", links.download_url(handle, &name));

    Ok(())
}

fn server_config(
    mut config: StreamgateConfig,
    host: Option<String>,
    port: Option<u16>,
) -> StreamgateConfig {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config
}

async fn lookup_name(dir: &Path, handle: ObjectHandle) -> anyhow::Result<String> {
    let store = DirectoryObjectClient::scan(dir)
        .await
        .with_context(|| format!("failed to scan media directory {}", dir.display()))?;

    store
        .entries()
        .iter()
        .find(|entry| entry.handle == handle)
        .map(|entry| entry.name.clone())
        .ok_or_else(|| anyhow!("no file with handle {handle} in {}", dir.display()))
}
