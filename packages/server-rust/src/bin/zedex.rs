//! `zedex` binary: runs the server or populates a local mirror directory.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use zedex_server::mirror::{LocalMirror, MirrorConfig, MirrorSource, RemoteMirror};
use zedex_server::network::{ConnectionConfig, TlsConfig};
use zedex_server::predict::{self, PredictConfig};
use zedex_server::{NetworkConfig, NetworkModule, Services};

/// A self-hosted Zed server.
#[derive(Parser, Debug)]
#[command(name = "zedex", version, about)]
struct Cli {
    /// Enable debug logging for zedex crates.
    #[arg(long, global = true)]
    debug: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the server.
    Serve(ServeArgs),
    /// Fetch the upstream extension index (and optionally every archive).
    GetExtensionIndex(ExtensionIndexArgs),
    /// Fetch the latest release and its notes.
    GetLatestRelease(LatestReleaseArgs),
}

#[derive(Args, Debug)]
struct UpstreamArgs {
    /// Upstream website host.
    #[arg(long, env = "ZED_HOST", default_value = "https://zed.dev")]
    site_host: String,

    /// Upstream extension API host.
    #[arg(long, env = "ZED_API_HOST", default_value = "https://api.zed.dev")]
    api_host: String,

    /// Schema version requested from the upstream index.
    #[arg(long, default_value_t = 1)]
    max_schema_version: i64,
}

impl UpstreamArgs {
    fn mirror_config(&self, local_mode: bool, cache_dir: PathBuf) -> MirrorConfig {
        MirrorConfig {
            api_host: self.api_host.clone(),
            site_host: self.site_host.clone(),
            local_mode,
            cache_dir,
            max_schema_version: self.max_schema_version,
        }
    }
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// Answer edit predictions with an empty excerpt.
    #[arg(long, env = "OPENAI_COMPATIBLE_DISABLE")]
    disable_edit_prediction: bool,

    #[arg(long, env = "OPENAI_COMPATIBLE_ENDPOINT", default_value = predict::DEFAULT_ENDPOINT)]
    llm_endpoint: String,

    #[arg(long, env = "OPENAI_COMPATIBLE_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    #[arg(long, env = "OPENAI_COMPATIBLE_MODEL", default_value = predict::DEFAULT_MODEL)]
    llm_model: String,

    #[arg(long, env = "OPENAI_COMPATIBLE_TEMPERATURE", default_value_t = 0.1)]
    llm_temperature: f32,

    #[arg(long, env = "OPENAI_COMPATIBLE_SYSTEM_PROMPT")]
    llm_system_prompt: Option<String>,

    /// Upstream completion requests allowed in flight at once.
    #[arg(long, default_value_t = 1)]
    llm_concurrency: usize,

    /// Cached predictions kept.
    #[arg(long, default_value_t = 1024)]
    prediction_cache_size: usize,
}

impl PredictArgs {
    fn config(&self) -> PredictConfig {
        PredictConfig {
            endpoint: self.llm_endpoint.clone(),
            api_key: self.llm_api_key.clone(),
            model: self.llm_model.clone(),
            temperature: self.llm_temperature,
            system_prompt: self
                .llm_system_prompt
                .clone()
                .unwrap_or_else(|| predict::DEFAULT_SYSTEM_PROMPT.to_string()),
            max_concurrent_requests: self.llm_concurrency,
            cache_capacity: self.prediction_cache_size,
            disabled: self.disable_edit_prediction,
        }
    }
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Serve the extension index, archives and releases from `--cache-dir`.
    #[arg(long)]
    local_mode: bool,

    #[arg(long, default_value = ".zedex-cache")]
    cache_dir: PathBuf,

    /// Externally visible base URL, used when redirecting `/rpc`.
    #[arg(long, env = "ZEDEX_PUBLIC_URL")]
    public_url: Option<String>,

    /// Largest inbound RPC frame accepted, in bytes.
    #[arg(long, default_value_t = 1024 * 1024)]
    max_frame_size: usize,

    /// Expect zstd-compressed inbound RPC frames.
    #[arg(long)]
    inbound_compression: bool,

    /// zstd level for outbound RPC frames.
    #[arg(long, default_value_t = zedex_core::codec::DEFAULT_COMPRESSION_LEVEL)]
    compression_level: i32,

    /// Expose Prometheus metrics on this address.
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,

    #[arg(long, requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    #[arg(long, requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    #[command(flatten)]
    upstream: UpstreamArgs,

    #[command(flatten)]
    predict: PredictArgs,
}

impl ServeArgs {
    fn network_config(&self) -> NetworkConfig {
        let tls = match (&self.tls_cert, &self.tls_key) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            }),
            _ => None,
        };
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            tls,
            connection: ConnectionConfig {
                max_frame_size: self.max_frame_size,
                compression_level: self.compression_level,
                inbound_compression: self.inbound_compression,
                ..ConnectionConfig::default()
            },
            ..NetworkConfig::default()
        }
    }
}

#[derive(Args, Debug)]
struct ExtensionIndexArgs {
    #[arg(long, default_value = ".zedex-cache")]
    output_dir: PathBuf,

    /// Also download every extension archive.
    #[arg(long)]
    download_all: bool,

    #[command(flatten)]
    upstream: UpstreamArgs,
}

#[derive(Args, Debug)]
struct LatestReleaseArgs {
    #[arg(long, default_value = ".zedex-cache")]
    output_dir: PathBuf,

    #[command(flatten)]
    upstream: UpstreamArgs,
}

fn init_tracing(debug: bool, format: LogFormat) {
    let default_filter = if debug {
        "info,zedex=debug,zedex_server=debug,zedex_core=debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            error!(error = %e, "failed to listen for ctrl-c; shutdown only by process kill");
            std::future::pending::<()>().await;
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus exporter")?;
        info!(%addr, "prometheus exporter listening");
    }

    let mirror = args
        .upstream
        .mirror_config(args.local_mode, args.cache_dir.clone());
    let services = Services::new(mirror, &args.predict.config(), args.public_url.clone());
    let mut module = NetworkModule::new(args.network_config(), services);

    let port = module.start().await?;
    info!(
        port,
        local_mode = args.local_mode,
        edit_prediction = !args.predict.disable_edit_prediction,
        "zedex listening"
    );
    module.serve(shutdown_signal()).await
}

async fn get_extension_index(args: ExtensionIndexArgs) -> Result<()> {
    let config = args.upstream.mirror_config(false, args.output_dir.clone());
    let remote = RemoteMirror::new(&config, reqwest::Client::new());
    let local = LocalMirror::new(&args.output_dir);

    let index = remote
        .extension_index()
        .await
        .context("failed to fetch extension index")?;
    local.store_extension_index(&index).await?;
    info!(count = index.len(), dir = %args.output_dir.display(), "stored extension index");

    if args.download_all {
        let mut failed = 0usize;
        for extension in &index.0 {
            match remote.extension_archive(&extension.id).await {
                Ok(archive) => {
                    local.store_extension_archive(&extension.id, &archive).await?;
                    info!(id = %extension.id, bytes = archive.len(), "stored archive");
                }
                Err(e) => {
                    failed += 1;
                    warn!(id = %extension.id, error = %e, "skipping archive");
                }
            }
        }
        info!(total = index.len(), failed, "archive download finished");
    }
    Ok(())
}

async fn get_latest_release(args: LatestReleaseArgs) -> Result<()> {
    let config = args.upstream.mirror_config(false, args.output_dir.clone());
    let remote = RemoteMirror::new(&config, reqwest::Client::new());
    let local = LocalMirror::new(&args.output_dir);

    let release = remote
        .latest_release()
        .await
        .context("failed to fetch latest release")?;
    let notes = remote
        .latest_release_notes()
        .await
        .context("failed to fetch release notes")?;
    local.store_latest_release(&release).await?;
    local.store_latest_release_notes(&notes).await?;
    info!(
        version = release.version().unwrap_or("unknown"),
        dir = %args.output_dir.display(),
        "stored latest release"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.log_format);

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::GetExtensionIndex(args) => get_extension_index(args).await,
        Command::GetLatestRelease(args) => get_latest_release(args).await,
    }
}
