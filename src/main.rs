use album_server::config::{self, BackendKind, ServerConfig};
use album_server::id::IdGenerator;
use album_server::{output, server};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "album_server=info,tower_http=info";

/// Flags that only matter when serving.
#[derive(clap::Args, Clone, Default)]
struct ServeArgs {
    /// Address to bind (overrides server.host)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides server.port)
    #[arg(long)]
    port: Option<u16>,

    /// Thumbnail backend (overrides thumbnails.backend)
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,
}

#[derive(Parser)]
#[command(name = "album-server")]
#[command(about = "Photo album HTTP backend with on-demand thumbnails")]
#[command(long_about = "\
Photo album HTTP backend with on-demand thumbnails

Scans a directory tree for .jpg/.jpeg/.png/.gif files once at startup and
serves them over HTTP:

  GET /photos?from=0&max=10      paginated photo ids (max: 10, 20 or 30)
  GET /photos/{id}               name, dimensions, size on disk, urls
  GET /d/{id}                    original file
  GET /thumbs/{id}?d=50          thumbnail, longer side 50, 150 or 250

The first thumbnail generated for a photo is kept for the lifetime of the
process, whatever size later requests ask for.

Settings come from album-server.toml (or --config), overridden by the
STATIC_PATH and THUMBS_PATH environment variables and command-line flags.
Log verbosity follows RUST_LOG.

Run 'album-server gen-config' to generate a documented album-server.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./album-server.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Photo root directory (overrides paths.photos)
    #[arg(long, env = "STATIC_PATH", global = true)]
    photos: Option<PathBuf>,

    /// Thumbnail output directory (overrides paths.thumbnails)
    #[arg(long, env = "THUMBS_PATH", global = true)]
    thumbnails: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone)]
enum Command {
    /// Scan the photo root and serve it over HTTP (the default)
    Serve(ServeArgs),
    /// Scan the photo root and print what would be served
    Scan,
    /// Print a stock album-server.toml with all options documented
    GenConfig,
}

impl Default for Command {
    fn default() -> Self {
        Command::Serve(ServeArgs::default())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or_default();

    if let Command::GenConfig = command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    init_tracing();
    let config = resolve_config(&cli, &command)?;
    init_thread_pool(&config.processing);

    match command {
        Command::Serve(_) => {
            let state = server::prepare(&config)?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(server::serve(&config.server, state))?;
        }
        Command::Scan => {
            let index = server::scan(&config, &IdGenerator::new())?;
            let root = std::fs::canonicalize(&config.paths.photos)
                .unwrap_or_else(|_| config.paths.photos.clone());
            output::print_scan_output(&index, &root);
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Config file, then environment and flags on top, then validation.
fn resolve_config(cli: &Cli, command: &Command) -> Result<ServerConfig, config::ConfigError> {
    let path = config::locate_config(cli.config.as_deref(), Path::new("."));
    let mut config = config::load_config(path.as_deref())?;

    if let Some(photos) = &cli.photos {
        config.paths.photos = photos.clone();
    }
    if let Some(thumbs) = &cli.thumbnails {
        config.paths.thumbnails = Some(thumbs.clone());
    }
    if let Command::Serve(args) = command {
        if let Some(host) = &args.host {
            config.server.host = host.clone();
        }
        if let Some(port) = args.port {
            config.server.port = port;
        }
        if let Some(backend) = args.backend {
            config.thumbnails.backend = backend;
        }
    }

    config.validate()?;
    Ok(config)
}

/// Log to stderr so `scan` output on stdout stays clean.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
