use clap::{Parser, Subcommand};
use folder_gal::config::{self, GalleryConfig};
use folder_gal::gallery::Gallery;
use folder_gal::media::NativeBackend;
use folder_gal::scan::{self, ScanOptions};
use folder_gal::store::SqliteStore;
use folder_gal::{folders, logging, output, server};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "folder-gal")]
#[command(about = "Local web gallery for folder-structured photo and video collections")]
#[command(long_about = "\
Local web gallery for folder-structured photo and video collections

Your filesystem is the data source. Every folder under the dataset root is
browsable; supported files are indexed into a SQLite store the first time a
folder is viewed and re-indexed in the background once that index is older
than the freshness window.

Dataset structure:

  dataset/
  ├── Trips/
  │   ├── .thumbnails/           # Generated, one JPEG per file
  │   │   └── IMG_0042_thumb.jpg
  │   ├── IMG_0042.jpg           # Images: jpg jpeg png bmp webp heic
  │   ├── loop.gif               # GIFs (animated ones get a duration)
  │   └── Rome/
  │       └── walk.mp4           # Videos: mp4 mov avi webm (needs ffmpeg)
  └── .private/                  # Hidden folders are never listed

Settings come from folder-gal.toml (or --config), then DATASET_PATH, HOST and
PORT from the environment, then flags.

Run 'folder-gal gen-config' to generate a documented folder-gal.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./folder-gal.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset root directory
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// SQLite metadata store
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Debug logging for folder-gal
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the JSON API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Index a folder (and everything below it) now
    Scan {
        /// Folder relative to the dataset root (default: everything)
        #[arg(default_value = "")]
        folder: String,
    },
    /// List the folders under a parent
    Folders {
        /// Folder relative to the dataset root (default: the root)
        #[arg(default_value = "")]
        parent: String,
    },
    /// Print a stock folder-gal.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Serve { .. } => {
            let config = setup(&cli)?;
            let gallery = Arc::new(Gallery::from_config(&config)?);
            let addr = config.server.bind_address();
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(server::serve(gallery, &addr))?;
        }
        Command::Scan { folder } => {
            let config = setup(&cli)?;
            let store = SqliteStore::open(&config.database)?;
            let backend = NativeBackend::with_tools(&config.video.ffmpeg, &config.video.ffprobe);
            let report = scan::scan(
                &config.dataset,
                folder,
                &backend,
                &store,
                &ScanOptions::from_config(&config),
            )?;
            output::print_scan_report(&report);
        }
        Command::Folders { parent } => {
            let config = setup(&cli)?;
            let list = folders::list_folders(&config.dataset, parent)?;
            output::print_folders(parent, &list);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Start logging and resolve configuration.
fn setup(cli: &Cli) -> Result<GalleryConfig, Box<dyn std::error::Error>> {
    logging::init(cli.verbose)?;
    resolve_config(cli)
}

/// File, then environment, then flags.
fn resolve_config(cli: &Cli) -> Result<GalleryConfig, Box<dyn std::error::Error>> {
    let mut config = config::load_config(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok())?;

    if let Some(dataset) = &cli.dataset {
        config.dataset = dataset.clone();
    }
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }
    if let Command::Serve { host, port } = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }
    config.validate()?;
    Ok(config)
}
