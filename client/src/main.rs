use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use pixboard_client::net::tile_url;
use pixboard_client::{Camera, CanvasAddress, HttpRemote, SyncConfig, SyncDriver, SyncEvent};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Follows a region of a shared pixel canvas and logs what changes.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON file with sync settings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Base URL of the canvas service.
    #[arg(long)]
    endpoint: Option<String>,
    /// Starting point, e.g. `/canvas/3/2/-400/120`.
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    canvas: Option<i64>,
    #[arg(long, allow_hyphen_values = true)]
    x: Option<i64>,
    #[arg(long, allow_hyphen_values = true)]
    y: Option<i64>,
    #[arg(long)]
    zoom: Option<f64>,
    /// Screen size in pixels.
    #[arg(long, default_value_t = 1280.0)]
    width: f64,
    #[arg(long, default_value_t = 720.0)]
    height: f64,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => match SyncConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                error!("{err}");
                return ExitCode::FAILURE;
            }
        },
        None => SyncConfig::default(),
    };
    if let Some(endpoint) = args.endpoint.clone() {
        config.endpoint = endpoint;
    }

    let mut address = match args.address.as_deref().map(CanvasAddress::parse).transpose() {
        Ok(address) => address.unwrap_or_default(),
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(canvas) = args.canvas {
        address.canvas_id = canvas;
    }
    if let Some(x) = args.x {
        address.x = x;
    }
    if let Some(y) = args.y {
        address.y = y;
    }
    if let Some(zoom) = args.zoom {
        address.zoom = zoom;
    }

    let camera = Camera::new(address.x as f64, address.y as f64, address.zoom, args.width, args.height);
    let endpoint = config.endpoint.clone();
    let tile_side = config.tile_side;
    let background = config.background;
    let remote = Arc::new(HttpRemote::new(endpoint.clone()));

    let (handle, mut events, task) = match SyncDriver::spawn(config, remote, address.canvas_id, camera) {
        Ok(started) => started,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    info!("following {} on {endpoint}", address.to_path());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => log_event(event, &endpoint, tile_side, background),
                None => break,
            },
            _ = &mut shutdown => {
                info!("shutting down");
                let _ = handle.shutdown();
                break;
            }
        }
    }

    if let Err(err) = task.await {
        error!("sync task ended abnormally: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn log_event(event: SyncEvent, endpoint: &str, tile_side: u32, background: pixboard_shared::Color) {
    match event {
        SyncEvent::CanvasReset { canvas_id } => info!("now on canvas {canvas_id}"),
        SyncEvent::TilesAdded(tiles) => {
            info!("{} tiles to load", tiles.len());
            for tile in tiles {
                debug!("tile {}", tile_url(endpoint, tile, tile_side));
            }
        }
        SyncEvent::TilesEvicted(tiles) => debug!("{} tiles dropped", tiles.len()),
        SyncEvent::PixelsChanged(pixels) => {
            for (at, value) in pixels {
                let color = value.resolve(background);
                info!(
                    "pixel {at} = rgba({}, {}, {}, {})",
                    color.r, color.g, color.b, color.a
                );
            }
        }
        SyncEvent::Notice(message) => warn!("{message}"),
        SyncEvent::PollSettled { delay, outcome } => {
            debug!("poll {outcome:?}, next in {}ms", delay.as_millis())
        }
    }
}
