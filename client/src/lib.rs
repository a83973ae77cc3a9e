pub mod config;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod net;
pub mod overlay;
pub mod remote;
pub mod scheduler;
pub mod state;
pub mod tiles;
pub mod windowing;

pub use config::SyncConfig;
pub use driver::{CanvasSnapshot, PollOutcome, SyncDriver, SyncEvent, SyncHandle};
pub use error::{AddressError, ConfigError, FailureKind, RemoteError, SyncError};
pub use geometry::{Camera, ViewportRect};
pub use net::CanvasAddress;
pub use overlay::{EditId, PixelOverlay, PixelValue};
pub use remote::{CanvasRemote, HttpRemote, PollRequest};
pub use scheduler::{PollScheduler, SchedulerConfig};
pub use state::{Instrument, PollPhase};
pub use tiles::TileCache;
pub use windowing::{compute_needed_tiles, TileWindow};
