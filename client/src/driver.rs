use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pixboard_shared::{CanvasId, Coordinate, RemotePixel, TileCoord};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{ConfigError, FailureKind, RemoteError, SyncError};
use crate::geometry::Camera;
use crate::overlay::{EditId, PixelOverlay, PixelValue, RemoteEdit};
use crate::remote::{CanvasRemote, PollRequest};
use crate::scheduler::PollScheduler;
use crate::state::{Instrument, PollPhase};
use crate::tiles::TileCache;
use crate::windowing::{missing_tiles, TileWindow, MAX_WINDOW_TILES};

const DRAW_FAILED: &str = "Failed to draw pixel (now undone from your canvas).";
const ERASE_FAILED: &str = "Failed to erase pixel (removal undone from your canvas).";

/// What the rendering side is told about.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Every tile and overlay pixel of the previous canvas is gone.
    CanvasReset { canvas_id: CanvasId },
    TilesAdded(Vec<TileCoord>),
    TilesEvicted(Vec<TileCoord>),
    /// New effective values, one entry per changed coordinate.
    PixelsChanged(Vec<(Coordinate, PixelValue)>),
    /// Short human readable message, e.g. a rolled back edit.
    Notice(String),
    /// A poll finished and the next one is `delay` away.
    PollSettled { delay: Duration, outcome: PollOutcome },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Changes(usize),
    Quiet,
    Failed(FailureKind),
}

/// Point-in-time copy of the driver's state.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasSnapshot {
    pub canvas_id: CanvasId,
    pub camera: Camera,
    pub instrument: Instrument,
    pub tiles: Vec<TileCoord>,
    pub pixels: Vec<(Coordinate, PixelValue)>,
    pub pending_edits: usize,
    pub delay: Duration,
    pub cursor: DateTime<Utc>,
    pub phase: PollPhase,
    pub dragging: bool,
    pub polling_enabled: bool,
}

enum Command {
    ViewportChanged(Camera),
    Click(Coordinate),
    DragStart,
    DragEnd,
    SetInstrument(Instrument),
    SetCanvas(CanvasId),
    SetPollingEnabled(bool),
    Snapshot(oneshot::Sender<CanvasSnapshot>),
    Shutdown,
}

enum Completion {
    Poll {
        generation: u64,
        issued_at: DateTime<Utc>,
        result: Result<Vec<RemotePixel>, RemoteError>,
    },
    Write {
        generation: u64,
        coordinate: Coordinate,
        id: EditId,
        erased: bool,
        result: Result<(), RemoteError>,
    },
}

enum Phase {
    Idle,
    Scheduled(Instant),
    InFlight,
}

/// Cheap to clone; every clone feeds the same driver.
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SyncHandle {
    fn send(&self, command: Command) -> Result<(), SyncError> {
        self.commands
            .send(command)
            .map_err(|_| SyncError::DriverStopped)
    }

    pub fn viewport_changed(&self, camera: Camera) -> Result<(), SyncError> {
        self.send(Command::ViewportChanged(camera))
    }

    /// Paints (or erases) `at` with the current instrument.
    pub fn click(&self, at: Coordinate) -> Result<(), SyncError> {
        self.send(Command::Click(at))
    }

    pub fn drag_start(&self) -> Result<(), SyncError> {
        self.send(Command::DragStart)
    }

    pub fn drag_end(&self) -> Result<(), SyncError> {
        self.send(Command::DragEnd)
    }

    pub fn set_instrument(&self, instrument: Instrument) -> Result<(), SyncError> {
        self.send(Command::SetInstrument(instrument))
    }

    pub fn set_canvas(&self, canvas_id: CanvasId) -> Result<(), SyncError> {
        self.send(Command::SetCanvas(canvas_id))
    }

    pub fn set_polling_enabled(&self, enabled: bool) -> Result<(), SyncError> {
        self.send(Command::SetPollingEnabled(enabled))
    }

    pub async fn snapshot(&self) -> Result<CanvasSnapshot, SyncError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        response.await.map_err(|_| SyncError::DriverStopped)
    }

    pub fn shutdown(&self) -> Result<(), SyncError> {
        self.send(Command::Shutdown)
    }
}

/// Owns all sync state and handles one command or completion at a time.
pub struct SyncDriver {
    config: SyncConfig,
    remote: Arc<dyn CanvasRemote>,
    canvas_id: CanvasId,
    generation: u64,
    camera: Camera,
    instrument: Instrument,
    tiles: TileCache,
    overlay: PixelOverlay,
    scheduler: PollScheduler,
    cursor: DateTime<Utc>,
    phase: Phase,
    dragging: bool,
    polling_enabled: bool,
    events: mpsc::UnboundedSender<SyncEvent>,
    completions: mpsc::UnboundedSender<Completion>,
}

impl SyncDriver {
    /// Starts the driver on the current tokio runtime.
    ///
    /// The initial tile window is announced right away and the first poll
    /// is scheduled one initial delay later.
    pub fn spawn(
        config: SyncConfig,
        remote: Arc<dyn CanvasRemote>,
        canvas_id: CanvasId,
        camera: Camera,
    ) -> Result<(SyncHandle, mpsc::UnboundedReceiver<SyncEvent>, JoinHandle<()>), ConfigError> {
        config.validate()?;
        let camera = camera.with_zoom_limits(config.min_zoom, config.max_zoom);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let driver = SyncDriver {
            scheduler: PollScheduler::new(config.scheduler.clone()),
            cursor: session_start(&config),
            config,
            remote,
            canvas_id,
            generation: 0,
            camera,
            instrument: Instrument::default(),
            tiles: TileCache::new(),
            overlay: PixelOverlay::new(),
            phase: Phase::Idle,
            dragging: false,
            polling_enabled: true,
            events: event_tx,
            completions: completion_tx,
        };
        let task = tokio::spawn(driver.run(command_rx, completion_rx));
        Ok((SyncHandle { commands: command_tx }, event_rx, task))
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        info!(
            "sync started canvas={} endpoint={}",
            self.canvas_id, self.config.endpoint
        );
        self.retile();
        self.schedule();

        loop {
            let deadline = match self.phase {
                Phase::Scheduled(at) => Some(at),
                _ => None,
            };
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(completion) = completions.recv() => self.handle_completion(completion),
                _ = wait_until(deadline) => self.start_poll(),
            }
        }
        info!("sync stopped canvas={}", self.canvas_id);
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::ViewportChanged(camera) => {
                self.camera = camera.with_zoom_limits(self.config.min_zoom, self.config.max_zoom);
                self.retile();
            }
            Command::Click(at) => self.paint(at),
            Command::DragStart => {
                self.dragging = true;
                if matches!(self.phase, Phase::Scheduled(_)) {
                    debug!("poll suspended while dragging");
                    self.phase = Phase::Idle;
                }
            }
            Command::DragEnd => {
                self.dragging = false;
                self.resume();
            }
            Command::SetInstrument(instrument) => self.instrument = instrument,
            Command::SetCanvas(canvas_id) => self.switch_canvas(canvas_id),
            Command::SetPollingEnabled(enabled) => {
                self.polling_enabled = enabled;
                if enabled {
                    self.resume();
                } else if matches!(self.phase, Phase::Scheduled(_)) {
                    self.phase = Phase::Idle;
                }
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown => {}
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Poll {
                generation,
                issued_at,
                result,
            } => {
                if generation != self.generation {
                    debug!("dropping poll response for a previous canvas");
                    return;
                }
                self.finish_poll(issued_at, result);
            }
            Completion::Write {
                generation,
                coordinate,
                id,
                erased,
                result,
            } => {
                if generation != self.generation {
                    return;
                }
                self.finish_write(coordinate, id, erased, result);
            }
        }
    }

    fn paint(&mut self, at: Coordinate) {
        let (color, erased) = self.instrument.edit();
        let id = EditId::new();
        self.overlay.apply_edit(at, color, erased, id);
        self.emit_pixels(vec![at]);

        let remote = Arc::clone(&self.remote);
        let completions = self.completions.clone();
        let generation = self.generation;
        let canvas_id = self.canvas_id;
        tokio::spawn(async move {
            let result = if erased {
                remote.erase_pixel(canvas_id, at).await
            } else {
                remote.put_pixel(canvas_id, at, color).await
            };
            let _ = completions.send(Completion::Write {
                generation,
                coordinate: at,
                id,
                erased,
                result,
            });
        });
    }

    fn finish_write(&mut self, at: Coordinate, id: EditId, erased: bool, result: Result<(), RemoteError>) {
        match result {
            Ok(()) => {
                self.overlay.confirm_edit(at, id);
                debug!("write confirmed canvas={} at={at} edit={id}", self.canvas_id);
            }
            Err(error) => {
                warn!(
                    "write failed canvas={} at={at} edit={id} error={error}; rolling back",
                    self.canvas_id
                );
                if self.overlay.rollback_edit(at, id) {
                    self.emit_pixels(vec![at]);
                }
                let notice = if erased { ERASE_FAILED } else { DRAW_FAILED };
                self.emit(SyncEvent::Notice(notice.to_string()));
            }
        }
    }

    fn start_poll(&mut self) {
        let rect = self.camera.poll_rect();
        if rect.is_empty() {
            debug!("viewport has no area, skipping poll");
            self.schedule();
            return;
        }
        let request = PollRequest {
            canvas_id: self.canvas_id,
            since: self.cursor,
            rect,
        };
        let issued_at = Utc::now();
        self.phase = Phase::InFlight;
        debug!(
            "poll canvas={} since={} rect={}..{}",
            request.canvas_id, request.since, rect.top_left, rect.bottom_right
        );

        let remote = Arc::clone(&self.remote);
        let completions = self.completions.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = remote.poll(&request).await;
            let _ = completions.send(Completion::Poll {
                generation,
                issued_at,
                result,
            });
        });
    }

    fn finish_poll(&mut self, issued_at: DateTime<Utc>, result: Result<Vec<RemotePixel>, RemoteError>) {
        let outcome = match result {
            Ok(pixels) if pixels.is_empty() => {
                self.advance_cursor(issued_at);
                self.scheduler.on_quiet();
                PollOutcome::Quiet
            }
            Ok(pixels) => {
                let received_at = Utc::now();
                let count = pixels.len();
                let edits = pixels.iter().map(|pixel| RemoteEdit {
                    coordinate: pixel.coordinate(),
                    color: pixel.color(),
                    erased: false,
                    at: pixel
                        .at
                        .and_then(DateTime::<Utc>::from_timestamp_millis)
                        .unwrap_or(received_at),
                });
                let touched = self.overlay.merge_remote(edits);
                self.emit_pixels(touched);
                self.advance_cursor(issued_at);
                self.scheduler.on_success_with_data();
                debug!("poll merged {count} pixels canvas={}", self.canvas_id);
                PollOutcome::Changes(count)
            }
            Err(error) => {
                self.scheduler.on_error();
                warn!(
                    "poll failed canvas={} error={error} next_delay_ms={}",
                    self.canvas_id,
                    self.scheduler.delay_ms()
                );
                PollOutcome::Failed(error.kind())
            }
        };
        self.emit(SyncEvent::PollSettled {
            delay: self.scheduler.delay(),
            outcome,
        });

        if self.can_poll() {
            self.schedule();
        } else {
            self.phase = Phase::Idle;
        }
    }

    fn advance_cursor(&mut self, to: DateTime<Utc>) {
        if to > self.cursor {
            self.cursor = to;
        }
    }

    fn switch_canvas(&mut self, canvas_id: CanvasId) {
        if canvas_id == self.canvas_id {
            return;
        }
        info!("switching canvas from={} to={canvas_id}", self.canvas_id);
        self.canvas_id = canvas_id;
        self.generation += 1;
        self.tiles.clear();
        self.overlay.clear();
        self.scheduler.reset();
        // Older edits on the new canvas arrive with its tile images.
        let start = session_start(&self.config);
        self.advance_cursor(start);
        self.emit(SyncEvent::CanvasReset { canvas_id });
        self.retile();
        if self.can_poll() {
            self.schedule();
        } else {
            self.phase = Phase::Idle;
        }
    }

    fn retile(&mut self) {
        let Some(window) = TileWindow::for_camera(&self.camera, self.config.tile_side, self.config.prefetch_margin)
        else {
            return;
        };
        if window.tile_count() > MAX_WINDOW_TILES {
            warn!(
                "tile window too large, skipping retile tiles={} limit={MAX_WINDOW_TILES}",
                window.tile_count()
            );
            return;
        }
        let needed = missing_tiles(&window, self.tiles.as_set());
        let added = self.tiles.add_tiles(needed);
        if !added.is_empty() {
            debug!("tiles added count={} total={}", added.len(), self.tiles.len());
            self.emit(SyncEvent::TilesAdded(added));
        }
        if let Some(radius) = self.config.tile_eviction_radius {
            let evicted = self.tiles.evict_outside(&window, radius);
            if !evicted.is_empty() {
                debug!("tiles evicted count={}", evicted.len());
                self.emit(SyncEvent::TilesEvicted(evicted));
            }
        }
    }

    fn can_poll(&self) -> bool {
        self.polling_enabled && !self.dragging
    }

    fn resume(&mut self) {
        if matches!(self.phase, Phase::Idle) && self.can_poll() {
            self.schedule();
        }
    }

    fn schedule(&mut self) {
        self.phase = Phase::Scheduled(Instant::now() + self.scheduler.delay());
    }

    fn emit_pixels(&self, coordinates: Vec<Coordinate>) {
        if coordinates.is_empty() {
            return;
        }
        let pixels = coordinates
            .into_iter()
            .map(|coordinate| (coordinate, self.overlay.effective(coordinate)))
            .collect();
        self.emit(SyncEvent::PixelsChanged(pixels));
    }

    fn emit(&self, event: SyncEvent) {
        // Nobody listening is fine; the state is still kept.
        let _ = self.events.send(event);
    }

    fn snapshot(&self) -> CanvasSnapshot {
        CanvasSnapshot {
            canvas_id: self.canvas_id,
            camera: self.camera,
            instrument: self.instrument,
            tiles: self.tiles.tiles().to_vec(),
            pixels: self.overlay.effective_pixels(),
            pending_edits: self.overlay.pending_count(),
            delay: self.scheduler.delay(),
            cursor: self.cursor,
            phase: match self.phase {
                Phase::Idle => PollPhase::Idle,
                Phase::Scheduled(_) => PollPhase::Scheduled,
                Phase::InFlight => PollPhase::InFlight,
            },
            dragging: self.dragging,
            polling_enabled: self.polling_enabled,
        }
    }
}

fn session_start(config: &SyncConfig) -> DateTime<Utc> {
    let lookback = i64::try_from(config.initial_lookback_secs).unwrap_or(i64::MAX);
    chrono::Duration::try_seconds(lookback)
        .and_then(|lookback| Utc::now().checked_sub_signed(lookback))
        .unwrap_or_else(Utc::now)
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
