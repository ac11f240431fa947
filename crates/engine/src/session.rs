use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossbeam_channel::{unbounded, Receiver};
use provider::WallpaperProvider;

use crate::acquire;
use crate::codec::ImageCodec;
use crate::present;
use crate::state::EngineShared;
use crate::surface::Surface;
use crate::types::EngineConfig;

/// Out-of-band notifications from the workers to the embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new slide was decoded, scaled, and swapped in.
    SlidePublished,
    /// The source listing was empty; acquisition retries on the next tick.
    SourceExhausted,
    /// Acquisition hit an unrecoverable error and the session is ending.
    Fatal(String),
}

/// One running slideshow: both worker threads plus the shared state they
/// cooperate over. Dropping the session tears it down.
pub struct Session {
    shared: Arc<EngineShared>,
    events: Receiver<SessionEvent>,
    workers: Vec<JoinHandle<Result<()>>>,
}

impl Session {
    /// Starts the acquisition and presentation workers.
    pub fn spawn(
        config: EngineConfig,
        provider: Box<dyn WallpaperProvider>,
        codec: Box<dyn ImageCodec>,
        surface: Box<dyn Surface>,
    ) -> Result<Self> {
        let shared = Arc::new(EngineShared::new());
        let (event_tx, event_rx) = unbounded();

        let acquire_handle = {
            let shared = Arc::clone(&shared);
            let config = config.clone();
            thread::Builder::new()
                .name("slidepaper-acquire".into())
                .spawn(move || acquire::run(shared, provider, codec, config, event_tx))
                .map_err(|err| anyhow!("failed to spawn acquisition worker: {err}"))?
        };

        let present_handle = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("slidepaper-present".into())
                .spawn(move || present::run(shared, surface, config))
                .map_err(|err| anyhow!("failed to spawn presentation worker: {err}"))?
        };

        Ok(Self {
            shared,
            events: event_rx,
            workers: vec![acquire_handle, present_handle],
        })
    }

    /// Cloneable entry point for the host callback layer.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Collects any pending worker notifications without blocking.
    pub fn drain_events(&self) -> Vec<SessionEvent> {
        self.events.try_iter().collect()
    }

    /// Waits up to `timeout` for the next worker notification.
    pub fn next_event(&self, timeout: Duration) -> Option<SessionEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Stops both workers and propagates the first worker error, if any.
    pub fn shutdown(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        self.shared.stop();
        // Barrier: an in-flight render holds the draw lock until its
        // presentation completes; taking and releasing it here means no frame
        // is mid-present once we return, and the gate re-check stops any new
        // one.
        drop(self.shared.images());

        let mut result = Ok(());
        for worker in self.workers.drain(..) {
            match worker.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    if result.is_ok() {
                        result = Err(err);
                    }
                }
                Err(_) => {
                    if result.is_ok() {
                        result = Err(anyhow!("slideshow worker panicked"));
                    }
                }
            }
        }
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

/// Host callback contract. Every method is a lock-scoped field write plus a
/// broadcast signal; none of them blocks on the draw lock, so the host's
/// callback thread always returns promptly.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<EngineShared>,
}

impl EngineHandle {
    pub fn set_visible(&self, visible: bool) {
        let mut control = self.shared.control();
        control.paused = !visible;
        if visible {
            control.redraw_requested = true;
        }
        self.shared.notify_all();
    }

    pub fn set_offsets(&self, pan_x: f32, pan_y: f32) {
        let mut control = self.shared.control();
        control.pan_x = pan_x.clamp(0.0, 1.0);
        control.pan_y = pan_y.clamp(0.0, 1.0);
        control.redraw_requested = true;
        self.shared.notify_all();
    }

    pub fn resize(&self, width: u32, height: u32) {
        let mut control = self.shared.control();
        control.viewport = (width, height);
        control.redraw_requested = true;
        self.shared.notify_all();
    }
}
