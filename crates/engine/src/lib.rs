//! Slideshow engine: double-buffered, rate-limited wallpaper rendering.
//!
//! Two long-lived workers cooperate over a shared image pair:
//!
//! ```text
//!   host callbacks ──▶ EngineHandle ──▶ ControlState (state lock) ──┐ signal
//!                                                                   ▼
//!   AcquisitionWorker ─ decode/scale ─▶ ImagePair (draw lock) ◀─ PresentationWorker
//!           │                              current/previous              │
//!           └── WallpaperProvider          fade_alpha                    └──▶ Surface
//! ```
//!
//! The acquisition worker periodically pulls a byte stream from the
//! [`provider::WallpaperProvider`], decodes and cover-scales it, and swaps it
//! into the `current` slot while demoting the old image into `previous` to
//! start a crossfade. The presentation worker waits on a single condition
//! variable, re-evaluates a pure gate on every wake, and composites the pair
//! with a wall-clock-decaying alpha, paced to the target frame rate. Host
//! callbacks only ever perform lock-scoped field writes plus a broadcast
//! signal, so they return in bounded time no matter what the workers are
//! doing.

mod acquire;
mod codec;
mod present;
mod session;
mod state;
mod surface;
mod types;

pub use codec::{cover_target, CodecError, ImageCodec, StreamCodec};
pub use present::pan_translation;
pub use session::{EngineHandle, Session, SessionEvent};
pub use surface::{FrameCanvas, Surface, SurfaceError};
pub use types::{EngineConfig, EngineError, Raster};
