use std::time::Duration;

use provider::ProviderError;

use crate::codec::CodecError;

/// Owned, decoded RGBA raster. Moved into and out of the shared image pair
/// under the draw lock; no references escape lock scope.
pub type Raster = image::RgbaImage;

/// Errors that end an acquisition attempt.
///
/// `Provider(SourceExhausted)` is surfaced and re-attempted on the next slide
/// tick; everything else is fatal to the session.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("failed to decode slide: {0}")]
    Decode(#[from] CodecError),
}

/// Tuning knobs for one slideshow session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Time between the end of one successful publish and the next
    /// acquisition. The countdown is suspended while the session is paused.
    pub slide_interval: Duration,
    /// Wall-clock duration of the crossfade between consecutive slides.
    pub crossfade: Duration,
    /// Presented frame-rate cap.
    pub target_fps: f32,
}

impl EngineConfig {
    /// Minimum interval between presented frames.
    pub(crate) fn frame_budget(&self) -> Duration {
        if self.target_fps > 0.0 {
            Duration::from_secs_f32(1.0 / self.target_fps)
        } else {
            Duration::ZERO
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slide_interval: Duration::from_secs(10),
            crossfade: Duration::from_secs(1),
            target_fps: 60.0,
        }
    }
}
