use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::types::Raster;

pub(crate) const FADE_FULL: f32 = 1.0;

/// Lightweight control flags and offsets. Guarded by the state lock, which
/// host callbacks take for field-assignment durations only.
#[derive(Debug)]
pub(crate) struct ControlState {
    pub viewport: (u32, u32),
    pub pan_x: f32,
    pub pan_y: f32,
    pub running: bool,
    pub paused: bool,
    pub redraw_requested: bool,
}

/// The double buffer. Guarded by the draw lock, held for the whole of a
/// publish or a render so image-pair mutation and reads never interleave.
#[derive(Debug, Default)]
pub(crate) struct ImagePair {
    pub current: Option<Raster>,
    pub previous: Option<Raster>,
    /// Opacity of `previous`; decays from [`FADE_FULL`] to zero over the
    /// crossfade duration, at which point `previous` is released.
    pub fade_alpha: f32,
}

/// Shared state for one slideshow session.
///
/// Two lock domains: `control` (with the single broadcast condvar `wake`)
/// and `images`. Lock order is draw → state; nothing ever takes the draw
/// lock while holding the state lock.
pub(crate) struct EngineShared {
    control: Mutex<ControlState>,
    wake: Condvar,
    images: Mutex<ImagePair>,
}

impl EngineShared {
    pub fn new() -> Self {
        Self {
            control: Mutex::new(ControlState {
                viewport: (0, 0),
                pan_x: 0.0,
                pan_y: 0.0,
                running: true,
                paused: false,
                redraw_requested: false,
            }),
            wake: Condvar::new(),
            images: Mutex::new(ImagePair::default()),
        }
    }

    pub fn control(&self) -> MutexGuard<'_, ControlState> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn images(&self) -> MutexGuard<'_, ImagePair> {
        self.images.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn notify_all(&self) {
        self.wake.notify_all();
    }

    pub fn wait<'a>(&self, guard: MutexGuard<'a, ControlState>) -> MutexGuard<'a, ControlState> {
        self.wake
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn wait_timeout<'a>(
        &self,
        guard: MutexGuard<'a, ControlState>,
        timeout: Duration,
    ) -> MutexGuard<'a, ControlState> {
        self.wake
            .wait_timeout(guard, timeout)
            .map(|(guard, _)| guard)
            .unwrap_or_else(|err| err.into_inner().0)
    }

    /// Installs a freshly scaled slide: the old `previous` is released, the
    /// old `current` demoted, and the fade restarted at full opacity. Then
    /// the presenter is signalled.
    pub fn publish(&self, raster: Raster) {
        {
            let mut pair = self.images();
            pair.previous = pair.current.take();
            pair.current = Some(raster);
            pair.fade_alpha = FADE_FULL;
        }
        let mut control = self.control();
        control.redraw_requested = true;
        self.notify_all();
    }

    /// Ends the session: both workers observe `running == false` on their
    /// next gate check and exit.
    pub fn stop(&self) {
        let mut control = self.control();
        control.running = false;
        self.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn stamped(sequence: u32) -> Raster {
        // Width encodes the publish sequence so readers can check pairing.
        Raster::new(sequence, 1)
    }

    #[test]
    fn publish_demotes_current_into_previous() {
        let shared = EngineShared::new();
        shared.publish(stamped(1));
        {
            let pair = shared.images();
            assert_eq!(pair.current.as_ref().map(Raster::width), Some(1));
            assert!(pair.previous.is_none(), "first publish has nothing to fade");
        }

        shared.publish(stamped(2));
        let pair = shared.images();
        assert_eq!(pair.current.as_ref().map(Raster::width), Some(2));
        assert_eq!(pair.previous.as_ref().map(Raster::width), Some(1));
        assert_eq!(pair.fade_alpha, FADE_FULL);
    }

    #[test]
    fn publish_requests_redraw() {
        let shared = EngineShared::new();
        assert!(!shared.control().redraw_requested);
        shared.publish(stamped(1));
        assert!(shared.control().redraw_requested);
    }

    #[test]
    fn concurrent_publishes_never_tear_the_pair() {
        let shared = Arc::new(EngineShared::new());
        let publisher = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for sequence in 1..=500 {
                    shared.publish(stamped(sequence));
                }
            })
        };

        // Reader plays the render role: under the draw lock the pair must
        // always be self-consistent, i.e. previous is the slide published
        // immediately before current.
        let mut observations = 0;
        while observations < 200 {
            let pair = shared.images();
            if let (Some(current), Some(previous)) = (&pair.current, &pair.previous) {
                assert_eq!(
                    previous.width() + 1,
                    current.width(),
                    "previous must be the slide demoted by the latest publish"
                );
                observations += 1;
            }
        }

        publisher.join().expect("publisher thread");
    }
}
