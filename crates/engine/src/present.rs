use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::state::{EngineShared, FADE_FULL};
use crate::surface::Surface;
use crate::types::{EngineConfig, Raster};

/// Translation that slides the oversized axis of a cover-fit raster into
/// view. Always in `[-(image_dim - viewport_dim), 0]`: zero at pan 0, the
/// full overflow at pan 1.
pub fn pan_translation(pan: f32, image_dim: u32, viewport_dim: u32) -> f32 {
    let overflow = image_dim.saturating_sub(viewport_dim) as f32;
    -pan.clamp(0.0, 1.0) * overflow
}

/// Fade opacity after `elapsed` more wall-clock time, calibrated so a full
/// fade takes `crossfade` regardless of frame rate.
fn next_fade_alpha(alpha: f32, elapsed: Duration, crossfade: Duration) -> f32 {
    if crossfade.is_zero() {
        return 0.0;
    }
    alpha - elapsed.as_secs_f32() / crossfade.as_secs_f32()
}

/// Pan and viewport as read under the state lock when a render is admitted.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ViewSnapshot {
    pub pan: (f32, f32),
    pub viewport: (u32, u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GateInputs {
    pub running: bool,
    pub paused: bool,
    pub redraw_requested: bool,
    pub fade_active: bool,
    pub throttle: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GateDecision {
    Stop,
    /// `None` sleeps until an explicit signal; `Some` is a bounded wait.
    Sleep(Option<Duration>),
    Render,
}

/// Single gate re-evaluated on every wake of the presentation worker.
///
/// All wake reasons (redraw request, pause flip, shutdown, pacing timeout,
/// fade re-arm) funnel through the one condvar; the gate decides what the
/// wake means instead of condition-specific wait variables.
pub(crate) fn evaluate_gate(inputs: &GateInputs) -> GateDecision {
    if !inputs.running {
        return GateDecision::Stop;
    }
    if inputs.paused {
        return GateDecision::Sleep(None);
    }
    if !inputs.redraw_requested && !inputs.fade_active {
        return GateDecision::Sleep(None);
    }
    if !inputs.throttle.is_zero() {
        return GateDecision::Sleep(Some(inputs.throttle));
    }
    GateDecision::Render
}

/// Frame pacing bookkeeping for the presentation loop.
pub(crate) struct FramePacer {
    frame_budget: Duration,
    last_end: Option<Instant>,
    last_cost: Duration,
}

impl FramePacer {
    pub fn new(frame_budget: Duration) -> Self {
        Self {
            frame_budget,
            last_end: None,
            last_cost: Duration::ZERO,
        }
    }

    /// Remaining wait before the next frame may start. Subtracts the cost of
    /// rendering the previous frame so the presented rate stays at or under
    /// target even when rendering itself is slow.
    pub fn throttle(&self, now: Instant) -> Duration {
        let Some(last_end) = self.last_end else {
            return Duration::ZERO;
        };
        let since = now.saturating_duration_since(last_end);
        self.frame_budget
            .saturating_sub(since)
            .saturating_sub(self.last_cost)
    }

    /// Wall-clock gap since the previous frame finished.
    pub fn since_last(&self, now: Instant) -> Option<Duration> {
        self.last_end
            .map(|last| now.saturating_duration_since(last))
    }

    pub fn mark_rendered(&mut self, started: Instant, finished: Instant) {
        self.last_cost = finished.saturating_duration_since(started);
        self.last_end = Some(finished);
    }
}

pub(crate) fn run(
    shared: Arc<EngineShared>,
    mut surface: Box<dyn Surface>,
    config: EngineConfig,
) -> Result<()> {
    let mut pacer = FramePacer::new(config.frame_budget());
    let mut fade_active = false;

    loop {
        let view = {
            let mut control = shared.control();
            loop {
                let inputs = GateInputs {
                    running: control.running,
                    paused: control.paused,
                    redraw_requested: control.redraw_requested,
                    fade_active,
                    throttle: pacer.throttle(Instant::now()),
                };
                match evaluate_gate(&inputs) {
                    GateDecision::Stop => {
                        tracing::debug!("presentation worker stopping");
                        return Ok(());
                    }
                    GateDecision::Render => {
                        control.redraw_requested = false;
                        break ViewSnapshot {
                            pan: (control.pan_x, control.pan_y),
                            viewport: control.viewport,
                        };
                    }
                    GateDecision::Sleep(None) => control = shared.wait(control),
                    GateDecision::Sleep(Some(timeout)) => {
                        control = shared.wait_timeout(control, timeout);
                    }
                }
            }
        };

        let started = Instant::now();
        fade_active = render_frame(
            &shared,
            surface.as_mut(),
            &config,
            view,
            pacer.since_last(started),
        );
        pacer.mark_rendered(started, Instant::now());
    }
}

/// Composites and presents one frame. Returns whether a fade is still in
/// progress, which the gate uses as pending work for the next wake.
fn render_frame(
    shared: &EngineShared,
    surface: &mut dyn Surface,
    config: &EngineConfig,
    view: ViewSnapshot,
    since_last: Option<Duration>,
) -> bool {
    let (view_w, view_h) = view.viewport;
    if view_w == 0 || view_h == 0 {
        return false;
    }

    // The draw lock spans compositing and presentation so a publish can
    // never swap the pair out from under an in-flight frame.
    let mut pair = shared.images();
    if pair.current.is_none() {
        return false;
    }

    let mut canvas = match surface.acquire(view_w, view_h) {
        Ok(canvas) => canvas,
        Err(err) => {
            tracing::warn!(error = %err, "surface unavailable, dropping frame");
            return pair.previous.is_some();
        }
    };

    if let Some(current) = pair.current.as_ref() {
        canvas.draw_raster(current, translation_for(current, view), 1.0);
    }

    let mut still_fading = false;
    if pair.previous.is_some() {
        let nominal = {
            let budget = config.frame_budget();
            if budget.is_zero() {
                Duration::from_millis(16)
            } else {
                budget
            }
        };
        // The first fade step decays by one nominal frame: the gap since the
        // last presented frame may be arbitrarily long when the session sat
        // idle before this publish.
        let step = if pair.fade_alpha >= FADE_FULL {
            nominal
        } else {
            since_last.unwrap_or(nominal)
        };
        let alpha = next_fade_alpha(pair.fade_alpha, step, config.crossfade);
        if alpha > 0.0 {
            pair.fade_alpha = alpha;
            if let Some(previous) = pair.previous.as_ref() {
                canvas.draw_raster(previous, translation_for(previous, view), alpha);
            }
            still_fading = true;
        } else {
            pair.fade_alpha = 0.0;
            pair.previous = None;
        }
    }

    if still_fading {
        // Re-arm before the draw lock is released so the fade keeps
        // animating without an external trigger. Lock order: draw → state.
        shared.control().redraw_requested = true;
        shared.notify_all();
    }

    if let Err(err) = surface.present(canvas) {
        tracing::warn!(error = %err, "failed to present frame, dropping it");
    }

    still_fading
}

fn translation_for(raster: &Raster, view: ViewSnapshot) -> (i64, i64) {
    (
        pan_translation(view.pan.0, raster.width(), view.viewport.0).round() as i64,
        pan_translation(view.pan.1, raster.height(), view.viewport.1).round() as i64,
    )
}
