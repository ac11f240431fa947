use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::Sender;
use provider::{ProviderError, WallpaperProvider};

use crate::codec::{cover_target, ImageCodec};
use crate::session::SessionEvent;
use crate::state::EngineShared;
use crate::types::{EngineConfig, EngineError, Raster};

pub(crate) fn run(
    shared: Arc<EngineShared>,
    mut provider: Box<dyn WallpaperProvider>,
    codec: Box<dyn ImageCodec>,
    config: EngineConfig,
    events: Sender<SessionEvent>,
) -> Result<()> {
    // The countdown to the next slide only runs across unpaused wall-clock
    // time: pausing suspends it and unpausing resumes from where it was.
    let mut countdown = Duration::ZERO;
    let mut has_published = false;

    loop {
        let viewport = {
            let mut control = shared.control();
            let mut last_tick = Instant::now();
            // Pause state the elapsed window was spent in; every pause flip
            // signals the condvar, so a window never spans both states.
            let mut was_paused = control.paused;
            loop {
                if !control.running {
                    tracing::debug!("acquisition worker stopping");
                    return Ok(());
                }
                let now = Instant::now();
                if !was_paused {
                    countdown = countdown.saturating_sub(now.duration_since(last_tick));
                }
                last_tick = now;
                was_paused = control.paused;

                // The very first acquisition is never skipped, even while
                // paused, so a cold start has an image ready on first show.
                let due = countdown.is_zero() && (!control.paused || !has_published);
                if due {
                    let viewport = control.viewport;
                    if viewport.0 > 0 && viewport.1 > 0 {
                        break viewport;
                    }
                    // No usable size yet; the resize callback signals us.
                    control = shared.wait(control);
                } else if control.paused {
                    control = shared.wait(control);
                } else {
                    control = shared.wait_timeout(control, countdown);
                }
            }
        };

        let fetch_started = Instant::now();
        match acquire_once(provider.as_mut(), codec.as_ref(), viewport) {
            Ok(raster) => {
                let (width, height) = raster.dimensions();
                shared.publish(raster);
                has_published = true;
                countdown = config.slide_interval;
                tracing::debug!(
                    width,
                    height,
                    elapsed_ms = fetch_started.elapsed().as_millis() as u64,
                    "published new slide"
                );
                let _ = events.send(SessionEvent::SlidePublished);
            }
            Err(EngineError::Provider(ProviderError::SourceExhausted)) => {
                tracing::warn!("slideshow source is empty, retrying on the next slide tick");
                let _ = events.send(SessionEvent::SourceExhausted);
                countdown = config.slide_interval;
            }
            Err(err) => {
                tracing::error!(error = %err, "slide acquisition failed, ending session");
                let _ = events.send(SessionEvent::Fatal(err.to_string()));
                shared.stop();
                return Err(err.into());
            }
        }
    }
}

/// Fetches, decodes, and cover-scales the next slide. The provider stream is
/// scope-released as soon as decoding finishes.
fn acquire_once(
    provider: &mut dyn WallpaperProvider,
    codec: &dyn ImageCodec,
    viewport: (u32, u32),
) -> Result<Raster, EngineError> {
    let mut stream = provider.next_image()?;
    let decoded = codec.decode(stream.as_mut())?;
    drop(stream);

    let (width, height) = cover_target(decoded.dimensions(), viewport);
    Ok(codec.scale(&decoded, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecError;
    use std::io::{Cursor, Read};

    /// Serves one-byte streams carrying a slide sequence number.
    struct ScriptedProvider {
        streams: Vec<Result<u8, ProviderError>>,
        served: usize,
    }

    impl WallpaperProvider for ScriptedProvider {
        fn next_image(&mut self) -> Result<Box<dyn Read + Send>, ProviderError> {
            let index = self.served.min(self.streams.len() - 1);
            self.served += 1;
            match &self.streams[index] {
                Ok(byte) => Ok(Box::new(Cursor::new(vec![*byte]))),
                Err(ProviderError::SourceExhausted) => Err(ProviderError::SourceExhausted),
                Err(_) => Err(ProviderError::Io(std::io::Error::other("unreadable"))),
            }
        }
    }

    /// Decodes the one-byte streams of `ScriptedProvider` into fixed-size
    /// rasters; `scale` honours the requested dimensions.
    struct ByteCodec;

    impl ImageCodec for ByteCodec {
        fn decode(&self, stream: &mut dyn Read) -> Result<Raster, CodecError> {
            let mut byte = [0u8; 1];
            stream.read_exact(&mut byte)?;
            Ok(Raster::from_pixel(
                4000,
                2000,
                image::Rgba([byte[0], 0, 0, 255]),
            ))
        }

        fn scale(&self, raster: &Raster, width: u32, height: u32) -> Raster {
            Raster::from_pixel(width, height, *raster.get_pixel(0, 0))
        }
    }

    #[test]
    fn acquire_once_cover_scales_to_the_viewport() {
        let mut provider = ScriptedProvider {
            streams: vec![Ok(7)],
            served: 0,
        };
        let raster =
            acquire_once(&mut provider, &ByteCodec, (1080, 1920)).expect("acquire slide");
        assert_eq!(raster.dimensions(), (3840, 1920));
        assert_eq!(raster.get_pixel(0, 0).0[0], 7);
    }

    #[test]
    fn acquire_once_surfaces_exhausted_source() {
        let mut provider = ScriptedProvider {
            streams: vec![Err(ProviderError::SourceExhausted)],
            served: 0,
        };
        let err = acquire_once(&mut provider, &ByteCodec, (1080, 1920)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Provider(ProviderError::SourceExhausted)
        ));
    }

    #[test]
    fn acquire_once_propagates_decode_failures() {
        struct EmptyStreamProvider;
        impl WallpaperProvider for EmptyStreamProvider {
            fn next_image(&mut self) -> Result<Box<dyn Read + Send>, ProviderError> {
                Ok(Box::new(Cursor::new(Vec::new())))
            }
        }

        let err = acquire_once(&mut EmptyStreamProvider, &ByteCodec, (1080, 1920)).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
    }
}
