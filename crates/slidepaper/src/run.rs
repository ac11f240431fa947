use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{ensure, Context, Result};
use engine::{EngineConfig, Session, SessionEvent, StreamCodec};
use provider::{FilesystemProvider, SelectionMode};
use slideconfig::{SelectionSetting, SlideConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::export::PngExportSurface;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let settings = resolve_settings(&args)?;
    let (width, height) = parse_surface_size(&args.size)?;

    let seed = args.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    });
    let provider = FilesystemProvider::with_mode(&settings.source_dir, settings.selection, seed)
        .with_context(|| {
            format!(
                "opening slideshow source '{}'",
                settings.source_dir.display()
            )
        })?;

    let presented = Arc::new(AtomicU64::new(0));
    let surface =
        PngExportSurface::new(&args.export_dir, Arc::clone(&presented)).with_context(|| {
            format!(
                "preparing frame export directory '{}'",
                args.export_dir.display()
            )
        })?;

    tracing::info!(
        source = %settings.source_dir.display(),
        export = %args.export_dir.display(),
        width,
        height,
        frames = args.frames,
        "starting slideshow session"
    );

    let session = Session::spawn(
        settings.engine,
        Box::new(provider),
        Box::new(StreamCodec),
        Box::new(surface),
    )?;
    let handle = session.handle();
    handle.resize(width, height);
    handle.set_visible(true);

    let started = Instant::now();
    while presented.load(Ordering::SeqCst) < args.frames {
        if let Some(SessionEvent::Fatal(_)) = session.next_event(Duration::from_millis(100)) {
            return session
                .shutdown()
                .context("slideshow session ended with an error");
        }
        if args.pan_speed > 0.0 {
            // Sweep the pan back and forth across its full range.
            let phase = started.elapsed().as_secs_f32() * args.pan_speed;
            handle.set_offsets((phase.sin() + 1.0) / 2.0, 0.0);
        }
    }

    tracing::info!(
        frames = presented.load(Ordering::SeqCst),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "frame budget reached, shutting down"
    );
    session.shutdown()
}

struct Settings {
    source_dir: PathBuf,
    engine: EngineConfig,
    selection: SelectionMode,
}

fn resolve_settings(args: &RunArgs) -> Result<Settings> {
    let file = match args.config.as_ref() {
        Some(path) => Some(SlideConfig::load(path).with_context(|| {
            format!("loading configuration from '{}'", path.display())
        })?),
        None => None,
    };

    let source_dir = args
        .source
        .clone()
        .or_else(|| file.as_ref().map(|config| config.source_dir.clone()))
        .context(
            "no image directory given; pass one as an argument or set source_dir in the config",
        )?;

    let defaults = EngineConfig::default();
    let engine = EngineConfig {
        slide_interval: args
            .interval
            .or_else(|| file.as_ref().map(|config| config.slide_interval))
            .unwrap_or(defaults.slide_interval),
        crossfade: args
            .crossfade
            .or_else(|| file.as_ref().map(|config| config.crossfade))
            .unwrap_or(defaults.crossfade),
        target_fps: args
            .fps
            .or_else(|| file.as_ref().map(|config| config.fps))
            .unwrap_or(defaults.target_fps),
    };

    let selection = if args.shuffle {
        SelectionMode::Shuffle
    } else {
        match file.as_ref().map(|config| config.selection) {
            Some(SelectionSetting::Shuffle) => SelectionMode::Shuffle,
            _ => SelectionMode::Sequential,
        }
    };

    Ok(Settings {
        source_dir,
        engine,
        selection,
    })
}

fn parse_surface_size(raw: &str) -> Result<(u32, u32)> {
    let (width, height) = raw
        .split_once(['x', 'X'])
        .with_context(|| format!("size '{raw}' must look like 1920x1080"))?;
    let width: u32 = width
        .trim()
        .parse()
        .with_context(|| format!("invalid width in size '{raw}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .with_context(|| format!("invalid height in size '{raw}'"))?;
    ensure!(width > 0 && height > 0, "size dimensions must be positive");
    Ok((width, height))
}
