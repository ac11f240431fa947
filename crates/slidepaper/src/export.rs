use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use engine::{FrameCanvas, Surface, SurfaceError};

/// Surface that writes every presented frame to a numbered PNG file,
/// standing in for a compositor when running headless.
pub struct PngExportSurface {
    dir: PathBuf,
    next_index: u64,
    presented: Arc<AtomicU64>,
}

impl PngExportSurface {
    pub fn new(dir: impl Into<PathBuf>, presented: Arc<AtomicU64>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            next_index: 0,
            presented,
        })
    }
}

impl Surface for PngExportSurface {
    fn acquire(&mut self, width: u32, height: u32) -> Result<FrameCanvas, SurfaceError> {
        Ok(FrameCanvas::new(width, height))
    }

    fn present(&mut self, canvas: FrameCanvas) -> Result<(), SurfaceError> {
        let path = self.dir.join(format!("frame-{:05}.png", self.next_index));
        self.next_index += 1;
        canvas
            .into_pixels()
            .save(&path)
            .map_err(|err| SurfaceError::Present(err.to_string()))?;
        self.presented.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presents_frames_as_numbered_pngs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let presented = Arc::new(AtomicU64::new(0));
        let mut surface =
            PngExportSurface::new(dir.path(), Arc::clone(&presented)).expect("surface");

        for _ in 0..2 {
            let canvas = surface.acquire(16, 8).expect("acquire");
            surface.present(canvas).expect("present");
        }

        assert_eq!(presented.load(Ordering::SeqCst), 2);
        for name in ["frame-00000.png", "frame-00001.png"] {
            let meta = fs::metadata(dir.path().join(name)).expect("frame written");
            assert!(meta.len() > 0);
        }
    }
}
