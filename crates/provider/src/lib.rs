//! Image sources for the slideshow engine.
//!
//! A [`WallpaperProvider`] hands out one decodable byte stream per call. The
//! bundled [`FilesystemProvider`] walks a directory round-robin: it snapshots
//! the listing, serves entries in order, and takes a fresh snapshot whenever
//! the cursor wraps so files added or removed externally are picked up once
//! per full cycle.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use rand::prelude::*;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no images available in the slideshow source")]
    SourceExhausted,
    #[error("{0:?} is not a directory")]
    NotADirectory(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Capability that yields the next slideshow image as a readable byte stream.
///
/// Implementations must be safe to call repeatedly and must cycle through a
/// finite backing set. The caller scope-acquires the stream and drops it when
/// decoding finishes.
pub trait WallpaperProvider: Send {
    fn next_image(&mut self) -> Result<Box<dyn Read + Send>, ProviderError>;
}

/// Order in which a provider walks its backing set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionMode {
    /// Stable listing order, wrapping at the end.
    #[default]
    Sequential,
    /// Reshuffled order each full cycle; every entry is still visited once
    /// per cycle.
    Shuffle,
}

/// Round-robin provider over the regular files of one directory.
pub struct FilesystemProvider {
    root: PathBuf,
    mode: SelectionMode,
    rng: StdRng,
    snapshot: Vec<PathBuf>,
    cursor: usize,
}

impl FilesystemProvider {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        Self::with_mode(root, SelectionMode::Sequential, 0)
    }

    pub fn with_mode(
        root: impl Into<PathBuf>,
        mode: SelectionMode,
        seed: u64,
    ) -> Result<Self, ProviderError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ProviderError::NotADirectory(root));
        }
        Ok(Self {
            root,
            mode,
            rng: StdRng::seed_from_u64(seed),
            snapshot: Vec::new(),
            cursor: 0,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-lists the directory and rebuilds the serving order.
    fn refresh_snapshot(&mut self) -> Result<(), ProviderError> {
        let mut entries = Vec::new();
        for entry in self.root.read_dir()? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                entries.push(entry.path());
            }
        }
        // Sorted first so sequential order is stable and shuffle is a
        // permutation of the same set regardless of readdir order.
        entries.sort();
        if matches!(self.mode, SelectionMode::Shuffle) {
            entries.shuffle(&mut self.rng);
        }
        tracing::debug!(
            root = %self.root.display(),
            entries = entries.len(),
            "refreshed slideshow source listing"
        );
        self.snapshot = entries;
        self.cursor = 0;
        Ok(())
    }
}

impl WallpaperProvider for FilesystemProvider {
    fn next_image(&mut self) -> Result<Box<dyn Read + Send>, ProviderError> {
        if self.cursor >= self.snapshot.len() {
            self.refresh_snapshot()?;
            if self.snapshot.is_empty() {
                return Err(ProviderError::SourceExhausted);
            }
        }
        let selected = &self.snapshot[self.cursor];
        // The entry may have vanished between listing and open; surfaced as Io.
        let file = File::open(selected)?;
        self.cursor += 1;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;

    fn read_all(stream: &mut dyn Read) -> String {
        let mut buf = String::new();
        stream.read_to_string(&mut buf).expect("read stream");
        buf
    }

    #[test]
    fn cycles_in_listing_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["a.png", "b.png", "c.png"] {
            fs::write(dir.path().join(name), name).expect("write fixture");
        }

        let mut provider = FilesystemProvider::new(dir.path()).expect("provider");
        let mut seen = Vec::new();
        for _ in 0..4 {
            let mut stream = provider.next_image().expect("next image");
            seen.push(read_all(stream.as_mut()));
        }
        assert_eq!(seen, ["a.png", "b.png", "c.png", "a.png"]);
    }

    #[test]
    fn relists_on_wrap() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("a.png"), "a.png").expect("write fixture");

        let mut provider = FilesystemProvider::new(dir.path()).expect("provider");
        let mut stream = provider.next_image().expect("next image");
        assert_eq!(read_all(stream.as_mut()), "a.png");
        drop(stream);

        fs::write(dir.path().join("b.png"), "b.png").expect("write fixture");
        let mut second = provider.next_image().expect("next image");
        let mut third = provider.next_image().expect("next image");
        assert_eq!(read_all(second.as_mut()), "a.png");
        assert_eq!(read_all(third.as_mut()), "b.png");
    }

    #[test]
    fn empty_directory_is_exhausted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut provider = FilesystemProvider::new(dir.path()).expect("provider");
        assert!(matches!(
            provider.next_image(),
            Err(ProviderError::SourceExhausted)
        ));
    }

    #[test]
    fn shuffle_visits_every_entry_once_per_cycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["a.png", "b.png", "c.png", "d.png"] {
            fs::write(dir.path().join(name), name).expect("write fixture");
        }

        let mut provider =
            FilesystemProvider::with_mode(dir.path(), SelectionMode::Shuffle, 42).expect("provider");
        let mut cycle = BTreeSet::new();
        for _ in 0..4 {
            let mut stream = provider.next_image().expect("next image");
            cycle.insert(read_all(stream.as_mut()));
        }
        assert_eq!(cycle.len(), 4, "each entry served exactly once per cycle");
    }

    #[test]
    fn rejects_non_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").expect("write fixture");
        assert!(matches!(
            FilesystemProvider::new(&file),
            Err(ProviderError::NotADirectory(_))
        ));
    }
}
