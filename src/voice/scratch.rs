//! Scoped scratch buffers for in-flight audio
//!
//! Recorded and synthesized audio is materialized to disk only for the
//! duration of the adapter call that consumes it. Handles release their
//! backing file exactly once, on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;

use crate::Result;

/// Allocator for short-lived audio scratch files
///
/// Owns a private temp directory; everything under it is removed when
/// the `Scratch` itself is dropped, so even a leaked handle cannot
/// outlive the session.
pub struct Scratch {
    dir: TempDir,
    seq: AtomicUsize,
    live: Arc<AtomicUsize>,
}

impl Scratch {
    /// Create a scratch allocator with its own temp directory
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("agrivoice-").tempdir()?;
        tracing::debug!(path = %dir.path().display(), "scratch directory created");

        Ok(Self {
            dir,
            seq: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Materialize bytes to a scratch file and return its handle
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn acquire(&self, bytes: &[u8]) -> Result<ScratchHandle> {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.path().join(format!("clip-{n}"));
        std::fs::write(&path, bytes)?;

        self.live.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(path = %path.display(), bytes = bytes.len(), "scratch acquired");

        Ok(ScratchHandle {
            path: Some(path),
            live: Arc::clone(&self.live),
        })
    }

    /// Number of handles not yet released
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }
}

/// Exclusive owner of one scratch file
///
/// Released exactly once: explicitly via [`Self::release`], or on drop.
/// Double release is a no-op.
pub struct ScratchHandle {
    path: Option<PathBuf>,
    live: Arc<AtomicUsize>,
}

impl ScratchHandle {
    /// Path of the backing file, if not yet released
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the buffered bytes back
    ///
    /// # Errors
    ///
    /// Returns error if the handle was already released or the read fails
    pub fn read(&self) -> Result<Vec<u8>> {
        match &self.path {
            Some(path) => Ok(std::fs::read(path)?),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "scratch handle already released",
            )
            .into()),
        }
    }

    /// Remove the backing file; subsequent calls are no-ops
    ///
    /// A failed removal is logged and never surfaced: cleanup trouble
    /// must not block the pipeline.
    pub fn release(&mut self) {
        if let Some(path) = self.path.take() {
            self.live.fetch_sub(1, Ordering::Relaxed);
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "scratch cleanup failed");
            } else {
                tracing::trace!(path = %path.display(), "scratch released");
            }
        }
    }
}

impl Drop for ScratchHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_writes_bytes_and_read_returns_them() {
        let scratch = Scratch::new().unwrap();
        let handle = scratch.acquire(b"mp3 bytes").unwrap();

        assert_eq!(handle.read().unwrap(), b"mp3 bytes");
        assert!(handle.path().unwrap().exists());
    }

    #[test]
    fn release_removes_file_and_decrements_count() {
        let scratch = Scratch::new().unwrap();
        let mut handle = scratch.acquire(b"x").unwrap();
        let path = handle.path().unwrap().to_path_buf();
        assert_eq!(scratch.outstanding(), 1);

        handle.release();
        assert_eq!(scratch.outstanding(), 0);
        assert!(!path.exists());
        assert!(handle.read().is_err());
    }

    #[test]
    fn double_release_is_a_noop() {
        let scratch = Scratch::new().unwrap();
        let mut handle = scratch.acquire(b"x").unwrap();

        handle.release();
        handle.release();
        assert_eq!(scratch.outstanding(), 0);
    }

    #[test]
    fn drop_releases_the_handle() {
        let scratch = Scratch::new().unwrap();
        {
            let _handle = scratch.acquire(b"x").unwrap();
            assert_eq!(scratch.outstanding(), 1);
        }
        assert_eq!(scratch.outstanding(), 0);
    }

    #[test]
    fn handles_are_independent() {
        let scratch = Scratch::new().unwrap();
        let a = scratch.acquire(b"a").unwrap();
        let mut b = scratch.acquire(b"b").unwrap();

        b.release();
        assert_eq!(scratch.outstanding(), 1);
        assert_eq!(a.read().unwrap(), b"a");
    }
}
