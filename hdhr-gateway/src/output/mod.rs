//! Generated artifacts and their on-disk store.
//!
//! Every artifact is rendered fully in memory and then committed by writing
//! a temporary sibling file and renaming it over the target, so readers see
//! either the previous file or the new one.

pub mod playlist;

use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{GatewayError, Result};

pub use playlist::PlaylistGenerator;

/// The two files the gateway produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Playlist,
    Guide,
}

impl Artifact {
    pub fn file_name(&self) -> &'static str {
        match self {
            Artifact::Playlist => "playlist.m3u",
            Artifact::Guide => "epg.xml",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Artifact::Playlist => "audio/x-mpegurl",
            Artifact::Guide => "application/xml",
        }
    }

    /// Human-readable name for logs and error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Artifact::Playlist => "Playlist",
            Artifact::Guide => "EPG",
        }
    }
}

/// Directory holding the generated artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }

    fn temp_path(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(format!(".{}.tmp", artifact.file_name()))
    }

    /// Create the output directory if needed.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Replace an artifact with `contents` as a single unit.
    pub async fn commit(&self, artifact: Artifact, contents: &str) -> Result<()> {
        let write_error = |e: io::Error| GatewayError::ArtifactWrite {
            artifact: artifact.display_name(),
            reason: e.to_string(),
        };

        self.ensure_dir().await.map_err(write_error)?;

        let temp = self.temp_path(artifact);
        let target = self.path(artifact);
        tokio::fs::write(&temp, contents.as_bytes())
            .await
            .map_err(write_error)?;
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(write_error(e));
        }

        info!(
            "{} updated: {} bytes written to {}",
            artifact.display_name(),
            contents.len(),
            target.display()
        );
        Ok(())
    }

    /// Read an artifact; `None` if it has not been generated yet.
    pub async fn read(&self, artifact: Artifact) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(artifact)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} not generated yet", artifact.display_name());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_and_read() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path().join("static"));

        assert_eq!(store.read(Artifact::Playlist).await.unwrap(), None);

        store.commit(Artifact::Playlist, "#EXTM3U").await.unwrap();
        assert_eq!(
            store.read(Artifact::Playlist).await.unwrap().as_deref(),
            Some(&b"#EXTM3U"[..])
        );
        assert!(!store.temp_path(Artifact::Playlist).exists());
        assert_eq!(store.read(Artifact::Guide).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_commit_replaces_previous_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());

        store.commit(Artifact::Guide, "first version").await.unwrap();
        store.commit(Artifact::Guide, "second").await.unwrap();

        let contents = std::fs::read_to_string(store.path(Artifact::Guide)).unwrap();
        assert_eq!(contents, "second");
    }

    #[tokio::test]
    async fn test_commit_reports_write_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let store = ArtifactStore::new(&blocker);

        let result = store.commit(Artifact::Playlist, "#EXTM3U").await;
        assert!(matches!(
            result,
            Err(GatewayError::ArtifactWrite { artifact: "Playlist", .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_readers_never_see_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let big_a = "a".repeat(256 * 1024);
        let big_b = "b".repeat(256 * 1024);
        store.commit(Artifact::Guide, &big_a).await.unwrap();

        let reader_store = store.clone();
        let reader = tokio::spawn(async move {
            for _ in 0..200 {
                let bytes = reader_store.read(Artifact::Guide).await.unwrap().unwrap();
                assert_eq!(bytes.len(), 256 * 1024);
                assert!(bytes.iter().all(|&b| b == bytes[0]));
                tokio::task::yield_now().await;
            }
        });

        for i in 0..20 {
            let contents = if i % 2 == 0 { &big_b } else { &big_a };
            store.commit(Artifact::Guide, contents).await.unwrap();
        }
        reader.await.unwrap();
    }
}
