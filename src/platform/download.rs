/// Download sink: persists an export artifact under its suggested filename

use std::path::{Path, PathBuf};

use log::info;

use crate::{ExportArtifact, Result};

pub trait Downloader: Send + Sync {
    /// Save the artifact and return where it ended up
    fn save(&self, artifact: &ExportArtifact) -> Result<PathBuf>;
}

/// Writes artifacts into a directory, creating it on first use
pub struct DirectoryDownloader {
    dir: PathBuf,
}

impl DirectoryDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectoryDownloader { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Downloader for DirectoryDownloader {
    fn save(&self, artifact: &ExportArtifact) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&artifact.suggested_filename);
        std::fs::write(&path, &artifact.bytes)?;
        info!("saved {} ({} bytes)", path.display(), artifact.bytes.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_into_nested_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let d = DirectoryDownloader::new(tmp.path().join("out/qr"));
        let art = ExportArtifact {
            bytes: b"abc".to_vec(),
            mime_type: "image/png",
            suggested_filename: "x.png".into(),
        };
        let path = d.save(&art).unwrap();
        assert_eq!(path, tmp.path().join("out/qr/x.png"));
        assert_eq!(std::fs::read(path).unwrap(), b"abc");
    }
}
