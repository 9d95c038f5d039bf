use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

/// Flat on-disk store for uploaded thumbnails and audio.
///
/// Each file lives at `{dir}/{uuid}.{ext}`; that file name is the reference
/// saved in the `brocats` table and served under `/media`.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, reference: &str) -> Result<PathBuf> {
        if reference.is_empty() || reference.contains(['/', '\\']) || reference.starts_with('.') {
            bail!("Invalid file reference: {}", reference);
        }
        Ok(self.dir.join(reference))
    }

    /// Write `data` under a fresh name and return its reference.
    pub async fn save(&self, extension: &str, data: &[u8]) -> Result<String> {
        let reference = format!("{}.{}", Uuid::new_v4(), extension);
        fs::write(self.file_path(&reference)?, data).await?;
        Ok(reference)
    }

    pub async fn delete(&self, reference: &str) -> Result<()> {
        let path = self.file_path(reference)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted upload {}", reference);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Upload {} already gone", reference);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path().join("uploads")).await.unwrap();

        let reference = storage.save("png", b"fake image").await.unwrap();
        assert!(reference.ends_with(".png"));
        let path = storage.file_path(&reference).unwrap();
        assert_eq!(fs::read(&path).await.unwrap(), b"fake image");

        storage.delete(&reference).await.unwrap();
        assert!(!path.exists());
        storage.delete(&reference).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path().to_path_buf()).await.unwrap();
        assert!(storage.file_path("../etc/passwd").is_err());
        assert!(storage.file_path("..").is_err());
        assert!(storage.file_path("").is_err());
    }
}
