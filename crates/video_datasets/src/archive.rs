use anyhow::{ensure, Result};
use std::path::{Path, PathBuf};

/// Turns a dataset archive into the directory holding its unpacked content.
pub trait ArchiveExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<PathBuf>;
}

/// Extractor for archives that were unpacked ahead of time.
///
/// The archive itself must still be present (a missing archive means the dataset
/// was never fetched). The unpacked directory is `dest/unpacked_name`, or
/// `dest/<archive stem>` when no name is given.
///
/// # Example
/// ```ignore
/// let root = PreExtracted::default().extract(Path::new("data/Ms_Pacman.zip"), Path::new("data"))?;
/// // root == "data/Ms_Pacman"
/// ```
#[derive(Debug, Clone, Default)]
pub struct PreExtracted {
    pub unpacked_name: Option<String>,
}

impl PreExtracted {
    pub fn named(unpacked_name: impl Into<String>) -> Self {
        Self {
            unpacked_name: Some(unpacked_name.into()),
        }
    }
}

impl ArchiveExtractor for PreExtracted {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<PathBuf> {
        ensure!(
            archive.is_file(),
            "Dataset archive not found: {}",
            archive.display()
        );

        let name = match &self.unpacked_name {
            Some(name) => name.clone(),
            None => archive
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_owned)
                .ok_or_else(|| anyhow::anyhow!("Archive has no file name: {}", archive.display()))?,
        };
        let unpacked = dest.join(name);
        ensure!(
            unpacked.is_dir(),
            "Archive {} has not been unpacked to {}",
            archive.display(),
            unpacked.display()
        );
        Ok(unpacked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn resolves_unpacked_directory() -> Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("Ms_Pacman.zip");
        fs::write(&archive, b"PK")?;
        fs::create_dir(dir.path().join("Ms_Pacman"))?;
        fs::create_dir(dir.path().join("ucfTrainTestlist"))?;

        let root = PreExtracted::default().extract(&archive, dir.path())?;
        assert_eq!(root, dir.path().join("Ms_Pacman"));

        let named = PreExtracted::named("ucfTrainTestlist").extract(&archive, dir.path())?;
        assert_eq!(named, dir.path().join("ucfTrainTestlist"));
        Ok(())
    }

    #[test]
    fn missing_archive_or_content_fails() -> Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("Ms_Pacman.zip");
        assert!(PreExtracted::default().extract(&archive, dir.path()).is_err());

        fs::write(&archive, b"PK")?;
        assert!(PreExtracted::default().extract(&archive, dir.path()).is_err());
        Ok(())
    }
}
