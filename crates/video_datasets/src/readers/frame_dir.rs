use anyhow::{anyhow, bail, ensure, Context, Result};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One stored episode/video: a directory of sequentially named frame files.
///
/// Filenames are listed once at discovery and kept in lexicographic order, so
/// sampling never touches the directory listing again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    root_path: PathBuf,
    filenames: Vec<String>,
}

impl SequenceRecord {
    pub fn new(root_path: impl Into<PathBuf>, mut filenames: Vec<String>) -> Self {
        filenames.sort();
        Self {
            root_path: root_path.into(),
            filenames,
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn frame_count(&self) -> usize {
        self.filenames.len()
    }

    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    /// Full paths of the frames in `range`, in playback order.
    pub fn frame_paths(&self, range: Range<usize>) -> Result<Vec<PathBuf>> {
        ensure!(
            range.end <= self.filenames.len(),
            "Frame range {:?} exceeds the {} frames of {}",
            range,
            self.filenames.len(),
            self.root_path.display()
        );
        Ok(self.filenames[range]
            .iter()
            .map(|name| self.root_path.join(name))
            .collect())
    }
}

/// Ordered list of [`SequenceRecord`]s, built once when a dataset is constructed.
///
/// # Layout
/// ```text
/// root/
/// ├── 0000/  0000.png 0001.png ...
/// ├── 0001/  0000.png 0001.png ...
/// └── ...
/// ```
///
/// # Example
/// ```ignore
/// // Sequences 466..=516 of the training folder, PNG frames only.
/// let catalog = DatasetCatalog::discover("Ms_Pacman/Train", &["png"], Some((466, 516)))?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct DatasetCatalog {
    records: Vec<SequenceRecord>,
}

impl DatasetCatalog {
    pub fn new(records: Vec<SequenceRecord>) -> Result<Self> {
        ensure!(!records.is_empty(), "Dataset catalog must not be empty");
        Ok(Self { records })
    }

    /// Scans `root` for numbered sequence directories.
    ///
    /// # Arguments
    /// - `root`: Directory whose subdirectories are the sequences.
    /// - `extensions`: Frame file extensions to keep (case-insensitive).
    /// - `index_range`: Inclusive `(start, end)` over the sorted subdirectories, used
    ///   for train/valid splits. `end` is clamped to the last directory.
    pub fn discover(
        root: impl AsRef<Path>,
        extensions: &[&str],
        index_range: Option<(usize, usize)>,
    ) -> Result<Self> {
        let root = root.as_ref();
        let metadata = fs::metadata(root)
            .with_context(|| format!("Failed to access frame directory: {}", root.display()))?;
        if !metadata.is_dir() {
            bail!("Path is not a directory: {}", root.display());
        }

        let mut sequence_dirs = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| anyhow!("Failed to read directory entry: {}", e))?;
            if entry.file_type().is_dir() {
                sequence_dirs.push(entry.into_path());
            }
        }

        let sequence_dirs = select_index_range(sequence_dirs, index_range)
            .with_context(|| format!("Failed to select sequences in {}", root.display()))?;

        let extensions: Vec<String> = extensions.iter().map(|e| e.to_lowercase()).collect();
        let records = sequence_dirs
            .into_iter()
            .map(|dir| list_frames(&dir, &extensions).map(|names| SequenceRecord::new(dir, names)))
            .collect::<Result<Vec<_>>>()?;

        ensure!(
            !records.is_empty(),
            "No sequence directories found in {}",
            root.display()
        );
        log::info!(
            "Discovered {} sequences ({} frames) in {}",
            records.len(),
            records.iter().map(SequenceRecord::frame_count).sum::<usize>(),
            root.display()
        );
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SequenceRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[SequenceRecord] {
        &self.records
    }

    /// Length of the shortest sequence in the catalog.
    pub fn min_frame_count(&self) -> usize {
        self.records
            .iter()
            .map(SequenceRecord::frame_count)
            .min()
            .unwrap_or(0)
    }
}

fn list_frames(dir: &Path, extensions: &[String]) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| anyhow!("Failed to read directory entry: {}", e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let extension_matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.contains(&e.to_lowercase()));
        if extension_matches {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_owned());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Keeps the entries of the inclusive `(start, end)` range, `end` clamped to the
/// last entry. `None` keeps everything.
pub(crate) fn select_index_range<T>(
    mut items: Vec<T>,
    index_range: Option<(usize, usize)>,
) -> Result<Vec<T>> {
    if let Some((start, end)) = index_range {
        ensure!(
            start <= end,
            "Invalid index range ({}, {}): start must not exceed end",
            start,
            end
        );
        ensure!(
            start < items.len(),
            "Index range starts at {} but only {} entries exist",
            start,
            items.len()
        );
        let end = end.min(items.len() - 1);
        items.truncate(end + 1);
        items.drain(..start);
    }
    Ok(items)
}
