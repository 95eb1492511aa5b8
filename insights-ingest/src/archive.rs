//! Export archive loading.
//!
//! A run validates the input path, extracts the zip into a private temp
//! directory, parses `conversations.json`, and removes the directory again
//! whether parsing succeeded or not.

use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use insights_core::{Conversations, InsightsError, Result};
use tempfile::TempDir;
use zip::ZipArchive;

pub const CONVERSATIONS_FILE: &str = "conversations.json";
const TEMP_PREFIX: &str = "chatgpt-insights-";

/// Resolve `path` to an absolute path and check it names an existing `.zip`.
///
/// Runs before anything touches the filesystem, so a rejected path never
/// leaves a temp directory behind. `.` and `..` are folded lexically, the
/// suffix check is case-sensitive.
pub fn validate_archive_path(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let absolute = normalize_lexically(&joined);

    if !absolute.exists() {
        return Err(InsightsError::FileNotFound { path: absolute });
    }

    if !absolute.to_string_lossy().ends_with(".zip") {
        return Err(InsightsError::NotZipFile { path: absolute });
    }

    Ok(absolute)
}

/// Fold `.` and `..` without touching the filesystem. `..` at the root stays
/// at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Temp directory owned by one run. Removed on drop; removal failures are
/// logged and swallowed.
#[derive(Debug)]
pub struct ExtractionDir {
    inner: Option<TempDir>,
}

impl ExtractionDir {
    pub fn create(temp_root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX);
        let dir = match temp_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        tracing::debug!(path = %dir.path().display(), "Created extraction directory");
        Ok(Self { inner: Some(dir) })
    }

    pub fn path(&self) -> &Path {
        self.inner
            .as_ref()
            .map(TempDir::path)
            .unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for ExtractionDir {
    fn drop(&mut self) {
        if let Some(dir) = self.inner.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed extraction directory"),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove extraction directory"
                ),
            }
        }
    }
}

/// Loads conversation exports. `temp_root` overrides where extraction
/// directories are created (the system temp dir by default).
#[derive(Debug, Clone, Default)]
pub struct ArchiveLoader {
    temp_root: Option<PathBuf>,
}

impl ArchiveLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temp_root(temp_root: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: Some(temp_root.into()),
        }
    }

    /// Validate, extract and parse the export at `path`.
    pub fn load(&self, path: &Path) -> Result<Conversations> {
        let archive_path = validate_archive_path(path)?;
        tracing::info!(path = %archive_path.display(), "Processing export archive");

        let dir = ExtractionDir::create(self.temp_root.as_deref())?;
        extract_archive(&archive_path, dir.path())?;

        let conversations_path = locate_conversations(dir.path())
            .ok_or_else(|| InsightsError::MissingConversations {
                path: archive_path.clone(),
            })?;
        let conversations = parse_conversations(&conversations_path)?;

        tracing::info!(conversations = conversations.len(), "Parsed conversation export");
        Ok(conversations)
    }
}

pub fn extract_archive(archive_path: &Path, destination: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    tracing::debug!(entries = archive.len(), "Extracting export archive");
    archive.extract(destination)?;
    Ok(())
}

/// `conversations.json` at the archive root, or one directory down (some
/// exports wrap everything in a single folder).
pub fn locate_conversations(root: &Path) -> Option<PathBuf> {
    let direct = root.join(CONVERSATIONS_FILE);
    if direct.is_file() {
        return Some(direct);
    }

    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    subdirs.sort();

    subdirs
        .into_iter()
        .map(|dir| dir.join(CONVERSATIONS_FILE))
        .find(|candidate| candidate.is_file())
}

pub fn parse_conversations(path: &Path) -> Result<Conversations> {
    let file = File::open(path)?;
    let conversations = serde_json::from_reader(BufReader::new(file))?;
    Ok(conversations)
}
