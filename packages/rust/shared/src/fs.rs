//! Filesystem helpers.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, Sheet2XmlError};

/// Write `contents` to `path` atomically: write a sibling temp file, then rename.
///
/// Parent directories are created. On failure the temp file is removed and
/// `path` is left untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path.file_name().ok_or_else(|| {
        Sheet2XmlError::validation(format!("not a file path: {}", path.display()))
    })?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| Sheet2XmlError::io(&parent, e))?;

    let temp = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));

    let written = write_and_sync(&temp, contents)
        .and_then(|()| std::fs::rename(&temp, path).map_err(|e| Sheet2XmlError::io(path, e)));

    if written.is_err() {
        let _ = std::fs::remove_file(&temp);
    }
    written
}

fn write_and_sync(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| Sheet2XmlError::io(path, e))?;
    file.write_all(contents)
        .and_then(|()| file.sync_all())
        .map_err(|e| Sheet2XmlError::io(path, e))
}
