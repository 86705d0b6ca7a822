use crate::domain::error::{AppError, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

fn io_err(msg: impl Into<String>) -> AppError {
    AppError::IoError(msg.into())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || path.exists() {
        return Ok(());
    }
    fs::create_dir_all(path)
        .map_err(|e| io_err(format!("Failed to create dir {}: {e}", path.display())))
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) => ensure_dir(parent),
        None => Ok(()),
    }
}

/// Writes `bytes` to a sibling temp file, then renames it over `path`.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;

    let tmp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    {
        let mut file = fs::File::create(&tmp_path).map_err(|e| {
            io_err(format!(
                "Failed to create temp file {}: {e}",
                tmp_path.display()
            ))
        })?;
        if let Err(e) = file.write_all(bytes) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_err(format!(
                "Failed to write temp file {}: {e}",
                tmp_path.display()
            )));
        }
        file.sync_all().ok();
    }

    // Rename cannot replace an existing file on Windows; move the old one away first.
    if path.exists() {
        let backup = path.with_extension(format!("bak-{}", Uuid::new_v4()));
        fs::rename(path, &backup).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            io_err(format!(
                "Failed to move existing file {} to {}: {e}",
                path.display(),
                backup.display()
            ))
        })?;

        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::rename(&backup, path);
            let _ = fs::remove_file(&tmp_path);
            return Err(io_err(format!(
                "Failed to rename temp file {} to {}: {e}",
                tmp_path.display(),
                path.display()
            )));
        }

        let _ = fs::remove_file(&backup);
        Ok(())
    } else {
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            io_err(format!(
                "Failed to rename temp file {} to {}: {e}",
                tmp_path.display(),
                path.display()
            ))
        })
    }
}

/// Size in bytes, or 0 when the file is missing or unreadable.
pub fn file_size_or_zero(path: &Path) -> u64 {
    fs::metadata(path).map(|meta| meta.len()).unwrap_or(0)
}
