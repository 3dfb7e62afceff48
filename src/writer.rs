use crate::error::{Error, Result};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tracing::debug;

/// Writes output files with atomic replace semantics.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Writer {
    backup_existing: bool,
}

impl Writer {
    pub(crate) const fn new(backup_existing: bool) -> Self {
        Self { backup_existing }
    }

    /// Writes `content` to `path`, replacing any existing file.
    ///
    /// # Process
    ///
    /// 1. Creates missing parent directories
    /// 2. Creates a backup if the file exists and backups are enabled
    /// 3. Writes content to a temporary sibling file and syncs it
    /// 4. Renames the temporary file over the target
    ///
    /// An interrupted run leaves the previous file intact.
    ///
    /// # Errors
    ///
    /// Returns an error if any filesystem operation fails.
    pub(crate) fn write(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        if path.exists() && self.backup_existing {
            Self::backup_file(path)?;
        }

        let temp_path = temp_path_for(path);
        let mut temp_file = fs::File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;

        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| Error::io(&temp_path, e))?;

        temp_file
            .sync_all()
            .map_err(|e| Error::io(&temp_path, e))?;

        drop(temp_file);

        fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;

        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }

    /// Creates a timestamped backup of an existing file.
    fn backup_file(path: &Path) -> Result<PathBuf> {
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_nanos();

        let filename = path
            .file_name()
            .ok_or_else(|| Error::config("Invalid file path"))?
            .to_string_lossy();

        let backup_path = path.with_file_name(format!("{filename}.backup.{timestamp}"));

        fs::copy(path, &backup_path).map_err(|e| Error::io(&backup_path, e))?;

        debug!("Created backup: {}", backup_path.display());
        Ok(backup_path)
    }
}

/// `reference.md` -> `.reference.md.tmp`, next to the target.
fn temp_path_for(path: &Path) -> PathBuf {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{filename}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_write_creates_parent_directories() {
        let temp = assert_fs::TempDir::new().unwrap();
        let target = temp.child("out/nested/macros_used.txt");

        Writer::new(false).write(target.path(), "\\alpha\n").unwrap();

        target.assert("\\alpha\n");
    }

    #[test]
    fn test_write_overwrites() {
        let temp = assert_fs::TempDir::new().unwrap();
        let target = temp.child("reference.md");
        target.write_str("old content that is longer").unwrap();

        Writer::new(false).write(target.path(), "new").unwrap();

        target.assert("new");
        let entries = fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_write_creates_backup() {
        let temp = assert_fs::TempDir::new().unwrap();
        let target = temp.child("reference.md");
        target.write_str("old content").unwrap();

        Writer::new(true).write(target.path(), "new").unwrap();

        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();

        assert!(names.iter().any(|name| name.starts_with("reference.md.backup.")));
        target.assert("new");
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let temp = temp_path_for(Path::new("out/reference.md"));
        assert_eq!(temp, PathBuf::from("out/.reference.md.tmp"));
    }
}
