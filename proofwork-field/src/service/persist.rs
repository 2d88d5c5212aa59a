//! Crash-safe file writes shared by the outbox and the job cache

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes `bytes` to `path` so that readers only ever see the old or the new
/// content: write a sibling temp file, flush it to disk, rename it over the
/// target, then flush the directory so the rename itself survives power loss.
///
/// This is blocking I/O. The documents are small (one queue, one job), so
/// async callers invoke it inline.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let tmp = temp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    sync_dir(parent)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

// Directories cannot be opened as files here; the rename is already durable.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = std::env::temp_dir().join(format!("proofwork-persist-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("state.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!temp_path(&path).exists());

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_write_atomic_flushes_directory_of_relative_path() {
        let name = format!("proofwork-persist-{}.json", uuid::Uuid::new_v4());
        let path = Path::new(&name);

        write_atomic(path, b"{}").unwrap();
        assert_eq!(fs::read(path).unwrap(), b"{}");
        assert!(sync_dir(Path::new(".")).is_ok());

        fs::remove_file(path).unwrap();
    }
}
