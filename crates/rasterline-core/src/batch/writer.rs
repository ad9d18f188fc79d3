//! Atomic output writes.
//!
//! Bytes go to a hidden temporary file in the target directory, which is
//! synced and then renamed over the target. A failed or cancelled item never
//! leaves a truncated output behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::pipeline::PipelineError;

/// Temporary sibling of `target` used while writing it.
pub fn temp_path_for(target: &Path) -> PathBuf {
    let parent = target.parent().unwrap_or(Path::new("."));
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    parent.join(format!(".{}.tmp.{}", file_name, std::process::id()))
}

/// Write `bytes` to `target` atomically.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let temp = temp_path_for(target);
    let fail = |e: std::io::Error| PipelineError::WriteFailure {
        path: target.to_path_buf(),
        message: e.to_string(),
    };

    let result = fs::File::create(&temp)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&temp, target));

    if let Err(e) = result {
        // Clean up temp file on failure
        let _ = fs::remove_file(&temp);
        return Err(fail(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_and_replaces() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("out.jpg");
        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"second");
        assert!(!temp_path_for(&target).exists());
    }

    #[test]
    fn test_missing_directory_is_write_failure() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("missing").join("out.jpg");
        let err = write_atomic(&target, b"x").unwrap_err();
        assert!(matches!(err, PipelineError::WriteFailure { .. }));
        assert!(!target.exists());
    }

    #[test]
    fn test_temp_name_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/out/a.png"));
        assert_eq!(temp.parent(), Some(Path::new("/out")));
        let name = temp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".a.png.tmp."));
    }
}
