use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;

pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Writes `payload` into `tmp_dir` and renames it over `destination`.
pub fn replace_file_atomically(tmp_dir: &Path, destination: &Path, payload: &[u8]) -> Result<()> {
    fs::create_dir_all(tmp_dir)
        .with_context(|| format!("failed to create {}", tmp_dir.display()))?;

    let file_name = destination
        .file_name()
        .and_then(|v| v.to_str())
        .with_context(|| format!("invalid destination path: {}", destination.display()))?;
    let staged = tmp_dir.join(format!("{file_name}.{}.tmp", std::process::id()));

    if let Err(err) = fs::write(&staged, payload) {
        let _ = remove_file_if_exists(&staged);
        return Err(err).with_context(|| format!("failed to stage {}", staged.display()));
    }

    if let Err(err) = fs::rename(&staged, destination) {
        let _ = remove_file_if_exists(&staged);
        return Err(err).with_context(|| {
            format!(
                "failed to move {} into place at {}",
                staged.display(),
                destination.display()
            )
        });
    }

    Ok(())
}
