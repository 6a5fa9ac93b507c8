use std::fs;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::DrsError;

pub fn discover_files(
    root: &Utf8Path,
    extension: &str,
    recursive: bool,
) -> Result<Vec<Utf8PathBuf>, DrsError> {
    if !root.as_std_path().is_dir() {
        return Err(DrsError::InvalidSource(root.to_path_buf()));
    }
    let mut files = Vec::new();
    for path in walk_dir(root.as_std_path(), recursive)? {
        let matches_ext = path
            .extension()
            .and_then(|value| value.to_str())
            .map(|value| value.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if !path.is_file() || !matches_ext {
            continue;
        }
        let path = Utf8PathBuf::from_path_buf(path)
            .map_err(|path| DrsError::InvalidFileName(path.display().to_string()))?;
        files.push(path);
    }
    files.sort();
    Ok(files)
}

fn walk_dir(root: &Path, recursive: bool) -> Result<Vec<PathBuf>, DrsError> {
    let mut items = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        let entries = fs::read_dir(&path).map_err(|err| DrsError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| DrsError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                let hidden = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with('.'))
                    .unwrap_or(false);
                if recursive && !hidden {
                    stack.push(path.clone());
                }
            }
            items.push(path);
        }
    }
    Ok(items)
}
