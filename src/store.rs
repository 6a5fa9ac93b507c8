use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::{Builder, TempDir};

use crate::drs::DrsIdentity;
use crate::error::DrsError;

#[derive(Debug, Clone)]
pub struct DrsLayout {
    root: Utf8PathBuf,
}

impl DrsLayout {
    pub fn open(root: impl Into<Utf8PathBuf>) -> Result<Self, DrsError> {
        let root = root.into();
        if !root.as_std_path().is_dir() {
            return Err(DrsError::InvalidDestination(root));
        }
        Ok(Self { root })
    }

    pub fn target_path(&self, identity: &DrsIdentity, extension: &str) -> Utf8PathBuf {
        self.root.join(identity.relative_path(extension))
    }

    pub fn place(
        &self,
        source: &Utf8Path,
        identity: &DrsIdentity,
        extension: &str,
    ) -> Result<Utf8PathBuf, DrsError> {
        let target = self.target_path(identity, extension);
        copy_file_atomic(source, &target)?;
        Ok(target)
    }

    pub fn scratch_dir(&self) -> Result<TempDir, DrsError> {
        Builder::new()
            .prefix(".cordex-drs-")
            .tempdir_in(self.root.as_std_path())
            .map_err(|err| DrsError::Filesystem(err.to_string()))
    }
}

pub fn copy_file_atomic(source: &Utf8Path, dest: &Utf8Path) -> Result<(), DrsError> {
    let parent = dest
        .parent()
        .ok_or_else(|| DrsError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| DrsError::Filesystem(err.to_string()))?;
    let temp = Builder::new()
        .prefix(".cordex-drs-file")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| DrsError::Filesystem(err.to_string()))?;
    fs::copy(source.as_std_path(), temp.path())
        .map_err(|err| DrsError::Filesystem(format!("copy {source}: {err}")))?;
    temp.persist(dest.as_std_path())
        .map_err(|err| DrsError::Filesystem(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn open_requires_existing_root() {
        let temp = tempfile::tempdir().unwrap();
        let missing = Utf8PathBuf::from_path_buf(temp.path().join("absent")).unwrap();
        assert_matches!(DrsLayout::open(missing), Err(DrsError::InvalidDestination(_)));
    }

    #[test]
    fn copy_overwrites_existing_target() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let source = root.join("source.nc");
        let dest = root.join("a/b/dest.nc");
        fs::write(source.as_std_path(), b"first").unwrap();
        copy_file_atomic(&source, &dest).unwrap();
        fs::write(source.as_std_path(), b"second").unwrap();
        copy_file_atomic(&source, &dest).unwrap();
        assert_eq!(fs::read(dest.as_std_path()).unwrap(), b"second");
    }

    #[test]
    fn scratch_dir_is_removed_on_drop() {
        let temp = tempfile::tempdir().unwrap();
        let layout = DrsLayout::open(Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap())
            .unwrap();
        let scratch = layout.scratch_dir().unwrap();
        let path = scratch.path().to_path_buf();
        fs::write(path.join("tas_2000-2005.nc"), b"x").unwrap();
        drop(scratch);
        assert!(!path.exists());
    }
}
