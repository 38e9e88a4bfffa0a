use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::download::sanitize_component;
use crate::FetchResult;

/// Lays downloaded files out as `<base>/<class>/<section>/<file>`.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    base_path: PathBuf,
}

impl DiskStorage {
    pub fn new<P: AsRef<Path>>(base_path: P) -> FetchResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn section_dir(&self, class_name: &str, section_name: &str) -> FetchResult<PathBuf> {
        let path = self
            .base_path
            .join(sanitize_component(class_name))
            .join(sanitize_component(section_name));
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Writes `bytes` to `folder/file_name`, replacing any earlier copy.
    pub fn write_file(&self, folder: &Path, file_name: &str, bytes: &[u8]) -> FetchResult<PathBuf> {
        let final_path = folder.join(sanitize_component(file_name));
        fs::write(&final_path, bytes)?;
        debug!("Wrote {} bytes to {}", bytes.len(), final_path.display());
        Ok(final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_nested_section_folder() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path().join("out")).unwrap();

        let folder = storage.section_dir("CS 61A", "Lecture/Slides").unwrap();
        assert_eq!(folder, dir.path().join("out").join("CS 61A").join("Lecture_Slides"));
        assert!(folder.is_dir());

        // idempotent
        assert_eq!(storage.section_dir("CS 61A", "Lecture/Slides").unwrap(), folder);
    }

    #[test]
    fn writes_and_overwrites_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path()).unwrap();
        let folder = storage.section_dir("Class", "Section").unwrap();

        let path = storage.write_file(&folder, "notes.pdf", b"first").unwrap();
        storage.write_file(&folder, "notes.pdf", b"second").unwrap();

        assert_eq!(path, folder.join("notes.pdf"));
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn file_names_cannot_escape_the_folder() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path()).unwrap();
        let folder = storage.section_dir("Class", "Section").unwrap();

        let path = storage.write_file(&folder, "../../evil.pdf", b"x").unwrap();
        assert_eq!(path.parent().unwrap(), folder);
    }
}
