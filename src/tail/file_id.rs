// SPDX-License-Identifier: Apache-2.0

//! File identity based on device and inode.
//!
//! Used to tell a recreated file apart from the one a descriptor already
//! points at, since the path alone stays the same across rotation.

use std::fs::File;
use std::io;

/// Device ID + inode number of an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    dev: u64,
    ino: u64,
}

impl FileId {
    /// Create a FileId from an open file handle.
    #[cfg(unix)]
    pub fn from_file(file: &File) -> io::Result<Self> {
        use std::os::unix::fs::MetadataExt;

        let metadata = file.metadata()?;
        Ok(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    /// File identity is not available on this platform.
    #[cfg(not(unix))]
    pub fn from_file(_file: &File) -> io::Result<Self> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "file identity requires unix metadata",
        ))
    }

    /// Whether two handles refer to the same file. Unknown identity never matches.
    pub fn same_file(a: &File, b: &File) -> bool {
        match (Self::from_file(a), Self::from_file(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.dev, self.ino)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_same_file_across_handles() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        fs::write(&path, b"x\n").unwrap();

        let a = File::open(&path).unwrap();
        let b = File::open(&path).unwrap();
        assert!(FileId::same_file(&a, &b));
    }

    #[test]
    fn test_recreated_file_differs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        fs::write(&path, b"old\n").unwrap();
        let old = File::open(&path).unwrap();

        fs::remove_file(&path).unwrap();
        fs::write(&path, b"new\n").unwrap();
        let new = File::open(&path).unwrap();

        // The old handle keeps its inode alive, so the new file cannot reuse it
        assert!(!FileId::same_file(&old, &new));
        assert_ne!(
            FileId::from_file(&old).unwrap().to_string(),
            FileId::from_file(&new).unwrap().to_string()
        );
    }
}
