//! The file capability backing `r`/`R`/`w`/`W`. Kept behind a small
//! trait so the runtime never calls `std::fs` directly, matching the
//! distilled spec's "external collaborator" framing for I/O.
//!
//! `go-sed`'s equivalents (`rStmt`/`wStmt`/`r2Stmt`/`w2Stmt` in
//! `ast.go`) are unimplemented stubs ("// To be implemented"), so this
//! module is written fresh, in the idiom the rest of the
//! `posixutils-rs` utilities use directly (`std::fs`/`std::io`).

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, SedError};

pub trait FileIo {
    /// Reads a whole file's contents. A missing file is treated as
    /// empty, not an error, matching `r`'s documented behavior.
    fn read_whole(&self, path: &Path) -> Result<Vec<u8>>;

    /// Appends `bytes` to `path`, creating it if necessary. The
    /// handle for a given path is opened on first use and reused for
    /// the lifetime of the `FileIo` value (one `Run`). `truncate_first`
    /// controls whether that first open discards the file's existing
    /// contents (the `append_file` option, §6) or preserves them.
    fn write_append(&mut self, path: &Path, bytes: &[u8], truncate_first: bool) -> Result<()>;
}

/// Default `FileIo` backed by `std::fs`, scoped to one `Run`: open
/// write handles are flushed and closed (via `Drop`) when this value
/// goes out of scope.
#[derive(Default)]
pub struct StdFileIo {
    open_writers: HashMap<PathBuf, File>,
}

impl FileIo for StdFileIo {
    fn read_whole(&self, path: &Path) -> Result<Vec<u8>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(SedError::FileOpen {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    fn write_append(&mut self, path: &Path, bytes: &[u8], truncate_first: bool) -> Result<()> {
        if !self.open_writers.contains_key(path) {
            let mut opts = OpenOptions::new();
            opts.create(true);
            if truncate_first {
                opts.write(true).truncate(true);
            } else {
                opts.append(true);
            }
            let file = opts.open(path).map_err(|source| SedError::FileOpen {
                path: path.to_path_buf(),
                source,
            })?;
            self.open_writers.insert(path.to_path_buf(), file);
        }
        let file = self.open_writers.get_mut(path).expect("just inserted");
        file.write_all(bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_empty() {
        let io = StdFileIo::default();
        let bytes = io.read_whole(Path::new("/nonexistent/does/not/exist")).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn write_append_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut io = StdFileIo::default();
        io.write_append(&path, b"a\n", true).unwrap();
        io.write_append(&path, b"b\n", true).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "a\nb\n");
    }

    #[test]
    fn truncate_first_discards_preexisting_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "stale\n").unwrap();
        let mut io = StdFileIo::default();
        io.write_append(&path, b"fresh\n", true).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "fresh\n");
    }

    #[test]
    fn append_file_option_preserves_preexisting_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "stale\n").unwrap();
        let mut io = StdFileIo::default();
        io.write_append(&path, b"fresh\n", false).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "stale\nfresh\n");
    }
}
