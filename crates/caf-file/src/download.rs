use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::FileResult;

/// Where a [`LocalCopy`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopySource {
    /// The storage's own download capability.
    Native,
    /// Streamed from the storage into a fresh temp file.
    Streamed,
}

/// A local temporary file holding downloaded content, positioned at the
/// start.
///
/// The file is deleted from disk when the copy is closed or dropped.
pub struct LocalCopy {
    file: NamedTempFile,
    source: CopySource,
}

impl LocalCopy {
    pub(crate) fn new(file: NamedTempFile, source: CopySource) -> Self {
        Self { file, source }
    }

    /// Path of the temp file while it exists.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn source(&self) -> CopySource {
        self.source
    }

    /// Size of the copy in bytes.
    pub fn len(&self) -> FileResult<u64> {
        Ok(self.file.as_file().metadata()?.len())
    }

    pub fn is_empty(&self) -> FileResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Read the whole copy from the start.
    pub fn read_all(&mut self) -> FileResult<Vec<u8>> {
        self.file.rewind()?;
        let mut buf = Vec::new();
        self.file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Close and delete the temp file, reporting deletion errors.
    pub fn close(self) -> FileResult<()> {
        self.file.close()?;
        Ok(())
    }
}

impl Read for LocalCopy {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for LocalCopy {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl Write for LocalCopy {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl fmt::Debug for LocalCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCopy")
            .field("path", &self.file.path())
            .field("source", &self.source)
            .finish()
    }
}
