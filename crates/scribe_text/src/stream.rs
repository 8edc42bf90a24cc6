//! Font data sources
//!
//! Font files are reached through seekable streams rather than whole-file
//! buffers. A [`FontDataSource`] resolves a font name to a [`FontStream`];
//! the stream supports arbitrary-offset reads and reports end of data by
//! returning zero bytes. Dropping a stream releases the underlying handle.

use crate::{Result, TextError};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Chunk size used by [`read_to_end`]
const READ_CHUNK: usize = 16 * 1024;

/// A seekable, read-only view of font file bytes
pub trait FontStream {
    /// Total size of the stream in bytes
    fn size(&self) -> u64;

    /// Read up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes copied. Reads that start past the end,
    /// short reads and I/O failures return what was actually read, which is
    /// zero for a failed read.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> usize;
}

/// Resolves font names to streams
pub trait FontDataSource {
    /// Open the named font. Unknown names yield [`TextError::SourceNotFound`].
    fn open(&mut self, name: &str) -> Result<Box<dyn FontStream>>;
}

/// Read a whole stream through `read_at`, stopping at the first empty read
pub fn read_to_end(stream: &mut dyn FontStream) -> Vec<u8> {
    let size = stream.size() as usize;
    let mut data = Vec::with_capacity(size);
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut offset = 0u64;

    loop {
        let read = stream.read_at(offset, &mut chunk);
        if read == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..read]);
        offset += read as u64;
    }

    data
}

/// Stream over a file on disk
pub struct FileStream {
    file: File,
    size: u64,
}

impl FileStream {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self { file, size })
    }
}

impl FontStream for FileStream {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> usize {
        if buf.is_empty() || offset >= self.size {
            return 0;
        }
        if self.file.seek(SeekFrom::Start(offset)).is_err() {
            return 0;
        }

        let mut total = 0;
        while total < buf.len() {
            match self.file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!("Font stream read failed at offset {}: {}", offset, e);
                    break;
                }
            }
        }
        total
    }
}

/// Resolves names against a list of directories, first match wins
#[derive(Debug, Default, Clone)]
pub struct FileSystemSource {
    roots: Vec<PathBuf>,
}

impl FileSystemSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source searching the given directories in order
    pub fn with_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let direct = Path::new(name);
        if direct.is_absolute() {
            return direct.is_file().then(|| direct.to_path_buf());
        }
        if self.roots.is_empty() {
            return direct.is_file().then(|| direct.to_path_buf());
        }
        self.roots
            .iter()
            .map(|root| root.join(name))
            .find(|candidate| candidate.is_file())
    }
}

impl FontDataSource for FileSystemSource {
    fn open(&mut self, name: &str) -> Result<Box<dyn FontStream>> {
        let path = self
            .resolve(name)
            .ok_or_else(|| TextError::SourceNotFound(name.to_string()))?;
        tracing::debug!("Opening font stream {}", path.display());
        Ok(Box::new(FileStream::open(&path)?))
    }
}

/// Stream over a shared in-memory buffer
pub struct MemoryStream {
    data: Arc<[u8]>,
}

impl MemoryStream {
    pub fn new(data: Arc<[u8]>) -> Self {
        Self { data }
    }
}

impl FontStream for MemoryStream {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> usize {
        let Ok(start) = usize::try_from(offset) else {
            return 0;
        };
        if start >= self.data.len() {
            return 0;
        }
        let count = buf.len().min(self.data.len() - start);
        buf[..count].copy_from_slice(&self.data[start..start + count]);
        count
    }
}

/// Named in-memory font blobs (bundled or embedded fonts)
#[derive(Default, Clone)]
pub struct MemorySource {
    blobs: FxHashMap<String, Arc<[u8]>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a named blob
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Arc<[u8]>>) {
        self.blobs.insert(name.into(), data.into());
    }

    pub fn with(mut self, name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        self.insert(name, data);
        self
    }
}

impl FontDataSource for MemorySource {
    fn open(&mut self, name: &str) -> Result<Box<dyn FontStream>> {
        self.blobs
            .get(name)
            .map(|data| Box::new(MemoryStream::new(Arc::clone(data))) as Box<dyn FontStream>)
            .ok_or_else(|| TextError::SourceNotFound(name.to_string()))
    }
}

impl std::fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.blobs.keys().collect();
        names.sort();
        f.debug_struct("MemorySource").field("blobs", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(bytes: &[u8]) -> MemoryStream {
        MemoryStream::new(Arc::from(bytes))
    }

    #[test]
    fn test_read_at_offsets() {
        let mut s = stream(b"0123456789");
        let mut buf = [0u8; 4];

        assert_eq!(s.read_at(2, &mut buf), 4);
        assert_eq!(&buf, b"2345");

        // Short read at the tail
        assert_eq!(s.read_at(8, &mut buf), 2);
        assert_eq!(&buf[..2], b"89");
    }

    #[test]
    fn test_read_past_end_is_zero() {
        let mut s = stream(b"abc");
        let mut buf = [0u8; 8];
        assert_eq!(s.read_at(3, &mut buf), 0);
        assert_eq!(s.read_at(u64::MAX, &mut buf), 0);
        assert_eq!(s.read_at(0, &mut []), 0);
    }

    #[test]
    fn test_read_to_end_spans_chunks() {
        let bytes: Vec<u8> = (0..READ_CHUNK * 2 + 17).map(|i| (i % 251) as u8).collect();
        let mut s = stream(&bytes);
        assert_eq!(read_to_end(&mut s), bytes);
    }

    #[test]
    fn test_memory_source_not_found() {
        let mut source = MemorySource::new().with("a.ttf", b"data".to_vec());
        assert!(source.open("a.ttf").is_ok());
        assert!(matches!(
            source.open("missing.ttf"),
            Err(TextError::SourceNotFound(name)) if name == "missing.ttf"
        ));
    }

    #[test]
    fn test_file_stream_roundtrip() {
        let dir = std::env::temp_dir().join(format!("scribe_stream_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("font.bin"), b"hello font").unwrap();

        let mut source = FileSystemSource::with_roots([&dir]);
        let mut s = source.open("font.bin").unwrap();
        assert_eq!(s.size(), 10);

        let mut buf = [0u8; 4];
        assert_eq!(s.read_at(6, &mut buf), 4);
        assert_eq!(&buf, b"font");
        assert_eq!(s.read_at(10, &mut buf), 0);

        assert!(source.open("nope.bin").is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
