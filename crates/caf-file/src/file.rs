use std::cell::OnceCell;
use std::fmt;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use caf_crypto::ContentHasher;
use caf_store::{ContentStream, Storage, StorageRegistry, UrlOptions};
use caf_types::{ContentId, HashFunction, Multihash, MultihashError};
use tracing::debug;

use crate::config::FileConfig;
use crate::download::{CopySource, LocalCopy};
use crate::error::{FileError, FileResult, Operation};
use crate::resolve::{self, DeleteReport, ProbeReport};

/// Session state of a handle.
enum Session {
    Closed,
    Open {
        stream: Box<dyn ContentStream>,
        storage: Arc<dyn Storage>,
    },
}

/// A handle on content identified only by its content address.
///
/// Which storage holds the content is decided at call time: every operation
/// scans the registry in registration order and uses the first storage that
/// reports holding the id (the *pin*). The pin is only remembered while a
/// stream is open.
///
/// ```text
/// CLOSED --open--> OPEN --close | scope exit | error--> CLOSED
/// ```
///
/// Equality and hashing use the content address alone (the segment after the
/// last `/`, hex compared case-insensitively), so handles differing only in
/// path prefix are equal.
pub struct ContentAddressableFile {
    id: ContentId,
    registry: StorageRegistry,
    config: FileConfig,
    decoded: OnceCell<Result<Multihash, MultihashError>>,
    session: Session,
}

impl ContentAddressableFile {
    /// A handle resolving through the process-wide registry.
    pub fn new(id: impl Into<ContentId>) -> Self {
        Self::with_registry(id, StorageRegistry::global())
    }

    /// A handle resolving through `registry`.
    pub fn with_registry(id: impl Into<ContentId>, registry: &StorageRegistry) -> Self {
        Self {
            id: id.into(),
            registry: registry.clone(),
            config: FileConfig::default(),
            decoded: OnceCell::new(),
            session: Session::Closed,
        }
    }

    /// Register the storage that produced `id`, then return a handle for it.
    pub fn adopt(
        registry: &StorageRegistry,
        storage: Arc<dyn Storage>,
        id: impl Into<ContentId>,
    ) -> Self {
        registry.register([storage]);
        Self::with_registry(id, registry)
    }

    pub fn with_config(mut self, config: FileConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id(&self) -> &ContentId {
        &self.id
    }

    /// The segment of the id after the last `/`.
    pub fn content_address(&self) -> &str {
        self.id.content_address()
    }

    pub fn registry(&self) -> &StorageRegistry {
        &self.registry
    }

    // ---- Digest accessors ----

    /// Decode the content address. Decoded once, on first use.
    ///
    /// Succeeding only shows the id is shaped like a multihash; proving it
    /// names the content requires fetching and hashing it again.
    pub fn decode(&self) -> FileResult<&Multihash> {
        self.decoded
            .get_or_init(|| self.id.decode())
            .as_ref()
            .map_err(|e| FileError::InvalidMultihash {
                id: self.id.clone(),
                source: e.clone(),
            })
    }

    pub fn digest(&self) -> FileResult<&[u8]> {
        Ok(self.decode()?.digest())
    }

    pub fn digest_length(&self) -> FileResult<usize> {
        Ok(self.decode()?.length())
    }

    pub fn digest_hash_function(&self) -> FileResult<HashFunction> {
        Ok(self.decode()?.function())
    }

    /// Fetch the content and check that it hashes to the content address.
    ///
    /// Uses the hash function recorded in the address. A function with no
    /// local implementation is [`FileError::UnsupportedOperation`], checked
    /// before anything is fetched. With a stream open, the whole content is
    /// read and the stream is returned to its previous position.
    pub fn verify(&mut self) -> FileResult<bool> {
        let multihash = self.decode()?.clone();
        let function = multihash.function();
        let hasher =
            ContentHasher::new(function).map_err(|_| FileError::UnsupportedOperation {
                provider: "content hasher".to_string(),
                operation: Operation::Verify(function),
            })?;

        let content = if self.is_open() {
            let stream = self.io()?;
            let position = stream.stream_position()?;
            stream.rewind()?;
            let mut content = Vec::new();
            stream.read_to_end(&mut content)?;
            stream.seek(SeekFrom::Start(position))?;
            content
        } else {
            self.open_with(|file| file.read_to_vec())?
        };
        let verified = hasher.digest(&content) == multihash.digest();
        debug!(id = %self.id, %function, verified, "content verified");
        Ok(verified)
    }

    // ---- Resolution ----

    fn pin(&self) -> Option<Arc<dyn Storage>> {
        resolve::pin(&self.registry.snapshot(), &self.id)
    }

    fn require_pin(&self) -> FileResult<Arc<dyn Storage>> {
        self.pin().ok_or_else(|| FileError::NotFound(self.id.clone()))
    }

    /// Whether any registered storage holds the content. Backend faults
    /// count as "not there".
    pub fn exists(&self) -> bool {
        self.pin().is_some()
    }

    /// The storage currently holding the content, resolved afresh.
    pub fn storage(&self) -> Option<Arc<dyn Storage>> {
        self.pin()
    }

    /// Existence outcome for every registered storage, faults included.
    pub fn probe_all(&self) -> Vec<ProbeReport> {
        resolve::probe_all(&self.registry.snapshot(), &self.id)
    }

    /// URL from the pinned storage.
    pub fn url(&self, options: &UrlOptions) -> FileResult<String> {
        let storage = self.require_pin()?;
        let provider = storage
            .as_url_provider()
            .ok_or_else(|| unsupported(storage.as_ref(), Operation::Url))?;
        Ok(provider.url(&self.id, options)?)
    }

    /// Delete from every registered storage that can delete.
    ///
    /// Best effort: per-storage failures are logged and recorded in the
    /// report, never returned as an error.
    pub fn delete(&self) -> DeleteReport {
        resolve::delete_all(&self.registry.snapshot(), &self.id)
    }

    // ---- Sessions ----

    /// Open a stream on the pinned storage. The caller must [`close`](Self::close).
    ///
    /// Fails with [`FileError::SessionAlreadyOpen`] if a stream is already
    /// open; the open stream is left untouched.
    pub fn open(&mut self) -> FileResult<()> {
        if self.is_open() {
            return Err(FileError::SessionAlreadyOpen(self.id.clone()));
        }
        let storage = self.require_pin()?;
        let opener = storage
            .as_opener()
            .ok_or_else(|| unsupported(storage.as_ref(), Operation::Open))?;
        let stream = opener.open(&self.id)?;
        debug!(id = %self.id, storage = storage.name(), "stream opened");
        self.session = Session::Open { stream, storage };
        Ok(())
    }

    /// Open a stream, run `body` with the open handle, then close.
    ///
    /// The stream is closed on every exit path: success, error return, or
    /// panic.
    pub fn open_with<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<FileError>,
    {
        self.open()?;
        let mut guard = SessionGuard { file: self };
        let result = body(&mut *guard.file);
        drop(guard);
        result
    }

    pub fn is_open(&self) -> bool {
        matches!(self.session, Session::Open { .. })
    }

    /// The storage the open stream came from.
    pub fn open_storage(&self) -> Option<&Arc<dyn Storage>> {
        match &self.session {
            Session::Open { storage, .. } => Some(storage),
            Session::Closed => None,
        }
    }

    /// The open stream.
    pub fn io(&mut self) -> FileResult<&mut dyn ContentStream> {
        match &mut self.session {
            Session::Open { stream, .. } => Ok(stream.as_mut()),
            Session::Closed => Err(FileError::NoOpenStream),
        }
    }

    /// Read the rest of the open stream.
    pub fn read_to_vec(&mut self) -> FileResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.io()?.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Whether the open stream is exhausted.
    pub fn eof(&mut self) -> FileResult<bool> {
        let stream = self.io()?;
        let pos = stream.stream_position()?;
        let end = stream.seek(SeekFrom::End(0))?;
        stream.seek(SeekFrom::Start(pos))?;
        Ok(pos >= end)
    }

    /// Move the open stream back to the start.
    pub fn rewind(&mut self) -> FileResult<()> {
        self.io()?.rewind()?;
        Ok(())
    }

    /// Close the open stream, if any. Idempotent.
    pub fn close(&mut self) {
        if let Session::Open { storage, .. } =
            std::mem::replace(&mut self.session, Session::Closed)
        {
            debug!(id = %self.id, storage = storage.name(), "stream closed");
        }
    }

    // ---- Streaming and download ----

    /// Copy the content into `destination`. Returns the number of bytes copied.
    ///
    /// With a stream open, copies what remains of it and then rewinds it so it
    /// can be read again. Otherwise opens, copies and closes.
    pub fn stream<W>(&mut self, destination: &mut W) -> FileResult<u64>
    where
        W: Write + ?Sized,
    {
        let buffer_size = self.config.copy_buffer_size;
        if let Session::Open { stream, .. } = &mut self.session {
            let copied = copy_buffered(stream.as_mut(), destination, buffer_size)?;
            stream.rewind()?;
            return Ok(copied);
        }
        self.open_with(|file| {
            let stream = file.io()?;
            Ok(copy_buffered(stream, destination, buffer_size)?)
        })
    }

    /// Copy the content into a new file at `path`, replacing any existing one.
    pub fn stream_to_path(&mut self, path: impl AsRef<Path>) -> FileResult<u64> {
        let mut file = File::create(path)?;
        let copied = self.stream(&mut file)?;
        file.flush()?;
        Ok(copied)
    }

    /// A local copy of the content.
    ///
    /// Uses the first storage (registry order) that both downloads natively
    /// and holds the id. Otherwise streams from the pinned storage into a new
    /// temp file. The copy is deleted when closed or dropped.
    pub fn download(&mut self) -> FileResult<LocalCopy> {
        for storage in self.registry.snapshot() {
            let Some(downloader) = storage.as_downloader() else {
                continue;
            };
            if resolve::probe(storage.as_ref(), &self.id).is_hit() {
                debug!(id = %self.id, storage = storage.name(), "native download");
                let mut file = downloader.download(&self.id)?;
                file.rewind()?;
                return Ok(LocalCopy::new(file, CopySource::Native));
            }
        }

        if self.is_open() {
            self.rewind()?;
            self.copy_to_tempfile()
        } else {
            self.open_with(|file| file.copy_to_tempfile())
        }
    }

    /// Download, run `body` with the copy, then delete the copy.
    ///
    /// The copy is deleted whether `body` succeeds or fails.
    pub fn download_with<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut LocalCopy) -> Result<T, E>,
        E: From<FileError>,
    {
        let mut copy = self.download()?;
        let result = body(&mut copy);
        let closed = copy.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    fn copy_to_tempfile(&mut self) -> FileResult<LocalCopy> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.config.temp_prefix);
        let mut tmp = match &self.config.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let copied = self.stream(&mut tmp)?;
        tmp.flush()?;
        tmp.rewind()?;
        debug!(id = %self.id, bytes = copied, path = %tmp.path().display(), "streamed download");
        Ok(LocalCopy::new(tmp, CopySource::Streamed))
    }
}

fn copy_buffered<R, W>(reader: &mut R, writer: &mut W, buffer_size: usize) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut copied = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        copied += n as u64;
    }
}

fn unsupported(storage: &dyn Storage, operation: Operation) -> FileError {
    FileError::UnsupportedOperation {
        provider: storage.name().to_string(),
        operation,
    }
}

/// Closes the session when a scoped body exits, however it exits.
struct SessionGuard<'a> {
    file: &'a mut ContentAddressableFile,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.file.close();
    }
}

impl Read for ContentAddressableFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.io()?.read(buf)
    }
}

impl PartialEq for ContentAddressableFile {
    fn eq(&self, other: &Self) -> bool {
        self.content_address()
            .eq_ignore_ascii_case(other.content_address())
    }
}

impl Eq for ContentAddressableFile {}

impl Hash for ContentAddressableFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.content_address().bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

impl fmt::Debug for ContentAddressableFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentAddressableFile")
            .field("id", &self.id)
            .field(
                "open_storage",
                &self.open_storage().map(|s| s.name().to_string()),
            )
            .finish()
    }
}

impl fmt::Display for ContentAddressableFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DownloadOnlyStorage, ExistsOnlyStorage, FaultyStorage};
    use caf_store::InMemoryStorage;
    use proptest::prelude::*;
    use std::collections::HashSet;

    const CONTENT: &[u8] = b"test content";

    struct Fixture {
        registry: StorageRegistry,
        cache: Arc<InMemoryStorage>,
        store: Arc<InMemoryStorage>,
        id: ContentId,
    }

    /// `cache` then `store` registered; only `store` holds the content.
    fn fixture() -> Fixture {
        let registry = StorageRegistry::new();
        let cache = Arc::new(InMemoryStorage::new("cache"));
        let store = Arc::new(InMemoryStorage::new("store"));
        registry.add(cache.clone()).add(store.clone());
        let id = store.upload(&ContentHasher::default(), CONTENT).unwrap();
        Fixture {
            registry,
            cache,
            store,
            id,
        }
    }

    fn name_of(storage: &Arc<dyn Storage>) -> String {
        storage.name().to_string()
    }

    // ----------------------------------------------------------------
    // Resolution
    // ----------------------------------------------------------------

    #[test]
    fn resolves_to_holding_storage() {
        let f = fixture();
        let file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        assert!(file.exists());
        assert_eq!(name_of(&file.storage().unwrap()), "store");
        assert_eq!(
            file.url(&UrlOptions::new()).unwrap(),
            format!("memory://store/{}", f.id)
        );
    }

    #[test]
    fn earlier_storage_wins_once_it_holds_content() {
        let f = fixture();
        let file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        assert_eq!(name_of(&file.storage().unwrap()), "store");

        f.cache.write(&f.id, CONTENT.to_vec()).unwrap();
        assert_eq!(name_of(&file.storage().unwrap()), "cache");
    }

    #[test]
    fn missing_content() {
        let f = fixture();
        let file = ContentAddressableFile::with_registry("1220ffff", &f.registry);
        assert!(!file.exists());
        assert!(file.storage().is_none());
        assert!(matches!(
            file.url(&UrlOptions::new()),
            Err(FileError::NotFound(_))
        ));
    }

    #[test]
    fn faulty_storage_counts_as_miss() {
        let f = fixture();
        let registry = StorageRegistry::new();
        registry
            .add(Arc::new(FaultyStorage::new("faulty")))
            .add(f.store.clone());
        let file = ContentAddressableFile::with_registry(f.id.clone(), &registry);
        assert_eq!(name_of(&file.storage().unwrap()), "store");

        let reports = file.probe_all();
        assert!(reports[0].probe.is_fault());
        assert!(reports[1].probe.is_hit());
    }

    #[test]
    fn url_unsupported_by_pinned_storage() {
        let registry = StorageRegistry::new();
        registry.add(Arc::new(ExistsOnlyStorage::new()));
        let file = ContentAddressableFile::with_registry("1220aa", &registry);
        let err = file.url(&UrlOptions::new()).unwrap_err();
        assert!(matches!(
            err,
            FileError::UnsupportedOperation {
                operation: Operation::Url,
                ..
            }
        ));
    }

    #[test]
    fn url_forwards_options() {
        let f = fixture();
        let file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        let url = file
            .url(&UrlOptions::new().with("expires_in", "300"))
            .unwrap();
        assert!(url.ends_with("?expires_in=300"));
    }

    #[test]
    fn adopt_registers_the_producing_storage() {
        let registry = StorageRegistry::new();
        let store = Arc::new(InMemoryStorage::new("store"));
        let id = store.upload(&ContentHasher::default(), CONTENT).unwrap();
        let file = ContentAddressableFile::adopt(&registry, store.clone(), id);
        assert!(registry.contains(&*store));
        assert!(file.exists());
    }

    // ----------------------------------------------------------------
    // Delete
    // ----------------------------------------------------------------

    #[test]
    fn delete_removes_from_every_writable_storage() {
        let f = fixture();
        f.cache.write(&f.id, CONTENT.to_vec()).unwrap();
        let file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);

        let report = file.delete();
        assert_eq!(report.deleted(), 2);
        assert!(!file.exists());
    }

    #[test]
    fn delete_leaves_read_only_storage_alone() {
        let registry = StorageRegistry::new();
        let writable = Arc::new(InMemoryStorage::new("writable"));
        let archive = Arc::new(InMemoryStorage::new("archive"));
        registry.add(writable.clone()).add_read_only(archive.clone());
        let id = writable.upload(&ContentHasher::default(), CONTENT).unwrap();
        archive.write(&id, CONTENT.to_vec()).unwrap();

        let file = ContentAddressableFile::with_registry(id.clone(), &registry);
        let report = file.delete();
        assert_eq!(report.deleted(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(file.exists());
        assert_eq!(name_of(&file.storage().unwrap()), "archive");
    }

    #[test]
    fn delete_continues_past_failures() {
        let f = fixture();
        let registry = StorageRegistry::new();
        registry
            .add(Arc::new(FaultyStorage::new("faulty")))
            .add(f.store.clone());
        let file = ContentAddressableFile::with_registry(f.id.clone(), &registry);
        let report = file.delete();
        assert_eq!(report.failed(), 1);
        assert_eq!(report.deleted(), 1);
        assert!(!f.store.exists(&f.id).unwrap());
    }

    // ----------------------------------------------------------------
    // Sessions
    // ----------------------------------------------------------------

    #[test]
    fn open_read_close() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        file.open().unwrap();
        assert!(file.is_open());
        assert_eq!(name_of(file.open_storage().unwrap()), "store");
        assert!(!file.eof().unwrap());
        assert_eq!(file.read_to_vec().unwrap(), CONTENT);
        assert!(file.eof().unwrap());
        file.rewind().unwrap();
        let mut s = String::new();
        file.read_to_string(&mut s).unwrap();
        assert_eq!(s.as_bytes(), CONTENT);

        file.close();
        file.close();
        assert!(!file.is_open());
    }

    #[test]
    fn stream_calls_without_session_fail() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        assert!(matches!(file.io(), Err(FileError::NoOpenStream)));
        assert!(matches!(file.eof(), Err(FileError::NoOpenStream)));
        let err = file.read(&mut [0u8; 4]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn open_twice_is_rejected() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        file.open().unwrap();
        let mut first = [0u8; 4];
        file.read_exact(&mut first).unwrap();

        assert!(matches!(file.open(), Err(FileError::SessionAlreadyOpen(_))));
        // The first stream keeps its position.
        assert_eq!(file.read_to_vec().unwrap(), &CONTENT[4..]);
    }

    #[test]
    fn open_missing_or_unsupported() {
        let f = fixture();
        let mut missing = ContentAddressableFile::with_registry("1220ffff", &f.registry);
        assert!(matches!(missing.open(), Err(FileError::NotFound(_))));
        assert!(!missing.is_open());

        let registry = StorageRegistry::new();
        registry.add(Arc::new(ExistsOnlyStorage::new()));
        let mut file = ContentAddressableFile::with_registry("1220aa", &registry);
        assert!(matches!(
            file.open(),
            Err(FileError::UnsupportedOperation {
                operation: Operation::Open,
                ..
            })
        ));
    }

    #[test]
    fn scoped_open_closes_after_body() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        let content = file.open_with(|file| file.read_to_vec()).unwrap();
        assert_eq!(content, CONTENT);
        assert!(!file.is_open());
    }

    #[test]
    fn scoped_open_closes_on_error() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        let result: FileResult<()> = file.open_with(|file| {
            file.read_to_vec()?;
            Err(FileError::Io(io::Error::new(io::ErrorKind::Other, "boom")))
        });
        assert!(matches!(result, Err(FileError::Io(_))));
        assert!(!file.is_open());
    }

    #[test]
    fn scoped_open_closes_on_panic() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: FileResult<()> = file.open_with(|_| panic!("body panicked"));
        }));
        assert!(outcome.is_err());
        assert!(!file.is_open());
    }

    #[test]
    fn session_pins_storage_until_closed() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        file.open().unwrap();
        f.cache.write(&f.id, b"other".to_vec()).unwrap();
        assert_eq!(name_of(file.open_storage().unwrap()), "store");
        assert_eq!(file.read_to_vec().unwrap(), CONTENT);
        file.close();

        let content = file.open_with(|file| file.read_to_vec()).unwrap();
        assert_eq!(content, b"other");
    }

    // ----------------------------------------------------------------
    // Streaming
    // ----------------------------------------------------------------

    #[test]
    fn stream_without_session() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        let mut out = Vec::new();
        assert_eq!(file.stream(&mut out).unwrap(), CONTENT.len() as u64);
        assert_eq!(out, CONTENT);
        assert!(!file.is_open());
    }

    #[test]
    fn stream_with_session_rewinds() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        file.open().unwrap();
        let mut out = Vec::new();
        file.stream(&mut out).unwrap();
        assert_eq!(out, CONTENT);
        assert!(file.is_open());
        assert_eq!(file.read_to_vec().unwrap(), CONTENT);
    }

    #[test]
    fn stream_to_path_writes_file() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("copy.bin");
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        file.stream_to_path(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), CONTENT);
    }

    // ----------------------------------------------------------------
    // Download
    // ----------------------------------------------------------------

    #[test]
    fn download_falls_back_to_streaming() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig {
            temp_dir: Some(dir.path().to_path_buf()),
            temp_prefix: "caf-test".into(),
            ..FileConfig::default()
        };
        let mut file =
            ContentAddressableFile::with_registry(f.id.clone(), &f.registry).with_config(config);

        let mut copy = file.download().unwrap();
        assert_eq!(copy.source(), CopySource::Streamed);
        assert!(copy.path().starts_with(dir.path()));
        let name = copy.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("caf-test"));
        assert_eq!(copy.read_all().unwrap(), CONTENT);
        assert!(!file.is_open());
    }

    #[test]
    fn download_while_open_copies_everything() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        file.open().unwrap();
        file.read_exact(&mut [0u8; 4]).unwrap();
        let mut copy = file.download().unwrap();
        assert_eq!(copy.read_all().unwrap(), CONTENT);
        assert!(file.is_open());
    }

    #[test]
    fn download_prefers_native_capability() {
        let f = fixture();
        let native = Arc::new(DownloadOnlyStorage::new(f.id.clone(), CONTENT));
        let registry = StorageRegistry::new();
        registry.add(f.store.clone()).add(native.clone());

        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &registry);
        let mut copy = file.download().unwrap();
        assert_eq!(copy.source(), CopySource::Native);
        // Positioned at the start even though the backend left it at the end.
        let mut read = Vec::new();
        copy.read_to_end(&mut read).unwrap();
        assert_eq!(read, CONTENT);
        assert_eq!(native.downloads(), 1);
    }

    #[test]
    fn download_skips_native_storage_without_content() {
        let f = fixture();
        let native = Arc::new(DownloadOnlyStorage::new(ContentId::new("1220ffff"), b"x"));
        let registry = StorageRegistry::new();
        registry.add(native.clone()).add(f.store.clone());

        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &registry);
        let copy = file.download().unwrap();
        assert_eq!(copy.source(), CopySource::Streamed);
        assert_eq!(native.downloads(), 0);
    }

    #[test]
    fn download_missing_content() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry("1220ffff", &f.registry);
        assert!(matches!(file.download(), Err(FileError::NotFound(_))));
    }

    #[test]
    fn scoped_download_deletes_copy() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        let mut seen = None;
        let content = file
            .download_with(|copy| {
                seen = Some(copy.path().to_path_buf());
                copy.read_all()
            })
            .unwrap();
        assert_eq!(content, CONTENT);
        assert!(!seen.unwrap().exists());
    }

    #[test]
    fn scoped_download_deletes_copy_on_error() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        let mut seen = None;
        let result: FileResult<()> = file.download_with(|copy| {
            seen = Some(copy.path().to_path_buf());
            Err(FileError::NoOpenStream)
        });
        assert!(matches!(result, Err(FileError::NoOpenStream)));
        assert!(!seen.unwrap().exists());
    }

    // ----------------------------------------------------------------
    // Digest accessors
    // ----------------------------------------------------------------

    #[test]
    fn digest_accessors() {
        let hasher = ContentHasher::default().with_prefix("/ipfs");
        let id = hasher.content_id(b"My content to address");
        assert!(id.as_str().starts_with("/ipfs/1220"));

        let file = ContentAddressableFile::with_registry(id, &StorageRegistry::new());
        assert_eq!(file.digest_hash_function().unwrap(), HashFunction::Sha2_256);
        assert_eq!(file.digest_length().unwrap(), 32);
        assert_eq!(
            file.digest().unwrap(),
            hasher.digest(b"My content to address").as_slice()
        );
    }

    #[test]
    fn known_sha256_vector() {
        let id = ContentHasher::default()
            .with_prefix("/ipfs")
            .content_id(b"My content to address");
        assert_eq!(
            id.as_str(),
            "/ipfs/12205c7d1fdd9f6f9ad9ef3126ecdb71558b1ede29b0f6064c2eeb01616394ffb244"
        );
    }

    #[test]
    fn verify_checks_fetched_content() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        assert!(file.verify().unwrap());

        f.cache.write(&f.id, b"tampered".to_vec()).unwrap();
        assert!(!file.verify().unwrap());

        let mut bogus = ContentAddressableFile::with_registry("foo", &f.registry);
        assert!(matches!(
            bogus.verify(),
            Err(FileError::InvalidMultihash { .. })
        ));
    }

    #[test]
    fn verify_single_byte_md5_address() {
        let registry = StorageRegistry::new();
        let store = Arc::new(InMemoryStorage::new("legacy"));
        let id = ContentId::new("d5109473fdd0d880a43c21b7778d34872157");
        store.write(&id, CONTENT.to_vec()).unwrap();
        registry.add(store);

        let mut file = ContentAddressableFile::with_registry(id, &registry);
        assert!(file.verify().unwrap());
    }

    #[test]
    fn verify_sha1_address() {
        let registry = StorageRegistry::new();
        let store = Arc::new(InMemoryStorage::new("store"));
        let hasher = ContentHasher::new(HashFunction::Sha1).unwrap();
        let id = store.upload(&hasher, CONTENT).unwrap();
        registry.add(store);

        let mut file = ContentAddressableFile::with_registry(id, &registry);
        assert!(file.verify().unwrap());
    }

    #[test]
    fn verify_without_local_hasher_is_unsupported() {
        let f = fixture();
        let sha3 = Multihash::new(HashFunction::Sha3_256, vec![0u8; 32]);
        let id = ContentId::from_multihash(None, &sha3);
        f.store.write(&id, CONTENT.to_vec()).unwrap();

        let mut file = ContentAddressableFile::with_registry(id, &f.registry);
        assert!(matches!(
            file.verify(),
            Err(FileError::UnsupportedOperation {
                operation: Operation::Verify(HashFunction::Sha3_256),
                ..
            })
        ));
    }

    #[test]
    fn verify_keeps_open_stream_position() {
        let f = fixture();
        let mut file = ContentAddressableFile::with_registry(f.id.clone(), &f.registry);
        file.open().unwrap();
        file.read_exact(&mut [0u8; 5]).unwrap();

        assert!(file.verify().unwrap());
        assert!(file.is_open());
        assert_eq!(file.read_to_vec().unwrap(), &CONTENT[5..]);
    }

    #[test]
    fn small_copy_buffer_streams_everything() {
        let f = fixture();
        let config = FileConfig {
            copy_buffer_size: 3,
            ..FileConfig::default()
        };
        let mut file =
            ContentAddressableFile::with_registry(f.id.clone(), &f.registry).with_config(config);
        let mut out = Vec::new();
        assert_eq!(file.stream(&mut out).unwrap(), CONTENT.len() as u64);
        assert_eq!(out, CONTENT);
    }

    #[test]
    fn legacy_md5_address_decodes() {
        let file = ContentAddressableFile::with_registry(
            "d5100777f94b4cf1c5fa677ca69639ac6c72",
            &StorageRegistry::new(),
        );
        assert_eq!(file.digest_hash_function().unwrap(), HashFunction::Md5);
        assert_eq!(file.digest_length().unwrap(), 16);
    }

    #[test]
    fn undecodable_address() {
        let registry = StorageRegistry::new();
        let file = ContentAddressableFile::with_registry("foo", &registry);
        assert!(matches!(
            file.digest(),
            Err(FileError::InvalidMultihash { .. })
        ));
        // Decoding is not needed for comparison.
        assert_eq!(file, ContentAddressableFile::with_registry("/x/foo", &registry));
    }

    // ----------------------------------------------------------------
    // Equality
    // ----------------------------------------------------------------

    #[test]
    fn equality_ignores_prefix_and_case() {
        let registry = StorageRegistry::new();
        let a = ContentAddressableFile::with_registry("/ipfs/1220abcd", &registry);
        let b = ContentAddressableFile::with_registry("1220ABCD", &registry);
        let c = ContentAddressableFile::with_registry("1220abce", &registry);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    proptest! {
        #[test]
        fn equal_across_prefixes(
            digest in proptest::collection::vec(any::<u8>(), 1..64),
            prefix in "(/[a-z]{1,8}){0,3}",
        ) {
            let registry = StorageRegistry::new();
            let mh = Multihash::new(HashFunction::Sha2_256, digest);
            let bare = ContentId::from_multihash(None, &mh);
            let prefixed = ContentId::from_multihash(Some(&prefix), &mh);
            let a = ContentAddressableFile::with_registry(bare, &registry);
            let b = ContentAddressableFile::with_registry(prefixed, &registry);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.digest().unwrap(), b.digest().unwrap());
        }
    }

    // ----------------------------------------------------------------
    // Global registry
    // ----------------------------------------------------------------

    #[test]
    fn global_registry_round_trip() {
        let store = Arc::new(InMemoryStorage::new("global-store"));
        let id = store.upload(&ContentHasher::default(), b"global").unwrap();
        StorageRegistry::global().add(store.clone());

        let mut file = ContentAddressableFile::new(id.clone());
        assert!(file.exists());
        assert_eq!(file.open_with(|f| f.read_to_vec()).unwrap(), b"global");

        StorageRegistry::global().reset();
        assert!(!ContentAddressableFile::new(id).exists());
    }
}
