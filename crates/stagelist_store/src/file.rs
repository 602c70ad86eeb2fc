//! File-backed entry store for persistent lists.

use crate::error::{StoreError, StoreResult};
use crate::store::EntryStore;
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Magic number at the start of every store image.
pub const STORE_MAGIC: u32 = 0x534C_5354; // "SLST"

/// On-disk format version.
pub const FORMAT_VERSION: u16 = 1;

/// Name of the list image inside the store directory.
pub const STORE_FILE_NAME: &str = "entries.cbor";

const LOCK_FILE_NAME: &str = "LOCK";
const TEMP_SUFFIX: &str = "tmp";

#[derive(Serialize)]
struct StoreImageRef<'a, T> {
    magic: u32,
    version: u16,
    revision: u64,
    entries: &'a [T],
}

#[derive(Deserialize)]
struct StoreImage<T> {
    magic: u32,
    version: u16,
    revision: u64,
    entries: Vec<T>,
}

/// A file-backed entry store.
///
/// The committed list is persisted as a single CBOR image inside a store
/// directory and cached in memory for index reads.
///
/// # Durability
///
/// A commit writes the new image to a temporary file, syncs it, and renames
/// it over the previous image. A crash mid-commit leaves the old image in
/// place.
///
/// # Locking
///
/// The directory is held with an exclusive lock on a `LOCK` file for as
/// long as the store is open.
///
/// # Example
///
/// ```no_run
/// use stagelist_store::{EntryStore, FileStore};
/// use std::path::Path;
///
/// let mut store: FileStore<String> = FileStore::open(Path::new("schedules")).unwrap();
/// store.append_to_pending_list("weekday".to_string()).unwrap();
/// store.commit_pending_list().unwrap(); // persisted
/// ```
#[derive(Debug)]
pub struct FileStore<T> {
    dir: PathBuf,
    entries: Vec<T>,
    revision: u64,
    pending: Vec<T>,
    _lock: File,
}

impl<T> FileStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Opens or creates a store in `dir`.
    ///
    /// The directory is created if it doesn't exist. An existing image is
    /// loaded and validated.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, another process
    /// holds the lock, or the image is unreadable.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;

        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE_NAME))?;
        if lock.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked);
        }

        let image_path = dir.join(STORE_FILE_NAME);
        let (entries, revision) = if image_path.exists() {
            let image: StoreImage<T> = read_image(&image_path)?;
            (image.entries, image.revision)
        } else {
            (Vec::new(), 0)
        };

        debug!(dir = %dir.display(), entries = entries.len(), revision, "opened file store");

        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
            revision,
            pending: Vec::new(),
            _lock: lock,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the committed entries.
    #[must_use]
    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    fn write_image(&self, entries: &[T], revision: u64) -> StoreResult<()> {
        let image_path = self.dir.join(STORE_FILE_NAME);
        let temp_path = image_path.with_extension(TEMP_SUFFIX);

        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            let image = StoreImageRef {
                magic: STORE_MAGIC,
                version: FORMAT_VERSION,
                revision,
                entries,
            };
            ciborium::into_writer(&image, &mut writer)
                .map_err(|e| StoreError::Codec(e.to_string()))?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        fs::rename(&temp_path, &image_path)?;
        Ok(())
    }
}

fn read_image<T: DeserializeOwned>(path: &Path) -> StoreResult<StoreImage<T>> {
    let reader = BufReader::new(File::open(path)?);
    let image: StoreImage<T> =
        ciborium::from_reader(reader).map_err(|e| StoreError::Codec(e.to_string()))?;

    if image.magic != STORE_MAGIC {
        return Err(StoreError::Corrupted(format!(
            "bad magic {:08x} in {}",
            image.magic,
            path.display()
        )));
    }
    if image.version != FORMAT_VERSION {
        return Err(StoreError::Corrupted(format!(
            "unsupported format version {} (expected {})",
            image.version, FORMAT_VERSION
        )));
    }
    Ok(image)
}

impl<T> EntryStore<T> for FileStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send,
{
    fn entry_at(&self, index: usize) -> StoreResult<Option<T>> {
        Ok(self.entries.get(index).cloned())
    }

    fn revision(&self) -> StoreResult<u64> {
        Ok(self.revision)
    }

    fn append_to_pending_list(&mut self, entry: T) -> StoreResult<()> {
        self.pending.push(entry);
        Ok(())
    }

    fn commit_pending_list(&mut self) -> StoreResult<()> {
        let revision = self.revision + 1;
        self.write_image(&self.pending, revision)?;

        self.entries = std::mem::take(&mut self.pending);
        self.revision = revision;
        debug!(entries = self.entries.len(), revision, "file store committed");
        Ok(())
    }

    fn clear_pending_list(&mut self) -> StoreResult<()> {
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let store: FileStore<u32> = FileStore::open(dir.path()).unwrap();
        assert!(store.entries().is_empty());
        assert_eq!(store.revision().unwrap(), 0);
        assert!(!dir.path().join(STORE_FILE_NAME).exists());
    }

    #[test]
    fn file_commit_and_read() {
        let dir = tempdir().unwrap();
        let mut store: FileStore<String> = FileStore::open(dir.path()).unwrap();

        store.append_to_pending_list("a".into()).unwrap();
        store.append_to_pending_list("b".into()).unwrap();
        assert_eq!(store.entry_at(0).unwrap(), None);

        store.commit_pending_list().unwrap();
        assert_eq!(store.entry_at(1).unwrap(), Some("b".to_string()));
        assert_eq!(store.entry_at(2).unwrap(), None);
        assert_eq!(store.revision().unwrap(), 1);
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();

        {
            let mut store: FileStore<u32> = FileStore::open(dir.path()).unwrap();
            store.append_to_pending_list(42).unwrap();
            store.append_to_pending_list(43).unwrap();
            store.commit_pending_list().unwrap();
        }

        {
            let store: FileStore<u32> = FileStore::open(dir.path()).unwrap();
            assert_eq!(store.entries(), &[42, 43]);
            assert_eq!(store.revision().unwrap(), 1);
        }
    }

    #[test]
    fn file_clear_pending_is_not_persisted() {
        let dir = tempdir().unwrap();
        let mut store: FileStore<u32> = FileStore::open(dir.path()).unwrap();
        store.append_to_pending_list(1).unwrap();
        store.clear_pending_list().unwrap();
        store.commit_pending_list().unwrap();
        assert!(store.entries().is_empty());
    }

    #[test]
    fn file_second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _first: FileStore<u32> = FileStore::open(dir.path()).unwrap();
        let second: StoreResult<FileStore<u32>> = FileStore::open(dir.path());
        assert!(matches!(second, Err(StoreError::Locked)));
    }

    #[test]
    fn file_bad_magic_is_corruption() {
        let dir = tempdir().unwrap();
        let image = StoreImageRef::<u32> {
            magic: 0xdead_beef,
            version: FORMAT_VERSION,
            revision: 3,
            entries: &[],
        };
        let file = File::create(dir.path().join(STORE_FILE_NAME)).unwrap();
        ciborium::into_writer(&image, file).unwrap();

        let result: StoreResult<FileStore<u32>> = FileStore::open(dir.path());
        assert!(matches!(result, Err(StoreError::Corrupted(_))));
    }

    #[test]
    fn file_garbage_is_codec_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(STORE_FILE_NAME), b"\xff\x00not cbor").unwrap();

        let result: StoreResult<FileStore<u32>> = FileStore::open(dir.path());
        assert!(matches!(result, Err(StoreError::Codec(_))));
    }

    #[test]
    fn file_commit_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let mut store: FileStore<u32> = FileStore::open(dir.path()).unwrap();
        store.append_to_pending_list(5).unwrap();
        store.commit_pending_list().unwrap();

        assert!(dir.path().join(STORE_FILE_NAME).exists());
        assert!(!dir
            .path()
            .join(STORE_FILE_NAME)
            .with_extension(TEMP_SUFFIX)
            .exists());
    }
}
