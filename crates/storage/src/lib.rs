use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use bincode::config;
use bincode::serde::{decode_from_slice, encode_to_vec};
use common::{Config, DbError, DbResult, PageId};
use serde::{Deserialize, Serialize};

pub const PAGE_SIZE: usize = 4096;

fn bincode_config() -> impl config::Config {
    config::legacy()
}

/// Abstract page-store capability injected into the tree handle.
///
/// A store owns every page's bytes between `allocate` and `free`. Published
/// pages are never rewritten: any logical change allocates a new page and
/// eventually frees the superseded one (copy-on-write).
pub trait PageStore {
    /// Returns the bytes previously written for a live page id. Callers
    /// never pass `PageId::NULL`.
    fn load(&mut self, id: PageId) -> DbResult<Vec<u8>>;
    /// Persists a newly built page and returns a fresh non-zero id.
    fn allocate(&mut self, page: &[u8]) -> DbResult<PageId>;
    /// Releases a page id. The id must not be loaded again until a later
    /// `allocate` hands it out anew.
    fn free(&mut self, id: PageId) -> DbResult<()>;
}

/// Metadata kept in page 0 of a store file. Page 0 is never handed out, so
/// every allocated id is naturally non-zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreMeta {
    /// Data pages ever allocated; ids run over `1..=num_pages`.
    num_pages: u64,
    /// Freed ids available for reuse.
    free: Vec<u64>,
}

/// File-backed page store. Page id `n` lives at byte offset `n * PAGE_SIZE`.
#[derive(Debug)]
pub struct FilePageStore {
    file: File,
    meta: StoreMeta,
    sync_writes: bool,
}

impl FilePageStore {
    /// Create a new store file at the given path.
    pub fn create(path: &Path) -> DbResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let mut store = Self {
            file,
            meta: StoreMeta {
                num_pages: 0,
                free: Vec::new(),
            },
            sync_writes: true,
        };
        store.write_meta()?;
        Ok(store)
    }

    /// Open an existing store file.
    pub fn open(path: &Path) -> DbResult<Self> {
        if !path.exists() {
            return Err(DbError::Storage(format!(
                "store file does not exist: {}",
                path.display()
            )));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        let file_len = file.metadata()?.len();
        if file_len < PAGE_SIZE as u64 {
            return Err(DbError::Storage("store file has no metadata page".into()));
        }

        let meta = Self::read_meta(&mut file)?;
        Ok(Self {
            file,
            meta,
            sync_writes: true,
        })
    }

    /// Create or open the store under `config.data_dir`.
    pub fn with_config(config: &Config) -> DbResult<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let path = config.data_dir.join("pages.db");
        let mut store = if path.exists() {
            Self::open(&path)?
        } else {
            Self::create(&path)?
        };
        store.sync_writes = config.sync_writes;
        Ok(store)
    }

    fn read_meta(file: &mut File) -> DbResult<StoreMeta> {
        let mut buf = vec![0u8; PAGE_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut buf)?;
        let (meta, _): (StoreMeta, usize) = decode_from_slice(&buf, bincode_config())
            .map_err(|e| DbError::Storage(format!("read store metadata failed: {e}")))?;
        Ok(meta)
    }

    fn write_meta(&mut self) -> DbResult<()> {
        let bytes = encode_to_vec(&self.meta, bincode_config())
            .map_err(|e| DbError::Storage(format!("write store metadata failed: {e}")))?;
        if bytes.len() > PAGE_SIZE {
            return Err(DbError::Storage(
                "store metadata exceeds the metadata page".into(),
            ));
        }

        let mut page = vec![0u8; PAGE_SIZE];
        page[..bytes.len()].copy_from_slice(&bytes);
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&page)?;
        if self.sync_writes {
            self.file.flush()?;
        }
        Ok(())
    }

    fn ensure_live(&self, id: PageId) -> DbResult<()> {
        if id.is_null() {
            return Err(DbError::Storage("page id 0 is reserved".into()));
        }
        if id.0 > self.meta.num_pages {
            return Err(DbError::Storage(format!("page {} not allocated", id.0)));
        }
        if self.meta.free.contains(&id.0) {
            return Err(DbError::Storage(format!("page {} is freed", id.0)));
        }
        Ok(())
    }
}

impl PageStore for FilePageStore {
    fn load(&mut self, id: PageId) -> DbResult<Vec<u8>> {
        self.ensure_live(id)?;
        let mut buf = vec![0u8; PAGE_SIZE];
        self.file.seek(SeekFrom::Start(id.0 * PAGE_SIZE as u64))?;
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn allocate(&mut self, page: &[u8]) -> DbResult<PageId> {
        if page.len() > PAGE_SIZE {
            return Err(DbError::Storage(format!(
                "page too large: {} bytes (max {PAGE_SIZE})",
                page.len()
            )));
        }

        let id = match self.meta.free.pop() {
            Some(id) => id,
            None => {
                self.meta.num_pages += 1;
                self.meta.num_pages
            }
        };

        let mut buf = vec![0u8; PAGE_SIZE];
        buf[..page.len()].copy_from_slice(page);
        self.file.seek(SeekFrom::Start(id * PAGE_SIZE as u64))?;
        self.file.write_all(&buf)?;
        self.write_meta()?;
        Ok(PageId(id))
    }

    fn free(&mut self, id: PageId) -> DbResult<()> {
        self.ensure_live(id)?;
        self.meta.free.push(id.0);
        self.write_meta()
    }
}

/// In-memory page store: the substitutable test double for the tree handle.
/// Ids are handed out monotonically starting at 1 and never reused.
#[derive(Debug)]
pub struct MemPageStore {
    pages: HashMap<u64, Vec<u8>>,
    next_id: u64,
}

impl MemPageStore {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            next_id: 1,
        }
    }

    /// Number of live pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl Default for MemPageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PageStore for MemPageStore {
    fn load(&mut self, id: PageId) -> DbResult<Vec<u8>> {
        self.pages
            .get(&id.0)
            .cloned()
            .ok_or_else(|| DbError::Storage(format!("page {} is not live", id.0)))
    }

    fn allocate(&mut self, page: &[u8]) -> DbResult<PageId> {
        if page.len() > PAGE_SIZE {
            return Err(DbError::Storage(format!(
                "page too large: {} bytes (max {PAGE_SIZE})",
                page.len()
            )));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.pages.insert(id, page.to_vec());
        Ok(PageId(id))
    }

    fn free(&mut self, id: PageId) -> DbResult<()> {
        self.pages
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| DbError::Storage(format!("page {} is not live", id.0)))
    }
}

#[cfg(test)]
mod tests;
