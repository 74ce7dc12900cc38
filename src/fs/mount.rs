use std::collections::HashMap;
use std::fs::Metadata;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::library::Store;
use crate::template::PathTemplate;
use crate::tree::Tree;

use super::file::OpenFile;

/// Reported size of every virtual directory.
pub const DIR_SIZE: u64 = 4096;

/// Attributes of one virtual path.
#[derive(Debug)]
pub enum Attr {
    Dir,
    File {
        /// Virtual stream size. Equals the real file's size, since the
        /// header is always re-encoded into its original extent.
        size: u64,
        /// Stat info of the real file behind the virtual one.
        real: Metadata,
    },
}

impl Attr {
    /// Stat size: the constant directory size, or the virtual stream
    /// length for a file.
    pub fn size(&self) -> u64 {
        match self {
            Attr::Dir => DIR_SIZE,
            Attr::File { size, .. } => *size,
        }
    }
}

#[derive(Default)]
struct OpenTable {
    next_handle: u64,
    by_handle: HashMap<u64, String>,
    by_path: HashMap<String, OpenFile>,
}

/// One mounted projection: the parsed template, the tree built from
/// every collection item, the store handle, and the open-file table.
///
/// Constructed once per mount and torn down on unmount; the tree is
/// never mutated afterward. The external filesystem bridge translates
/// kernel calls into the operations below. Anything that would mutate
/// the namespace itself is permanently [`Error::Unsupported`].
pub struct MountContext {
    template: PathTemplate,
    tree: Tree,
    store: Arc<dyn Store>,
    open: Mutex<OpenTable>,
}

/// Split a virtual path into its segments. `""` and `"/"` address the
/// root; empty segments are ignored so trailing slashes do not change
/// meaning.
fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl MountContext {
    /// Build the tree from every item in the store, one pass. An item
    /// whose template resolution fails is excluded with a warning
    /// rather than failing the mount.
    pub fn new(settings: &Settings, store: Arc<dyn Store>) -> Result<Self> {
        let template = PathTemplate::parse(&settings.mount.template)?;
        let mut tree = Tree::new();
        let mut count = 0usize;
        for item in store.items() {
            match template.resolve(&item) {
                Ok(segments) => {
                    tree.insert(&segments, item.id);
                    count += 1;
                }
                Err(err) => {
                    warn!(id = %item.id, %err, "excluding item from the tree");
                }
            }
        }
        debug!(items = count, depth = template.depth(), "mounted");
        Ok(Self {
            template,
            tree,
            store,
            open: Mutex::new(OpenTable::default()),
        })
    }

    /// Directory levels plus the filename level of the template.
    pub fn depth(&self) -> usize {
        self.template.depth()
    }

    /// Resolve a path's attributes. Paths with exactly template depth
    /// are file queries; anything shorter is a directory query.
    pub fn attr(&self, path: &str) -> Result<Attr> {
        let segments = split_path(path);
        if segments.len() < self.depth() {
            self.tree.node(&segments)?;
            return Ok(Attr::Dir);
        }
        if segments.len() > self.depth() {
            return Err(Error::NotFound);
        }
        let id = self.tree.file(&segments)?;
        let item = self.store.get(id).ok_or(Error::MissingItem(id.0))?;
        let real = std::fs::metadata(&item.path)?;
        Ok(Attr::File {
            size: real.len(),
            real,
        })
    }

    /// List a directory: child directory names, then file names, fully
    /// materialized.
    pub fn read_dir(&self, path: &str) -> Result<Vec<String>> {
        let segments = split_path(path);
        if segments.len() >= self.depth() {
            return Err(Error::NotADirectory);
        }
        let node = self.tree.node(&segments)?;
        let mut entries = node.dir_names();
        entries.extend(node.file_names());
        Ok(entries)
    }

    /// Open a virtual file, returning a handle. The first open of a
    /// path reads the whole real file and synthesizes the header;
    /// later opens of the same path only bump its reference count.
    pub fn open(&self, path: &str) -> Result<u64> {
        let segments = split_path(path);
        if segments.len() != self.depth() {
            return Err(Error::NotAFile);
        }
        let id = self.tree.file(&segments)?;
        let key = segments.join("/");

        {
            let mut table = self.open.lock();
            if let Some(file) = table.by_path.get_mut(&key) {
                file.acquire();
                return Ok(register(&mut table, key));
            }
        }

        // Reading the real file is the slow part; the table stays
        // unlocked while it happens.
        let item = self.store.get(id).ok_or(Error::MissingItem(id.0))?;
        let file = OpenFile::open(&item)?;

        let mut table = self.open.lock();
        match table.by_path.get_mut(&key) {
            // A racing open landed first; its state wins, ours drops.
            Some(existing) => existing.acquire(),
            None => {
                table.by_path.insert(key.clone(), file);
            }
        }
        Ok(register(&mut table, key))
    }

    /// Byte-range read through the splice contract. An empty result
    /// signals end of stream.
    pub fn read(&self, handle: u64, size: usize, offset: u64) -> Result<Vec<u8>> {
        let table = self.open.lock();
        let file = resolve(&table, handle)?;
        Ok(file.read(size, offset))
    }

    /// Write into the header region, persisting projected tag fields
    /// to the store. Returns the number of bytes accepted.
    pub fn write(&self, handle: u64, offset: u64, buf: &[u8]) -> Result<usize> {
        let mut table = self.open.lock();
        let key = table
            .by_handle
            .get(&handle)
            .cloned()
            .ok_or(Error::StaleHandle(handle))?;
        let file = table
            .by_path
            .get_mut(&key)
            .ok_or(Error::StaleHandle(handle))?;
        file.write(offset, buf, self.store.as_ref())
    }

    /// Close a handle; the in-memory state is discarded once the last
    /// handle to the path goes away. Nothing is flushed to the real
    /// file.
    pub fn release(&self, handle: u64) -> Result<()> {
        let mut table = self.open.lock();
        let key = table
            .by_handle
            .remove(&handle)
            .ok_or(Error::StaleHandle(handle))?;
        let evict = table
            .by_path
            .get_mut(&key)
            .is_some_and(|file| file.release());
        if evict {
            table.by_path.remove(&key);
            debug!(path = %key, "evicted virtual file state");
        }
        Ok(())
    }

    /// Splice boundary of an open file, mostly useful to callers
    /// deciding how to route writes.
    pub fn boundary(&self, handle: u64) -> Result<u64> {
        let table = self.open.lock();
        Ok(resolve(&table, handle)?.boundary() as u64)
    }

    // The projection never mutates the namespace: these report a
    // uniform, permanent "not supported" outcome instead of partially
    // succeeding.

    pub fn create(&self, _path: &str) -> Result<u64> {
        Err(Error::Unsupported("create"))
    }

    pub fn remove(&self, _path: &str) -> Result<()> {
        Err(Error::Unsupported("remove"))
    }

    pub fn rename(&self, _from: &str, _to: &str) -> Result<()> {
        Err(Error::Unsupported("rename"))
    }

    pub fn truncate(&self, _path: &str, _size: u64) -> Result<()> {
        Err(Error::Unsupported("truncate"))
    }
}

fn register(table: &mut OpenTable, key: String) -> u64 {
    let handle = table.next_handle;
    table.next_handle += 1;
    table.by_handle.insert(handle, key);
    handle
}

fn resolve<'t>(table: &'t OpenTable, handle: u64) -> Result<&'t OpenFile> {
    let key = table
        .by_handle
        .get(&handle)
        .ok_or(Error::StaleHandle(handle))?;
    table
        .by_path
        .get(key)
        .ok_or(Error::StaleHandle(handle))
}
