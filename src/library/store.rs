use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::model::{Item, ItemId, TagPatch};

/// The collection store the projection engine consumes.
///
/// `items` runs once at mount to build the tree; `get` resolves a tree
/// leaf back to its metadata and real path; `update` + `save` persist
/// the projected tag fields after a header write-back.
pub trait Store: Send + Sync {
    fn items(&self) -> Vec<Item>;
    fn get(&self, id: ItemId) -> Option<Item>;
    fn update(&self, id: ItemId, patch: TagPatch) -> Result<()>;
    fn save(&self) -> Result<()>;
}

/// In-memory store over a plain item list.
pub struct MemoryStore {
    items: Mutex<Vec<Item>>,
}

impl MemoryStore {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }
}

impl Store for MemoryStore {
    fn items(&self) -> Vec<Item> {
        self.items.lock().clone()
    }

    fn get(&self, id: ItemId) -> Option<Item> {
        self.items.lock().iter().find(|i| i.id == id).cloned()
    }

    fn update(&self, id: ItemId, patch: TagPatch) -> Result<()> {
        let mut items = self.items.lock();
        let item = items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(Error::MissingItem(id.0))?;
        item.title = patch.title;
        item.artist = patch.artist;
        item.album = patch.album;
        item.genre = patch.genre;
        Ok(())
    }

    fn save(&self) -> Result<()> {
        // Nothing to flush for the in-memory store.
        Ok(())
    }
}
