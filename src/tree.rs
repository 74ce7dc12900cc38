//! Directory tree index over resolved path segments.
//!
//! Built once from every collection item at mount time and replaced
//! wholesale on remount; queries never mutate it. Every file entry
//! sits at exactly template depth, so any shorter path is a directory
//! by construction.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::library::ItemId;

/// One directory: named child directories and named file entries.
/// Names are unique within a node; ordering comes from the maps, which
/// keeps listings deterministic across rebuilds.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirNode {
    dirs: BTreeMap<String, DirNode>,
    files: BTreeMap<String, ItemId>,
}

impl DirNode {
    pub fn dir_names(&self) -> Vec<String> {
        self.dirs.keys().cloned().collect()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    pub fn dir(&self, name: &str) -> Option<&DirNode> {
        self.dirs.get(name)
    }

    pub fn file(&self, name: &str) -> Option<ItemId> {
        self.files.get(name).copied()
    }
}

/// The whole mount's path tree.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tree {
    root: DirNode,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one item's resolved segments: intermediate directories
    /// for every level but the last, the filename at the last. Two
    /// items resolving to the same full path are last-write-wins.
    pub fn insert(&mut self, segments: &[String], id: ItemId) {
        let Some((filename, dirs)) = segments.split_last() else {
            return;
        };
        let mut node = &mut self.root;
        for segment in dirs {
            node = node.dirs.entry(segment.clone()).or_default();
        }
        node.files.insert(filename.clone(), id);
    }

    /// Descend to the directory node addressed by `segments`; the
    /// empty list addresses the root. `NotFound` on any absent
    /// intermediate segment.
    pub fn node<S: AsRef<str>>(&self, segments: &[S]) -> Result<&DirNode> {
        let mut node = &self.root;
        for segment in segments {
            node = node.dirs.get(segment.as_ref()).ok_or(Error::NotFound)?;
        }
        Ok(node)
    }

    /// Resolve a full file path (directory segments plus filename) to
    /// its item id.
    pub fn file<S: AsRef<str>>(&self, segments: &[S]) -> Result<ItemId> {
        let (filename, dirs) = segments.split_last().ok_or(Error::NotAFile)?;
        self.node(dirs)?
            .file(filename.as_ref())
            .ok_or(Error::NotFound)
    }
}
