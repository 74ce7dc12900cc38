//! Virtual filesystem projection for a tagged music collection.
//!
//! A scanned library of audio files is projected into a browsable
//! directory tree whose layout is derived from each item's tags via a
//! configurable path template. Opening a projected file composes a
//! fresh tag header from the store's current tags and splices it onto
//! the untouched audio payload; writes into the header region are
//! decoded and fed back into the store.

pub mod codec;
pub mod config;
pub mod error;
pub mod fs;
pub mod library;
pub mod template;
pub mod tree;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::Settings;
pub use error::{Error, Result};
pub use fs::{Attr, MountContext, OpenFile};
pub use library::{Format, Item, ItemId, MemoryStore, Store, TagPatch, scan};
pub use template::PathTemplate;
pub use tree::{DirNode, Tree};
