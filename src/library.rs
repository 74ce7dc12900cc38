//! The music collection: item records, the store interface the
//! projection engine talks to, and a directory scanner that builds an
//! in-memory store from real audio files.

mod model;
mod scan;
mod store;

pub use model::{Format, Item, ItemId, TagPatch};
pub use scan::scan;
pub use store::{MemoryStore, Store};
