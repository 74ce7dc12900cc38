//! The projection engine: a mount context owning the parsed template,
//! the directory tree built from the collection, and the table of open
//! virtual files; plus the per-file composer that splices a
//! synthesized tag header onto the raw audio payload.

mod file;
mod mount;

pub use file::OpenFile;
pub use mount::{Attr, MountContext, DIR_SIZE};

#[cfg(test)]
mod tests;
