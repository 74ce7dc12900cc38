use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier of one collection item, stable for the life of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Audio container format of the real file behind an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Flac,
    Mp3,
}

impl Format {
    /// Derive the format from a file extension, case-insensitive.
    /// Unknown extensions are not collection members.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "flac" => Some(Format::Flac),
            "mp3" => Some(Format::Mp3),
            _ => None,
        }
    }
}

/// One collection item. Text fields use the empty string for "unset",
/// numeric fields use zero; both render through the path template with
/// explicit fallbacks where a segment would otherwise be meaningless.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    /// Real on-disk file behind this item.
    pub path: PathBuf,
    pub format: Format,

    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub composer: String,
    pub grouping: String,
    pub lyrics: String,
    pub comments: String,

    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub track: u32,
    pub tracktotal: u32,
    pub disc: u32,
    pub disctotal: u32,
    pub bpm: u32,

    /// Part of a compilation.
    pub comp: bool,
    /// Duration in seconds.
    pub length: f64,
}

impl Item {
    /// A blank item for the given id and real path.
    pub fn new(id: ItemId, path: PathBuf, format: Format) -> Self {
        Self {
            id,
            path,
            format,
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            genre: String::new(),
            composer: String::new(),
            grouping: String::new(),
            lyrics: String::new(),
            comments: String::new(),
            year: 0,
            month: 0,
            day: 0,
            track: 0,
            tracktotal: 0,
            disc: 0,
            disctotal: 0,
            bpm: 0,
            comp: false,
            length: 0.0,
        }
    }
}

/// The projected write-back subset: the only fields a virtual-file
/// write can change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPatch {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
}

impl TagPatch {
    pub fn from_item(item: &Item) -> Self {
        Self {
            title: item.title.clone(),
            artist: item.artist.clone(),
            album: item.album.clone(),
            genre: item.genre.clone(),
        }
    }
}
