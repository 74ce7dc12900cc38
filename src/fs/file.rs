use std::fs;

use tracing::debug;

use crate::codec::flac;
use crate::error::{Error, Result};
use crate::library::{Format, Item, ItemId, Store, TagPatch};

/// One open virtual file: the synthesized header, the raw audio
/// payload, and the boundary between them.
///
/// The header is re-encoded to the exact byte extent the real file
/// reserved for its own header, so the payload never shifts and the
/// virtual stream keeps the real file's size. MP3 has no header
/// synthesis in this version: the whole file is payload and the
/// boundary is zero, which makes every write land in the read-only
/// region.
pub struct OpenFile {
    item_id: ItemId,
    header: Vec<u8>,
    payload: Vec<u8>,
    /// Byte extent reserved for the header in the real file; every
    /// re-encode targets this same size.
    target: usize,
    refs: u32,
}

impl OpenFile {
    /// Read the real file, synthesize the header from the item's
    /// current tag fields, and record the splice boundary.
    pub fn open(item: &Item) -> Result<Self> {
        let data = fs::read(&item.path)?;

        match item.format {
            Format::Mp3 => Ok(Self {
                item_id: item.id,
                header: Vec::new(),
                payload: data,
                target: 0,
                refs: 1,
            }),
            Format::Flac => {
                let mut tags = flac::decode(&data)?;
                let mut comments = tags.comments()?;
                comments.set("TITLE", &item.title);
                comments.set("ALBUM", &item.album);
                comments.set("ARTIST", &item.artist);
                comments.set("GENRE", &item.genre);
                tags.set_comments(&comments);

                let target = tags.audio_offset;
                let header = flac::encode(&tags, target)?;
                let payload = data[tags.audio_offset..].to_vec();
                debug!(id = %item.id, boundary = header.len(), "opened virtual file");
                Ok(Self {
                    item_id: item.id,
                    header,
                    payload,
                    target,
                    refs: 1,
                })
            }
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Offset separating the header region from the audio payload.
    pub fn boundary(&self) -> usize {
        self.header.len()
    }

    /// Total virtual stream length.
    pub fn len(&self) -> usize {
        self.header.len() + self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn acquire(&mut self) {
        self.refs += 1;
    }

    /// Drop one reference; true once no handle remains.
    pub(crate) fn release(&mut self) -> bool {
        self.refs = self.refs.saturating_sub(1);
        self.refs == 0
    }

    /// Serve a byte-range read, splicing across the boundary when the
    /// range covers both regions. A short or empty result only means
    /// end of stream.
    pub fn read(&self, size: usize, offset: u64) -> Vec<u8> {
        let boundary = self.header.len() as u64;
        if offset < boundary {
            let start = offset as usize;
            let end = start.saturating_add(size).min(self.header.len());
            let mut out = self.header[start..end].to_vec();
            if size > out.len() {
                let rest = (size - out.len()).min(self.payload.len());
                out.extend_from_slice(&self.payload[..rest]);
            }
            out
        } else {
            let start = ((offset - boundary) as usize).min(self.payload.len());
            let end = start.saturating_add(size).min(self.payload.len());
            self.payload[start..end].to_vec()
        }
    }

    /// Accept a write into the header region: overlay the buffer onto
    /// the composed stream, re-decode, persist the projected tag
    /// fields to the store, and swap in the freshly encoded header.
    ///
    /// Writes at or past the boundary are rejected; audio payload is
    /// immutable through this interface. On any decode or encode
    /// failure the previous header, boundary and store record stay
    /// exactly as they were.
    pub fn write(&mut self, offset: u64, buf: &[u8], store: &dyn Store) -> Result<usize> {
        let boundary = self.header.len() as u64;
        if offset >= boundary {
            return Err(Error::ReadOnlyRegion { offset, boundary });
        }

        let mut composed = Vec::with_capacity(self.len());
        composed.extend_from_slice(&self.header);
        composed.extend_from_slice(&self.payload);
        let start = offset as usize;
        let end = start + buf.len();
        if end > composed.len() {
            composed.resize(end, 0);
        }
        composed[start..end].copy_from_slice(buf);

        let tags = flac::decode(&composed)?;
        let comments = tags.comments()?;
        let field = |name: &str| comments.get(name).unwrap_or_default().to_string();
        let patch = TagPatch {
            title: field("TITLE"),
            artist: field("ARTIST"),
            album: field("ALBUM"),
            genre: field("GENRE"),
        };

        // Encode first: a header that cannot fit must not reach the
        // store either.
        let header = flac::encode(&tags, self.target)?;
        store.update(self.item_id, patch)?;
        store.save()?;

        debug!(id = %self.item_id, bytes = buf.len(), "header write-back");
        self.header = header;
        Ok(buf.len())
    }
}
