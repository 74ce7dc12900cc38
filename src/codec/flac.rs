//! FLAC metadata block chain: decode, field access, and re-encode
//! against a fixed target extent.
//!
//! Stream layout: optional ID3v2 prefix, `fLaC` magic, then metadata
//! blocks of 1 flag/type byte + 24-bit big-endian length + payload,
//! ending at the block with the is-last bit set. Audio frames start
//! immediately after.

use tracing::debug;

use crate::error::{Error, Result};

use super::vorbis::{self, Comments};

/// Stream marker after any foreign prefix.
pub const MAGIC: &[u8; 4] = b"fLaC";

/// Vendor string used when a file has no comment block to rewrite.
const VENDOR: &str = "tunefs";

/// Block payloads carry a 24-bit length field.
const MAX_BLOCK_LEN: usize = 0xFF_FFFF;

const CODE_STREAMINFO: u8 = 0;
const CODE_PADDING: u8 = 1;
const CODE_SEEKTABLE: u8 = 3;
const CODE_VORBIS_COMMENT: u8 = 4;
const CODE_CUESHEET: u8 = 5;

/// Metadata block type. Unrecognized codes pass through as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    StreamInfo,
    Padding,
    SeekTable,
    VorbisComment,
    CueSheet,
    Other(u8),
}

impl BlockKind {
    fn from_code(code: u8) -> Self {
        match code {
            CODE_STREAMINFO => BlockKind::StreamInfo,
            CODE_PADDING => BlockKind::Padding,
            CODE_SEEKTABLE => BlockKind::SeekTable,
            CODE_VORBIS_COMMENT => BlockKind::VorbisComment,
            CODE_CUESHEET => BlockKind::CueSheet,
            other => BlockKind::Other(other),
        }
    }

    fn code(self) -> u8 {
        match self {
            BlockKind::StreamInfo => CODE_STREAMINFO,
            BlockKind::Padding => CODE_PADDING,
            BlockKind::SeekTable => CODE_SEEKTABLE,
            BlockKind::VorbisComment => CODE_VORBIS_COMMENT,
            BlockKind::CueSheet => CODE_CUESHEET,
            BlockKind::Other(code) => code,
        }
    }
}

/// One metadata block, payload kept verbatim.
#[derive(Debug, Clone)]
pub struct Block {
    pub kind: BlockKind,
    pub data: Vec<u8>,
}

/// Audio properties pulled from the stream-info block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub total_samples: u64,
}

impl StreamInfo {
    /// Stream duration in seconds, when the stream declares one.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.total_samples as f64 / f64::from(self.sample_rate)
    }
}

/// Decoded header: foreign prefix (verbatim), ordered block chain, and
/// the offset of the first audio byte in the source buffer.
#[derive(Debug, Clone)]
pub struct ParsedTags {
    pub prefix: Vec<u8>,
    pub blocks: Vec<Block>,
    pub audio_offset: usize,
}

impl ParsedTags {
    /// Decode the comment block's fields. A header without a comment
    /// block reads as an empty field set.
    pub fn comments(&self) -> Result<Comments> {
        match self.blocks.iter().find(|b| b.kind == BlockKind::VorbisComment) {
            Some(block) => vorbis::decode(&block.data),
            None => Ok(Comments::new(VENDOR)),
        }
    }

    /// Write a field set back into the comment block, creating the
    /// block if the header had none.
    pub fn set_comments(&mut self, comments: &Comments) {
        let data = vorbis::encode(comments);
        match self
            .blocks
            .iter_mut()
            .find(|b| b.kind == BlockKind::VorbisComment)
        {
            Some(block) => block.data = data,
            None => self.blocks.push(Block {
                kind: BlockKind::VorbisComment,
                data,
            }),
        }
    }

    /// Audio properties from the stream-info block, if it is long
    /// enough to carry them.
    pub fn stream_info(&self) -> Option<StreamInfo> {
        let block = self
            .blocks
            .iter()
            .find(|b| b.kind == BlockKind::StreamInfo)?;
        let d = &block.data;
        if d.len() < 18 {
            return None;
        }
        // Bits 80..100 are the sample rate, 108..144 the total sample
        // count (the channel/depth fields sit in between).
        let sample_rate =
            (u32::from(d[10]) << 12) | (u32::from(d[11]) << 4) | (u32::from(d[12]) >> 4);
        let total_samples = (u64::from(d[13] & 0x0F) << 32)
            | u64::from(u32::from_be_bytes([d[14], d[15], d[16], d[17]]));
        Some(StreamInfo {
            sample_rate,
            total_samples,
        })
    }
}

fn read_u24be(data: &[u8], pos: usize) -> usize {
    (usize::from(data[pos]) << 16) | (usize::from(data[pos + 1]) << 8) | usize::from(data[pos + 2])
}

/// Length of the foreign ID3v2 container at the start of `data`, or 0
/// when none is present. The size field at offset 6 is big-endian with
/// 7 payload bits per byte.
fn foreign_prefix_len(data: &[u8]) -> usize {
    if data.len() < 10 || &data[..3] != b"ID3" {
        return 0;
    }
    let size = data[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | usize::from(b & 0x7F));
    10 + size
}

/// Parse a full FLAC stream's metadata preamble.
pub fn decode(data: &[u8]) -> Result<ParsedTags> {
    let prefix_len = foreign_prefix_len(data);
    let magic_end = prefix_len
        .checked_add(4)
        .filter(|e| *e <= data.len())
        .ok_or_else(|| Error::TagDecode("stream too short for fLaC magic".into()))?;
    if &data[prefix_len..magic_end] != MAGIC {
        return Err(Error::TagDecode(if prefix_len == 0 {
            "missing fLaC magic".into()
        } else {
            "no fLaC magic after ID3 prefix".into()
        }));
    }

    let mut pos = magic_end;
    let mut blocks = Vec::new();
    let mut seen_streaminfo = false;
    let mut seen_comment = false;
    let mut seen_cuesheet = false;
    let mut seen_seektable = false;

    loop {
        if pos + 4 > data.len() {
            return Err(Error::TagDecode("truncated block header".into()));
        }
        let flag_byte = data[pos];
        let is_last = flag_byte & 0x80 != 0;
        let kind = BlockKind::from_code(flag_byte & 0x7F);
        let len = read_u24be(data, pos + 1);
        pos += 4;

        if pos + len > data.len() {
            return Err(Error::TagDecode(format!(
                "block declared {len} bytes but only {} remain",
                data.len() - pos
            )));
        }

        match kind {
            BlockKind::StreamInfo => seen_streaminfo = true,
            BlockKind::VorbisComment => {
                if seen_comment {
                    return Err(Error::DuplicateBlock("comment"));
                }
                seen_comment = true;
            }
            BlockKind::CueSheet => {
                if seen_cuesheet {
                    return Err(Error::DuplicateBlock("cue sheet"));
                }
                seen_cuesheet = true;
            }
            BlockKind::SeekTable => {
                if seen_seektable {
                    return Err(Error::DuplicateBlock("seek table"));
                }
                seen_seektable = true;
            }
            BlockKind::Padding | BlockKind::Other(_) => {}
        }

        blocks.push(Block {
            kind,
            data: data[pos..pos + len].to_vec(),
        });
        pos += len;

        if is_last {
            break;
        }
    }

    if !seen_streaminfo {
        return Err(Error::MissingStreamInfo);
    }

    debug!(blocks = blocks.len(), audio_offset = pos, "decoded header");
    Ok(ParsedTags {
        prefix: data[..prefix_len].to_vec(),
        blocks,
        audio_offset: pos,
    })
}

fn push_block(out: &mut Vec<u8>, code: u8, data: &[u8], is_last: bool) {
    let flag = if is_last { 0x80 } else { 0x00 };
    out.push(flag | code);
    out.push((data.len() >> 16) as u8);
    out.push((data.len() >> 8) as u8);
    out.push(data.len() as u8);
    out.extend_from_slice(data);
}

/// Serialize the header so its total length is exactly `target` bytes.
///
/// All non-padding blocks keep their order and content; a trailing run
/// of padding blocks absorbs the difference (usually one, more when
/// the extent exceeds the 24-bit block-length limit). The padding
/// payload may shrink to zero, and is omitted entirely on an exact
/// natural-size fit. When even an empty padding block cannot fit, this
/// fails with `HeaderTooLarge` and no other block is touched. The
/// foreign prefix is emitted verbatim iff it was present on decode.
pub fn encode(tags: &ParsedTags, target: usize) -> Result<Vec<u8>> {
    let retained: Vec<&Block> = tags
        .blocks
        .iter()
        .filter(|b| b.kind != BlockKind::Padding)
        .collect();

    let natural = tags.prefix.len()
        + MAGIC.len()
        + retained.iter().map(|b| 4 + b.data.len()).sum::<usize>();

    let pad_space = if natural == target {
        0
    } else if target >= natural + 4 {
        target - natural
    } else {
        return Err(Error::HeaderTooLarge {
            needed: natural + 4,
            available: target,
        });
    };

    let mut out = Vec::with_capacity(target);
    out.extend_from_slice(&tags.prefix);
    out.extend_from_slice(MAGIC);
    for (i, block) in retained.iter().enumerate() {
        let is_last = pad_space == 0 && i == retained.len() - 1;
        push_block(&mut out, block.kind.code(), &block.data, is_last);
    }

    // Each padding block fills 4 header bytes plus its payload. Keep
    // every payload within the 24-bit length field, and never leave a
    // remainder too small to hold another block header.
    let mut space = pad_space;
    while space > 0 {
        let mut chunk = space.min(4 + MAX_BLOCK_LEN);
        if space - chunk > 0 && space - chunk < 4 {
            chunk = space - 4;
        }
        push_block(&mut out, CODE_PADDING, &vec![0u8; chunk - 4], chunk == space);
        space -= chunk;
    }

    debug_assert_eq!(out.len(), target);
    Ok(out)
}
