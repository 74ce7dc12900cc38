//! Field codec for the comment block payload.
//!
//! Layout: u32-LE vendor length + vendor bytes, u32-LE field count,
//! then per field a u32-LE length and `NAME=value` UTF-8 text. Field
//! names match case-insensitively.

use crate::error::{Error, Result};

/// Decoded comment block: vendor string plus ordered `(name, value)`
/// fields. Unknown fields survive a rewrite untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comments {
    pub vendor: String,
    pub fields: Vec<(String, String)>,
}

impl Comments {
    /// An empty comment set with the given vendor string.
    pub fn new(vendor: &str) -> Self {
        Self {
            vendor: vendor.to_string(),
            fields: Vec::new(),
        }
    }

    /// First value stored under `name`, case-insensitive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace the value stored under `name`, keeping the position of
    /// the first occurrence and dropping any later duplicates. Appends
    /// when the name is absent.
    pub fn set(&mut self, name: &str, value: &str) {
        let mut seen = false;
        self.fields.retain_mut(|(n, v)| {
            if n.eq_ignore_ascii_case(name) {
                if seen {
                    return false;
                }
                seen = true;
                *v = value.to_string();
            }
            true
        });
        if !seen {
            self.fields.push((name.to_string(), value.to_string()));
        }
    }
}

fn read_u32le(data: &[u8], pos: &mut usize) -> Result<u32> {
    let end = pos
        .checked_add(4)
        .filter(|e| *e <= data.len())
        .ok_or_else(|| Error::TagDecode("truncated comment block".into()))?;
    let v = u32::from_le_bytes(data[*pos..end].try_into().unwrap());
    *pos = end;
    Ok(v)
}

fn read_str(data: &[u8], pos: &mut usize, len: usize) -> Result<String> {
    let end = pos
        .checked_add(len)
        .filter(|e| *e <= data.len())
        .ok_or_else(|| Error::TagDecode("truncated comment block".into()))?;
    let s = std::str::from_utf8(&data[*pos..end])
        .map_err(|_| Error::TagDecode("comment block is not valid UTF-8".into()))?;
    *pos = end;
    Ok(s.to_string())
}

/// Decode a comment block payload.
pub fn decode(data: &[u8]) -> Result<Comments> {
    let mut pos = 0;
    let vendor_len = read_u32le(data, &mut pos)? as usize;
    let vendor = read_str(data, &mut pos, vendor_len)?;
    let count = read_u32le(data, &mut pos)?;

    // `count` is wire data; every field costs at least 4 length bytes,
    // so cap the preallocation by what the payload could actually hold.
    let upper = data.len().saturating_sub(pos) / 4;
    let mut fields = Vec::with_capacity((count as usize).min(upper));
    for _ in 0..count {
        let len = read_u32le(data, &mut pos)? as usize;
        let entry = read_str(data, &mut pos, len)?;
        let (name, value) = entry
            .split_once('=')
            .ok_or_else(|| Error::TagDecode(format!("comment field without `=`: {entry:?}")))?;
        fields.push((name.to_string(), value.to_string()));
    }

    Ok(Comments { vendor, fields })
}

/// Serialize a comment set back into block payload bytes.
pub fn encode(comments: &Comments) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(comments.vendor.len() as u32).to_le_bytes());
    out.extend_from_slice(comments.vendor.as_bytes());
    out.extend_from_slice(&(comments.fields.len() as u32).to_le_bytes());
    for (name, value) in &comments.fields {
        let entry_len = name.len() + 1 + value.len();
        out.extend_from_slice(&(entry_len as u32).to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.push(b'=');
        out.extend_from_slice(value.as_bytes());
    }
    out
}
