//! Hand-built FLAC fixtures shared by the codec, library and fs tests.

use crate::codec::vorbis::{self, Comments};

/// Stream-info payload with the given sample rate and total sample
/// count packed into their bit positions; everything else zero.
pub fn streaminfo(rate: u32, samples: u64) -> Vec<u8> {
    let mut d = vec![0u8; 34];
    d[10] = (rate >> 12) as u8;
    d[11] = (rate >> 4) as u8;
    d[12] = ((rate & 0xF) << 4) as u8;
    d[13] = ((samples >> 32) & 0x0F) as u8;
    d[14..18].copy_from_slice(&((samples & 0xFFFF_FFFF) as u32).to_be_bytes());
    d
}

/// One raw metadata block: flag/type byte, 24-bit big-endian length,
/// payload.
pub fn raw_block(code: u8, is_last: bool, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![if is_last { 0x80 | code } else { code }];
    out.push((payload.len() >> 16) as u8);
    out.push((payload.len() >> 8) as u8);
    out.push(payload.len() as u8);
    out.extend_from_slice(payload);
    out
}

pub fn comment_payload(fields: &[(&str, &str)]) -> Vec<u8> {
    let mut comments = Comments::new("test vendor");
    for (n, v) in fields {
        comments.set(n, v);
    }
    vorbis::encode(&comments)
}

/// A minimal but valid FLAC stream: magic, stream info, comment block,
/// `pad` bytes of trailing padding, then `audio` appended verbatim.
pub fn flac_stream(fields: &[(&str, &str)], pad: usize, audio: &[u8]) -> Vec<u8> {
    let mut data = b"fLaC".to_vec();
    data.extend(raw_block(0, false, &streaminfo(44_100, 441_000)));
    data.extend(raw_block(4, false, &comment_payload(fields)));
    data.extend(raw_block(1, true, &vec![0u8; pad]));
    data.extend_from_slice(audio);
    data
}
