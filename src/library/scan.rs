use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::codec::flac;
use crate::codec::vorbis::Comments;
use crate::config::LibrarySettings;

use super::model::{Format, Item, ItemId};

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn parse_number(value: Option<&str>) -> u32 {
    // Track fields sometimes come as "3/12"; the leading number is the
    // one we want.
    value
        .and_then(|v| v.split('/').next())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

fn apply_comments(item: &mut Item, comments: &Comments) {
    let text = |name: &str| comments.get(name).unwrap_or_default().to_string();
    item.title = text("TITLE");
    item.artist = text("ARTIST");
    item.album = text("ALBUM");
    item.genre = text("GENRE");
    item.composer = text("COMPOSER");
    item.grouping = text("GROUPING");
    item.lyrics = text("LYRICS");
    item.comments = text("COMMENT");

    // DATE is "YYYY", "YYYY-MM" or "YYYY-MM-DD".
    let date = text("DATE");
    let mut parts = date.split('-');
    item.year = parse_number(parts.next());
    item.month = parse_number(parts.next());
    item.day = parse_number(parts.next());

    item.track = parse_number(comments.get("TRACKNUMBER"));
    item.tracktotal = parse_number(comments.get("TRACKTOTAL"));
    item.disc = parse_number(comments.get("DISCNUMBER"));
    item.disctotal = parse_number(comments.get("DISCTOTAL"));
    item.bpm = parse_number(comments.get("BPM"));
    item.comp = comments.get("COMPILATION").is_some_and(|v| v.trim() == "1");
}

fn read_item(id: ItemId, path: &Path, format: Format) -> crate::error::Result<Item> {
    let mut item = Item::new(id, path.to_path_buf(), format);

    // MP3 carries no synthesized header in this version, so the
    // scanner only records the file; the title falls back to the stem.
    if format == Format::Mp3 {
        item.title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        return Ok(item);
    }

    let data = fs::read(path)?;
    let tags = flac::decode(&data)?;
    apply_comments(&mut item, &tags.comments()?);
    if let Some(info) = tags.stream_info() {
        item.length = info.duration_secs();
    }
    Ok(item)
}

/// Walk `dir` and build an item per decodable audio file.
///
/// A file whose header fails to decode is excluded from the collection
/// with a warning instead of failing the whole scan; the rest of the
/// mount proceeds without it.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Item> {
    let mut items: Vec<Item> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut next_id = 1u64;
    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() || (!settings.include_hidden && is_hidden(path)) {
            continue;
        }
        let Some(format) = Format::from_path(path) else {
            continue;
        };

        match read_item(ItemId(next_id), path, format) {
            Ok(item) => {
                debug!(path = %path.display(), id = next_id, "scanned item");
                items.push(item);
                next_id += 1;
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping undecodable file");
            }
        }
    }

    items.sort_by(|a, b| a.path.cmp(&b.path));
    items
}
