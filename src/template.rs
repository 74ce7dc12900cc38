//! Path template: one `/`-separated level per path depth, the last
//! level being the filename. Placeholders (`$artist`, `$title`, ...)
//! resolve from item metadata; values are sanitized so no segment can
//! escape the tree or hide itself.

use std::path::Path;

use crate::error::{Error, Result};
use crate::library::Item;

/// Metadata field addressable from a template placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Artist,
    Album,
    Genre,
    Composer,
    Grouping,
    Lyrics,
    Comments,
    Year,
    Month,
    Day,
    Track,
    TrackTotal,
    Disc,
    DiscTotal,
    Bpm,
    Comp,
    Length,
    Format,
    FormatUpper,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "title" => Field::Title,
            "artist" => Field::Artist,
            "album" => Field::Album,
            "genre" => Field::Genre,
            "composer" => Field::Composer,
            "grouping" => Field::Grouping,
            "lyrics" => Field::Lyrics,
            "comments" => Field::Comments,
            "year" => Field::Year,
            "month" => Field::Month,
            "day" => Field::Day,
            "track" => Field::Track,
            "tracktotal" => Field::TrackTotal,
            "disc" => Field::Disc,
            "disctotal" => Field::DiscTotal,
            "bpm" => Field::Bpm,
            "comp" => Field::Comp,
            "length" => Field::Length,
            "format" => Field::Format,
            "format_upper" => Field::FormatUpper,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
enum Piece {
    Literal(String),
    Field(Field),
}

/// A parsed template, fixed for the lifetime of a mount.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    levels: Vec<Vec<Piece>>,
}

impl PathTemplate {
    /// Parse and validate a template string. Placeholder names are
    /// checked here so a typo fails at mount, not per item.
    pub fn parse(template: &str) -> Result<Self> {
        let mut levels = Vec::new();
        for level in template.split('/') {
            levels.push(parse_level(level)?);
        }
        Ok(Self { levels })
    }

    /// Directory levels plus the filename level.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Resolve one sanitized path segment per level. Pure: same item
    /// and template always produce the same segments.
    pub fn resolve(&self, item: &Item) -> Result<Vec<String>> {
        let mut segments = Vec::with_capacity(self.levels.len());
        for (depth, level) in self.levels.iter().enumerate() {
            let mut segment = String::new();
            for piece in level {
                match piece {
                    Piece::Literal(text) => segment.push_str(text),
                    Piece::Field(field) => segment.push_str(&render(*field, item)),
                }
            }
            if segment.is_empty() {
                return Err(Error::EmptySegment(depth));
            }
            segments.push(segment);
        }
        Ok(segments)
    }
}

fn parse_level(level: &str) -> Result<Vec<Piece>> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = level.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            literal.push(c);
            continue;
        }
        let mut name = String::new();
        while let Some(&n) = chars.peek() {
            if n.is_ascii_alphanumeric() || n == '_' {
                name.push(n);
                chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            // Lone `$` is literal text.
            literal.push('$');
            continue;
        }
        let field =
            Field::from_name(&name).ok_or_else(|| Error::UnknownPlaceholder(name.clone()))?;
        if !literal.is_empty() {
            pieces.push(Piece::Literal(std::mem::take(&mut literal)));
        }
        pieces.push(Piece::Field(field));
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

/// Strip path-hostile characters: `\`, `/`, `:` and a leading `.`
/// all become `_`.
fn sanitize(value: &str) -> String {
    let mut out: String = value
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' => '_',
            other => other,
        })
        .collect();
    if out.starts_with('.') {
        out.replace_range(0..1, "_");
    }
    out
}

fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn text_or(value: &str, fallback: &str) -> String {
    let clean = sanitize(value);
    if clean.is_empty() {
        fallback.to_string()
    } else {
        clean
    }
}

fn render(field: Field, item: &Item) -> String {
    match field {
        Field::Title => text_or(&item.title, "Unknown Track"),
        Field::Artist => text_or(&item.artist, "Unknown Artist"),
        Field::Album => text_or(&item.album, "Unknown Album"),
        Field::Genre => sanitize(&item.genre),
        Field::Composer => sanitize(&item.composer),
        Field::Grouping => sanitize(&item.grouping),
        Field::Lyrics => sanitize(&item.lyrics),
        Field::Comments => sanitize(&item.comments),
        Field::Year => {
            if item.year == 0 {
                "Unknown Year".to_string()
            } else {
                item.year.to_string()
            }
        }
        Field::Month => item.month.to_string(),
        Field::Day => item.day.to_string(),
        Field::Track => format!("{:02}", item.track),
        Field::TrackTotal => format!("{:02}", item.tracktotal),
        Field::Disc => format!("{:02}", item.disc),
        Field::DiscTotal => format!("{:02}", item.disctotal),
        Field::Bpm => item.bpm.to_string(),
        Field::Comp => item.comp.to_string(),
        Field::Length => item.length.to_string(),
        Field::Format => sanitize(&file_extension(&item.path)),
        Field::FormatUpper => sanitize(&file_extension(&item.path)).to_uppercase(),
    }
}
