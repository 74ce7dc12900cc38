use serde::Deserialize;

use crate::template::PathTemplate;

/// Top-level mount settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/tunefs/config.toml` or `~/.config/tunefs/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `TUNEFS__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub mount: MountSettings,
    pub library: LibrarySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MountSettings {
    /// Path template: one `/`-separated level per directory depth, the
    /// last level being the filename. Placeholders (`$artist`,
    /// `$title`, `$format`, ...) resolve from item metadata.
    pub template: String,
}

impl Default for MountSettings {
    fn default() -> Self {
        Self {
            template: "$artist/$album ($year) [$format_upper]/$track - $artist - $title.$format"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
        }
    }
}

impl Settings {
    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        let template = PathTemplate::parse(&self.mount.template).map_err(|e| e.to_string())?;
        if template.depth() < 2 {
            return Err("mount.template needs at least one directory level".to_string());
        }
        Ok(())
    }
}
