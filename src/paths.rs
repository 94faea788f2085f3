use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Result};

pub const DEFAULT_SUBDIR: &str = "items";
pub const SPRITE_EXTENSION: &str = "webp";

const DEFAULT_CATEGORY_MAP: &[(&str, &str)] = &[
    ("enemies", "enemies"),
    ("weapons", "weapons"),
    ("shields", "shields"),
    ("special_items", "items"),
    ("items", "items"),
    ("locations", "locations"),
    ("spells", "items"),
    ("potions", "items"),
];

pub fn default_category_map() -> BTreeMap<String, String> {
    DEFAULT_CATEGORY_MAP
        .iter()
        .map(|(category, subdir)| ((*category).to_owned(), (*subdir).to_owned()))
        .collect()
}

/// Directories an item of one category reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPaths {
    pub sprite_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub raw_backup_dir: PathBuf,
}

impl CategoryPaths {
    pub fn sprite_path(&self, id: &str) -> PathBuf {
        self.sprite_dir.join(format!("{id}.{SPRITE_EXTENSION}"))
    }
}

/// Maps catalog categories onto the sprite and backup trees.
#[derive(Debug, Clone)]
pub struct PathResolver {
    sprites_root: PathBuf,
    backup_root: PathBuf,
    raw_backup_root: PathBuf,
    categories: BTreeMap<String, String>,
    default_subdir: String,
}

impl PathResolver {
    pub fn new(
        sprites_root: PathBuf,
        backup_root: PathBuf,
        raw_backup_root: PathBuf,
        categories: BTreeMap<String, String>,
        default_subdir: String,
    ) -> Self {
        Self {
            sprites_root,
            backup_root,
            raw_backup_root,
            categories,
            default_subdir,
        }
    }

    pub fn subdir(&self, category: &str) -> &str {
        self.categories
            .get(category)
            .map_or(self.default_subdir.as_str(), String::as_str)
    }

    /// Pure lookup; nothing is created on disk.
    pub fn resolve(&self, category: &str) -> CategoryPaths {
        let subdir = self.subdir(category);
        CategoryPaths {
            sprite_dir: self.sprites_root.join(subdir),
            backup_dir: self.backup_root.join(subdir),
            raw_backup_dir: self.raw_backup_root.join(subdir),
        }
    }
}

/// Rejects ids that would escape their directory when used as a filename stem.
pub fn validate_item_id(id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("item id must not be empty");
    }
    if id.chars().any(|c| c.is_control() || c == '/' || c == '\\') {
        bail!("item id '{id}' contains path separators or control characters");
    }
    let mut components = Path::new(id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => bail!("item id '{id}' is not a plain file name"),
    }
}
