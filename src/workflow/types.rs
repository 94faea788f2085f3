use std::path::PathBuf;

use image::ImageFormat;

use crate::backup::ArchivedAsset;
use crate::catalog::PromptEntry;
use crate::versions::KNOWN_EXTENSIONS;

const DEFAULT_RAW_EXTENSION: &str = "png";

/// Image bytes returned by the generation API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}

impl GeneratedImage {
    pub fn new(data: Vec<u8>, mime_type: Option<String>) -> Self {
        Self { data, mime_type }
    }

    /// File extension for the raw backup, from the reported MIME type.
    ///
    /// Limited to extensions the version scan counts, so a raw backup can
    /// never land on a version number that is already taken.
    pub fn extension(&self) -> &'static str {
        self.mime_type
            .as_deref()
            .and_then(ImageFormat::from_mime_type)
            .and_then(|format| format.extensions_str().first().copied())
            .filter(|extension| KNOWN_EXTENSIONS.contains(extension))
            .unwrap_or(DEFAULT_RAW_EXTENSION)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtMode {
    Generate,
    Edit,
}

impl ArtMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Generate => "generated",
            Self::Edit => "edited",
        }
    }
}

/// What a successful generate or edit run left on disk.
#[derive(Debug, Clone)]
pub struct ArtOutcome {
    pub mode: ArtMode,
    pub entry: PromptEntry,
    pub sprite_path: PathBuf,
    pub archived: Option<ArchivedAsset>,
    pub raw_backup_path: PathBuf,
    pub raw_version: u32,
    pub raw_bytes: usize,
}

impl ArtOutcome {
    pub fn archived_version(&self) -> u32 {
        self.archived.as_ref().map_or(0, |asset| asset.version)
    }
}
