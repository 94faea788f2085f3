//! Project configuration.
//!
//! Every path the tool touches comes from an [`ArtConfig`] value. Defaults
//! follow the usual game project layout:
//!
//! ```text
//! <project>/image_prompts.md
//! <project>/assets/sprites/<subdir>/<id>.webp
//! <project>/../sprites_backup_png/<subdir>/<id>_v<N>.{png,webp}
//! ```
//!
//! An optional `artgen.yaml` in the project root overrides any of them.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::error_codes::CodedError;
use crate::paths::{default_category_map, PathResolver, DEFAULT_SUBDIR};

pub const CONFIG_FILE_NAME: &str = "artgen.yaml";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const GENERATE_MODEL_ENV: &str = "ARTGEN_GENERATE_MODEL";
pub const EDIT_MODEL_ENV: &str = "ARTGEN_EDIT_MODEL";

const DEFAULT_CATALOG: &str = "image_prompts.md";
const DEFAULT_SPRITES_DIR: &str = "assets/sprites";
const DEFAULT_BACKUP_DIR: &str = "../sprites_backup_png";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GENERATE_MODEL: &str = "gemini-2.5-flash-image";
const DEFAULT_EDIT_MODEL: &str = "gemini-3-pro-image-preview";
const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
const DEFAULT_RESIZE_PROGRAM_SIPS: &str = "sips";
const DEFAULT_RESIZE_PROGRAM_MAGICK: &str = "magick";
const DEFAULT_ENCODE_PROGRAM: &str = "cwebp";
const DEFAULT_TARGET_SIZE: u32 = 512;
const DEFAULT_QUALITY: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeTool {
    Sips,
    Magick,
}

#[derive(Debug, Clone)]
pub struct ConverterSettings {
    pub resize_tool: ResizeTool,
    pub resize_program: String,
    pub encode_program: String,
    pub target_size: u32,
    pub quality: u8,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub generate_model: String,
    pub edit_model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ArtConfig {
    pub project_root: PathBuf,
    pub catalog_path: PathBuf,
    pub sprites_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub raw_backup_dir: PathBuf,
    pub work_dir: PathBuf,
    pub categories: BTreeMap<String, String>,
    pub default_subdir: String,
    pub converter: ConverterSettings,
    pub api: ApiSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    catalog: Option<PathBuf>,
    sprites_dir: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    raw_backup_dir: Option<PathBuf>,
    work_dir: Option<PathBuf>,
    default_subdir: Option<String>,
    categories: Option<BTreeMap<String, String>>,
    #[serde(default)]
    converter: ConverterFile,
    #[serde(default)]
    api: ApiFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConverterFile {
    resize_tool: Option<ResizeTool>,
    resize_program: Option<String>,
    encode_program: Option<String>,
    target_size: Option<u32>,
    quality: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApiFile {
    base_url: Option<String>,
    generate_model: Option<String>,
    edit_model: Option<String>,
    timeout_seconds: Option<u64>,
}

impl ArtConfig {
    /// Loads `config_path`, or `<project_root>/artgen.yaml` when present,
    /// falling back to defaults.
    pub fn load(project_root: &Path, config_path: Option<&Path>) -> Result<Self> {
        let file = match config_path {
            Some(path) => read_config_file(path)?,
            None => {
                let implicit = project_root.join(CONFIG_FILE_NAME);
                if implicit.is_file() {
                    read_config_file(&implicit)?
                } else {
                    ConfigFile::default()
                }
            }
        };
        Self::from_file(project_root, file)
    }

    pub fn from_yaml(project_root: &Path, yaml: &str) -> Result<Self> {
        let file = parse_config_yaml(yaml, Path::new(CONFIG_FILE_NAME))?;
        Self::from_file(project_root, file)
    }

    pub fn defaults(project_root: &Path) -> Result<Self> {
        Self::from_file(project_root, ConfigFile::default())
    }

    fn from_file(project_root: &Path, file: ConfigFile) -> Result<Self> {
        let resolve = |value: Option<PathBuf>, default: &str| {
            let path = value.unwrap_or_else(|| PathBuf::from(default));
            if path.is_absolute() {
                path
            } else {
                project_root.join(path)
            }
        };

        let backup_dir = resolve(file.backup_dir, DEFAULT_BACKUP_DIR);
        let raw_backup_dir = match file.raw_backup_dir {
            Some(path) if path.is_absolute() => path,
            Some(path) => project_root.join(path),
            None => backup_dir.clone(),
        };
        let work_dir = match file.work_dir {
            Some(path) if path.is_absolute() => path,
            Some(path) => project_root.join(path),
            None => std::env::temp_dir(),
        };

        let default_subdir = file
            .default_subdir
            .unwrap_or_else(|| DEFAULT_SUBDIR.to_owned());
        if default_subdir.trim().is_empty() {
            return Err(CodedError::config("default_subdir must not be empty").into());
        }

        Ok(Self {
            project_root: project_root.to_path_buf(),
            catalog_path: resolve(file.catalog, DEFAULT_CATALOG),
            sprites_dir: resolve(file.sprites_dir, DEFAULT_SPRITES_DIR),
            backup_dir,
            raw_backup_dir,
            work_dir,
            categories: file.categories.unwrap_or_else(default_category_map),
            default_subdir,
            converter: converter_settings(file.converter)?,
            api: api_settings(file.api)?,
        })
    }

    /// Applies `ARTGEN_*_MODEL` overrides from `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(model) = non_blank(GENERATE_MODEL_ENV) {
            self.api.generate_model = model;
        }
        if let Some(model) = non_blank(EDIT_MODEL_ENV) {
            self.api.edit_model = model;
        }
    }

    pub fn path_resolver(&self) -> PathResolver {
        PathResolver::new(
            self.sprites_dir.clone(),
            self.backup_dir.clone(),
            self.raw_backup_dir.clone(),
            self.categories.clone(),
            self.default_subdir.clone(),
        )
    }
}

/// The API credential has no fallback; a blank value counts as missing.
pub fn require_api_key(value: Option<String>) -> Result<String> {
    value
        .map(|key| key.trim().to_owned())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| CodedError::missing_credential(API_KEY_ENV).into())
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config_yaml(&contents, path)
}

fn parse_config_yaml(contents: &str, path: &Path) -> Result<ConfigFile> {
    if contents.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(contents).map_err(|error| {
        let location = error
            .location()
            .map(|location| format!("line {}, column {}", location.line(), location.column()))
            .unwrap_or_else(|| "unknown location".to_owned());
        anyhow!(CodedError::config(format!(
            "failed to parse {} at {}: {}",
            path.display(),
            location,
            error
        )))
    })
}

fn converter_settings(file: ConverterFile) -> Result<ConverterSettings> {
    let resize_tool = file.resize_tool.unwrap_or(ResizeTool::Sips);
    let default_resize_program = match resize_tool {
        ResizeTool::Sips => DEFAULT_RESIZE_PROGRAM_SIPS,
        ResizeTool::Magick => DEFAULT_RESIZE_PROGRAM_MAGICK,
    };
    let resize_program = file
        .resize_program
        .unwrap_or_else(|| default_resize_program.to_owned());
    let quality = file.quality.unwrap_or(DEFAULT_QUALITY);
    if quality > 100 {
        return Err(CodedError::config(format!(
            "converter.quality must be between 0 and 100, got {quality}"
        ))
        .into());
    }
    let target_size = file.target_size.unwrap_or(DEFAULT_TARGET_SIZE);
    if target_size == 0 {
        return Err(CodedError::config("converter.target_size must be positive").into());
    }

    Ok(ConverterSettings {
        resize_tool,
        resize_program,
        encode_program: file
            .encode_program
            .unwrap_or_else(|| DEFAULT_ENCODE_PROGRAM.to_owned()),
        target_size,
        quality,
    })
}

fn api_settings(file: ApiFile) -> Result<ApiSettings> {
    let raw_base = file.base_url.unwrap_or_else(|| DEFAULT_API_BASE.to_owned());
    let base_url = Url::parse(raw_base.trim_end_matches('/')).map_err(|error| {
        anyhow!(CodedError::config(format!(
            "api.base_url '{raw_base}' is not a valid URL: {error}"
        )))
    })?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(CodedError::config(format!(
            "api.base_url must use http or https, got '{}'",
            base_url.scheme()
        ))
        .into());
    }

    Ok(ApiSettings {
        base_url,
        generate_model: file
            .generate_model
            .unwrap_or_else(|| DEFAULT_GENERATE_MODEL.to_owned()),
        edit_model: file
            .edit_model
            .unwrap_or_else(|| DEFAULT_EDIT_MODEL.to_owned()),
        timeout: Duration::from_secs(file.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)),
    })
}
