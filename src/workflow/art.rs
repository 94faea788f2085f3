//! Generate and edit workflows for a single catalog item.
//!
//! Both run `lookup -> backup -> generate -> persist raw -> convert`. The
//! backup always happens before anything new is written, so a failed call
//! never costs the previous sprite.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::backup::{archive_current, ArchivedAsset};
use crate::catalog::{Catalog, PromptEntry};
use crate::error_codes::CodedError;
use crate::paths::{validate_item_id, CategoryPaths, PathResolver};
use crate::versions::{next_version, versioned_file_name};
use crate::workflow::converter::ImageConverter;
use crate::workflow::gemini_client::ImageGenerator;
use crate::workflow::types::{ArtMode, ArtOutcome, GeneratedImage};

/// Collaborators shared by both workflows.
pub struct ArtContext<'a> {
    pub resolver: &'a PathResolver,
    pub generator: &'a dyn ImageGenerator,
    pub converter: &'a dyn ImageConverter,
    pub work_dir: &'a Path,
}

pub fn generate_art(ctx: &ArtContext<'_>, catalog: &Catalog, id: &str) -> Result<ArtOutcome> {
    let entry = catalog.require(id)?;
    validate_item_id(&entry.id)?;
    let paths = ctx.resolver.resolve(&entry.category);

    println!("\nGenerating: {} ({})", entry.name, entry.id);
    println!("Category: {}", entry.category);

    let archived = archive_step(&paths, &entry.id)?;

    println!("  Calling Gemini API...");
    let image = ctx
        .generator
        .generate(&entry.prompt)
        .with_context(|| format!("image generation failed for '{}'", entry.id))?;

    finish(ctx, ArtMode::Generate, entry, &paths, archived, image)
}

pub fn edit_art(
    ctx: &ArtContext<'_>,
    catalog: &Catalog,
    id: &str,
    instruction: &str,
) -> Result<ArtOutcome> {
    let entry = catalog.require(id)?;
    let current = existing_sprite(ctx.resolver, entry)?;
    let paths = ctx.resolver.resolve(&entry.category);

    println!("\nEditing: {} ({})", entry.name, entry.id);
    println!("Edit instruction: {instruction}");

    // The backup step moves the sprite away, so edit from a copy.
    fs::create_dir_all(ctx.work_dir)
        .with_context(|| format!("failed to create work directory {}", ctx.work_dir.display()))?;
    let source_copy = ctx
        .work_dir
        .join(format!("{}_source.{}", entry.id, extension_of(&current)));
    fs::copy(&current, &source_copy).with_context(|| {
        format!(
            "failed to copy {} to {}",
            current.display(),
            source_copy.display()
        )
    })?;

    let archived = archive_step(&paths, &entry.id)?;

    println!("  Calling Gemini API (edit mode)...");
    let image = ctx
        .generator
        .edit(&source_copy, instruction)
        .with_context(|| format!("image edit failed for '{}'", entry.id))?;

    let outcome = finish(ctx, ArtMode::Edit, entry, &paths, archived, image)?;
    remove_temp(&source_copy);
    Ok(outcome)
}

/// Path of the sprite an edit would start from, failing with
/// `NoExistingAsset` when there is nothing to edit.
pub fn existing_sprite(resolver: &PathResolver, entry: &PromptEntry) -> Result<PathBuf> {
    validate_item_id(&entry.id)?;
    let current = resolver.resolve(&entry.category).sprite_path(&entry.id);
    if !current.is_file() {
        return Err(CodedError::no_existing_asset(&current).into());
    }
    Ok(current)
}

fn archive_step(paths: &CategoryPaths, id: &str) -> Result<Option<ArchivedAsset>> {
    let archived = archive_current(&paths.sprite_dir, &paths.backup_dir, id)
        .with_context(|| format!("failed to back up current sprite for '{id}'"))?;
    if let Some(asset) = &archived {
        println!("  Backed up existing: {}", display_name(&asset.path));
    }
    Ok(archived)
}

fn finish(
    ctx: &ArtContext<'_>,
    mode: ArtMode,
    entry: &PromptEntry,
    paths: &CategoryPaths,
    archived: Option<ArchivedAsset>,
    image: GeneratedImage,
) -> Result<ArtOutcome> {
    let id = entry.id.as_str();
    let extension = image.extension();

    for dir in [
        paths.sprite_dir.as_path(),
        paths.raw_backup_dir.as_path(),
        ctx.work_dir,
    ] {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }

    let temp_raw = ctx
        .work_dir
        .join(format!("{id}_{}.{extension}", mode.label()));
    fs::write(&temp_raw, &image.data)
        .with_context(|| format!("failed to write {}", temp_raw.display()))?;
    println!(
        "  {} {}: {} bytes",
        capitalize(mode.label()),
        extension.to_uppercase(),
        image.data.len()
    );

    let raw_version = next_version(&paths.raw_backup_dir, id);
    let raw_backup_path = paths
        .raw_backup_dir
        .join(versioned_file_name(id, raw_version, extension));
    fs::write(&raw_backup_path, &image.data)
        .with_context(|| format!("failed to write raw backup {}", raw_backup_path.display()))?;
    println!(
        "  Saved {} backup: {}",
        extension.to_uppercase(),
        display_name(&raw_backup_path)
    );

    let sprite_path = paths.sprite_path(id);
    println!("  Converting to sprite...");
    ctx.converter
        .convert(&temp_raw, &sprite_path)
        .with_context(|| format!("conversion failed for '{id}'"))?;
    println!("  Saved WebP: {}", sprite_path.display());

    remove_temp(&temp_raw);
    tracing::info!(id, sprite = %sprite_path.display(), raw_version, "{} sprite", mode.label());

    Ok(ArtOutcome {
        mode,
        entry: entry.clone(),
        sprite_path,
        archived,
        raw_backup_path,
        raw_version,
        raw_bytes: image.data.len(),
    })
}

fn remove_temp(path: &Path) {
    if let Err(error) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), %error, "could not remove temporary file");
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("img")
        .to_owned()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
