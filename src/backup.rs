use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::paths::SPRITE_EXTENSION;
use crate::versions::{next_version, versioned_file_name};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedAsset {
    pub version: u32,
    pub path: PathBuf,
    pub sha256: String,
}

/// Moves the current sprite for `id` into `backup_dir` under the next version.
///
/// Returns `None` when there is no current sprite; nothing is touched then.
pub fn archive_current(
    sprite_dir: &Path,
    backup_dir: &Path,
    id: &str,
) -> Result<Option<ArchivedAsset>> {
    let current = sprite_dir.join(format!("{id}.{SPRITE_EXTENSION}"));
    if !current.is_file() {
        return Ok(None);
    }

    let bytes = fs::read(&current)
        .with_context(|| format!("failed to read current sprite {}", current.display()))?;
    let sha256 = format!("{:x}", Sha256::digest(&bytes));

    let version = next_version(backup_dir, id);
    fs::create_dir_all(backup_dir)
        .with_context(|| format!("failed to create backup directory {}", backup_dir.display()))?;
    let target = backup_dir.join(versioned_file_name(id, version, SPRITE_EXTENSION));

    move_file(&current, &target)?;
    tracing::info!(
        from = %current.display(),
        to = %target.display(),
        version,
        %sha256,
        "archived current sprite"
    );

    Ok(Some(ArchivedAsset {
        version,
        path: target,
        sha256,
    }))
}

/// Renames when possible; across filesystems falls back to copy + remove.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_error) => {
            tracing::debug!(
                from = %from.display(),
                to = %to.display(),
                error = %rename_error,
                "rename failed; copying instead"
            );
            fs::copy(from, to).with_context(|| {
                format!(
                    "failed to move {} to {} (rename: {rename_error})",
                    from.display(),
                    to.display()
                )
            })?;
            fs::remove_file(from)
                .with_context(|| format!("failed to remove {} after copy", from.display()))
        }
    }
}
