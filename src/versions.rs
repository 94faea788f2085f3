use std::fs;
use std::path::Path;

/// Extensions a versioned backup may carry.
pub const KNOWN_EXTENSIONS: &[&str] = &["png", "webp", "jpg", "jpeg"];

pub fn versioned_file_name(id: &str, version: u32, extension: &str) -> String {
    format!("{id}_v{version}.{extension}")
}

/// Extracts `N` from `{id}_v{N}.{ext}`; anything else is not a backup of `id`.
pub fn parse_version(file_name: &str, id: &str) -> Option<u32> {
    let rest = file_name.strip_prefix(id)?.strip_prefix("_v")?;
    let (digits, extension) = rest.split_once('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let extension = extension.to_ascii_lowercase();
    if !KNOWN_EXTENSIONS.contains(&extension.as_str()) {
        return None;
    }
    digits.parse().ok()
}

/// Returns one past the highest existing version of `id` in `dir`, or 1.
///
/// The directory is created when missing. A directory that cannot be read
/// counts as having no versions.
pub fn next_version(dir: &Path, id: &str) -> u32 {
    if let Err(error) = fs::create_dir_all(dir) {
        tracing::warn!(dir = %dir.display(), %error, "could not create backup directory");
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::debug!(dir = %dir.display(), %error, "backup directory unreadable");
            return 1;
        }
    };

    let highest = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            parse_version(name.to_str()?, id)
        })
        .max()
        .unwrap_or(0);

    highest.saturating_add(1)
}
