//! Directory and file naming for the output tree.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Prefix of every multi-member group directory
pub const GROUP_PREFIX: &str = "Group_";

/// Shared directory for images that matched nothing
pub const UNIQUE_DIR: &str = "Unique";

/// Maximum length of a group directory name before any collision suffix
pub const MAX_GROUP_NAME_CHARS: usize = 50;

/// Directory name for a group whose representative is called `name`.
///
/// Keeps alphanumerics, spaces, `-` and `_`, trims, prefixes `Group_` and
/// truncates to 50 characters.
pub fn group_dir_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(*c, ' ' | '-' | '_'))
        .collect();

    format!("{}{}", GROUP_PREFIX, kept.trim())
        .chars()
        .take(MAX_GROUP_NAME_CHARS)
        .collect()
}

/// First free path among `base`, `base_1`, `base_2`, ...
///
/// The suffix goes after the whole final component, so it is meant for
/// directories.
pub fn next_free_dir(base: &Path, mut is_taken: impl FnMut(&Path) -> bool) -> PathBuf {
    if !is_taken(base) {
        return base.to_path_buf();
    }

    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut counter = 1usize;
    loop {
        let candidate = base.with_file_name(format!("{}_{}", name, counter));
        if !is_taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Destination for `file_name` inside `dir`.
///
/// When the name is already on disk or already planned (`planned`), a
/// running counter goes before the extension: `photo.jpg`, `photo_1.jpg`,
/// `photo_2.jpg`. The chosen name is recorded in `planned`.
pub fn plan_file_destination(
    dir: &Path,
    file_name: &str,
    planned: &mut HashSet<String>,
) -> PathBuf {
    let is_free = |name: &str, planned: &HashSet<String>| {
        !planned.contains(name) && !dir.join(name).exists()
    };

    let chosen = if is_free(file_name, planned) {
        file_name.to_string()
    } else {
        let (stem, ext) = split_extension(file_name);
        let mut counter = 1usize;
        loop {
            let candidate = format!("{}_{}{}", stem, counter, ext);
            if is_free(&candidate, planned) {
                break candidate;
            }
            counter += 1;
        }
    };

    planned.insert(chosen.clone());
    dir.join(chosen)
}

/// Split `photo.tar.jpg` into (`photo.tar`, `.jpg`). Names without a dot,
/// or whose only dot is leading, have no extension.
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => file_name.split_at(pos),
        _ => (file_name, ""),
    }
}
