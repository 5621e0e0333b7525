//! Filesystem path helpers for save-path resolution
//!
//! Locations come from URLs, so every piece of a candidate path is hostile
//! input until it has been confined to its root.

use std::path::{Component, Path, PathBuf};

/// Resolves a location-derived relative string under `root`, segment by
/// segment, rejecting anything that would escape the root
///
/// `.` and empty segments are dropped, `..` pops the last accepted segment.
/// A `..` with nothing left to pop would step outside `root` and rejects the
/// whole candidate, as does a candidate that resolves to `root` itself (save
/// paths must be strict descendants).
pub fn confine(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    let mut depth = 0usize;

    for segment in relative.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if depth == 0 {
                    return None;
                }
                path.pop();
                depth -= 1;
            }
            _ => {
                path.push(segment);
                depth += 1;
            }
        }
    }

    if depth == 0 {
        return None;
    }

    Some(path)
}

/// Reduces a location string to the alphanumeric characters used as an
/// external resource's filename
pub fn sanitize_filename(location: &str) -> String {
    location.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Derives a file extension (with leading dot) from a location's final path
/// segment, if it carries one
pub fn extension_from_location(location: &str) -> Option<String> {
    let without_query = location.split('?').next().unwrap_or(location);
    let last_segment = without_query.rsplit('/').next().unwrap_or("");

    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            let ext: String = ext
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect();
            (!ext.is_empty()).then(|| format!(".{ext}"))
        }
        _ => None,
    }
}

/// Derives a file extension (with leading dot) from a content-type's
/// subtype, e.g. `text/css` -> `.css`, `image/svg+xml` -> `.svg`
pub fn extension_from_content_type(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    let subtype = essence.split('/').nth(1)?;
    let ext: String = subtype
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    (!ext.is_empty()).then(|| format!(".{}", ext.to_ascii_lowercase()))
}

/// Computes the path of `to` relative to the directory `from_dir`
///
/// Both paths must stem from the same content root for the result to make
/// sense; the common prefix is dropped and the remaining `from_dir`
/// components become `..` hops.
pub fn relative_from(from_dir: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component> = from_dir.components().collect();
    let to: Vec<Component> = to.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    for component in &to[common..] {
        relative.push(component.as_os_str());
    }

    relative
}
