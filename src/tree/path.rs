//! Virtual path normalization
//!
//! Every path that enters a tree or a host goes through [`normalize`]. The result
//! is an absolute, POSIX-style path with `.`/`..` resolved, repeated separators
//! collapsed, no trailing separator, and Unicode in NFC form.

use crate::error::TreeError;
use unicode_normalization::UnicodeNormalization;

/// The root of every virtual tree.
pub const ROOT: &str = "/";

/// Normalize a virtual path.
///
/// Relative inputs are resolved against the root. Backslashes are treated as
/// separators. Fails if the path contains a NUL byte or climbs above the root.
pub fn normalize(path: &str) -> Result<String, TreeError> {
    if path.contains('\0') {
        return Err(TreeError::InvalidPath(format!(
            "{:?} contains a NUL byte",
            path
        )));
    }

    let normalized: String = path.nfc().collect();
    let mut segments: Vec<&str> = Vec::new();
    for segment in normalized.split(|c: char| c == '/' || c == '\\') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(TreeError::InvalidPath(format!(
                        "{:?} escapes the root",
                        path
                    )));
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Ok(ROOT.to_string());
    }
    Ok(format!("/{}", segments.join("/")))
}

/// Normalize a path that must name a file, so the root itself is rejected.
pub fn normalize_file(path: &str) -> Result<String, TreeError> {
    let normalized = normalize(path)?;
    if normalized == ROOT {
        return Err(TreeError::InvalidPath(format!(
            "{:?} does not name a file",
            path
        )));
    }
    Ok(normalized)
}

/// Join a relative fragment onto a normalized base path.
pub fn join(base: &str, fragment: &str) -> Result<String, TreeError> {
    if base == ROOT {
        normalize(fragment)
    } else {
        normalize(&format!("{}/{}", base, fragment))
    }
}

/// Parent directory of a normalized path (`/` for top-level entries and the root).
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => ROOT,
        Some(idx) => &path[..idx],
    }
}

/// Final segment of a normalized path (empty for the root).
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Whether `path` equals `dir` or lies underneath it.
pub fn is_within(path: &str, dir: &str) -> bool {
    if dir == ROOT {
        return true;
    }
    path == dir
        || (path.starts_with(dir) && path.as_bytes().get(dir.len()) == Some(&b'/'))
}

/// Immediate child segment of `dir` on the way to `path`, if `path` is strictly below `dir`.
pub fn child_segment<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    let rest = if dir == ROOT {
        path.strip_prefix('/')?
    } else {
        path.strip_prefix(dir)?.strip_prefix('/')?
    };
    if rest.is_empty() {
        return None;
    }
    Some(rest.split('/').next().unwrap_or(rest))
}
