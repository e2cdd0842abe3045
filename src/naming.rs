//! Slug derivation and slug syntax.
//!
//! A slug is one or more `/`-separated segments of lowercase ASCII letters,
//! digits, `-` and `_`. Files get their slug from the path relative to their
//! collection directory:
//!
//! - `pages/intro.md` → `intro`
//! - `groups/Rust/Async Basics.md` → `rust/async-basics`
//! - `pages/notes/index.md` → `notes` (a trailing `index` segment is dropped)
//!
//! A `slug` key in the front matter takes precedence over the path.

use crate::types::Slug;
use std::path::{Component, Path};

const MAX_SEGMENT_LEN: usize = 80;

/// Check that `slug` follows the slug syntax.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        })
}

/// Sanitize a single path segment for use in a slug.
///
/// - Lowercases ASCII letters
/// - Replaces anything other than letters, digits, `-` and `_` with dashes
/// - Collapses consecutive dashes and strips leading/trailing dashes
/// - Truncates to `MAX_SEGMENT_LEN` characters (breaks at last dash before limit)
pub fn sanitize_segment(segment: &str) -> String {
    let mut collapsed = String::with_capacity(segment.len());
    let mut prev_dash = false;
    for c in segment.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' {
            c.to_ascii_lowercase()
        } else {
            '-'
        };
        if c == '-' {
            if !prev_dash {
                collapsed.push('-');
            }
            prev_dash = true;
        } else {
            collapsed.push(c);
            prev_dash = false;
        }
    }

    let trimmed = collapsed.trim_matches('-');
    if trimmed.len() <= MAX_SEGMENT_LEN {
        trimmed.to_string()
    } else {
        let truncated = &trimmed[..MAX_SEGMENT_LEN];
        match truncated.rfind('-') {
            Some(pos) => truncated[..pos].to_string(),
            None => truncated.to_string(),
        }
    }
}

/// Derive a slug from a file path relative to its collection directory.
///
/// Returns `None` when no segment survives sanitization.
pub fn slug_from_path(relative: &Path) -> Option<Slug> {
    let stemmed = relative.with_extension("");
    let mut segments: Vec<String> = stemmed
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(sanitize_segment(&s.to_string_lossy())),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect();

    if segments.len() > 1 && segments.last().is_some_and(|s| s == "index") {
        segments.pop();
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}
