//! Shared test utilities for the content-graph test suite.
//!
//! Provides record builders, a one-call graph constructor, the on-disk
//! fixture tree, and lookup helpers for manifests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let graph = graph_of(vec![
//!     group_record("rust", group_fields()),
//!     group_with(group_record("async", group_fields()), "parent", json!("rust")),
//!     page_in_series("p1", "tour"),
//!     series_record("tour", series_fields(&["p1"])),
//! ]);
//! let view = graph.view(Visibility::PUBLISHED);
//! ```

use serde_json::{Value, json};
use std::path::Path;
use tempfile::TempDir;

use crate::manifest::{GroupEntry, Manifest, NavNode, PageEntry};
use crate::schema::{RawRecord, SchemaOptions, validate};
use crate::store::ContentGraph;
use crate::types::{Entity, EntityKind};

// =========================================================================
// Records
// =========================================================================

/// A raw record located at `{collection}/{slug}.md`.
pub fn record(kind: EntityKind, slug: &str, data: Value) -> RawRecord {
    RawRecord::new(kind, slug, format!("{}/{slug}.md", kind.collection()), data)
}

pub fn page_record(slug: &str, data: Value) -> RawRecord {
    record(EntityKind::Page, slug, data)
}

pub fn group_record(slug: &str, data: Value) -> RawRecord {
    record(EntityKind::Group, slug, data)
}

pub fn series_record(slug: &str, data: Value) -> RawRecord {
    record(EntityKind::Series, slug, data)
}

/// Minimal valid group fields.
pub fn group_fields() -> Value {
    json!({
        "title": "A group",
        "description": "Things that belong together",
        "created": "2024-01-01",
    })
}

/// Minimal valid series fields with the given reading order.
pub fn series_fields(pages: &[&str]) -> Value {
    json!({
        "title": "A series",
        "created": "2024-01-01",
        "pages": pages,
    })
}

/// A published page that belongs to `series`.
pub fn page_in_series(slug: &str, series: &str) -> RawRecord {
    page_record(
        slug,
        json!({
            "title": slug.to_uppercase(),
            "created": "2024-01-01",
            "series": series,
        }),
    )
}

/// A published series listing no pages, attached to `groups`.
pub fn series_with_groups(slug: &str, groups: &[&str]) -> RawRecord {
    series_with(series_record(slug, series_fields(&[])), "groups", json!(groups))
}

/// Set one field of a record's data.
pub fn with_field(mut record: RawRecord, key: &str, value: Value) -> RawRecord {
    if let Value::Object(map) = &mut record.data {
        map.insert(key.to_string(), value);
    }
    record
}

pub fn page_with(record: RawRecord, key: &str, value: Value) -> RawRecord {
    with_field(record, key, value)
}

pub fn group_with(record: RawRecord, key: &str, value: Value) -> RawRecord {
    with_field(record, key, value)
}

pub fn series_with(record: RawRecord, key: &str, value: Value) -> RawRecord {
    with_field(record, key, value)
}

/// Validate with default options. Panics with the validation report on failure.
pub fn validated(record: RawRecord) -> Entity {
    validate(&record, &SchemaOptions::default()).unwrap_or_else(|e| panic!("{e}"))
}

/// Validate every record and build a graph. Panics on any error.
pub fn graph_of(records: Vec<RawRecord>) -> ContentGraph {
    ContentGraph::build(records.into_iter().map(|r| {
        let location = r.location.clone();
        (validated(r), location)
    }))
    .unwrap_or_else(|e| panic!("{e}"))
}

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Manifest lookups (panic with a clear message on miss)
// =========================================================================

/// Find a page entry by slug. Panics if not found.
pub fn find_page<'a>(manifest: &'a Manifest, slug: &str) -> &'a PageEntry {
    manifest
        .pages
        .iter()
        .find(|p| p.page.slug == slug)
        .unwrap_or_else(|| {
            let slugs: Vec<&str> = manifest.pages.iter().map(|p| p.page.slug.as_str()).collect();
            panic!("page '{slug}' not found. Available: {slugs:?}")
        })
}

/// Find a group entry by slug. Panics if not found.
pub fn find_group<'a>(manifest: &'a Manifest, slug: &str) -> &'a GroupEntry {
    manifest
        .groups
        .iter()
        .find(|g| g.group.slug == slug)
        .unwrap_or_else(|| {
            let slugs: Vec<&str> = manifest.groups.iter().map(|g| g.group.slug.as_str()).collect();
            panic!("group '{slug}' not found. Available: {slugs:?}")
        })
}

// =========================================================================
// Navigation helpers
// =========================================================================

/// Top-level navigation slugs in order.
pub fn nav_slugs(nav: &[NavNode]) -> Vec<&str> {
    nav.iter().map(|n| n.slug.as_str()).collect()
}

/// Assert that the navigation tree matches an expected two-level shape.
///
/// Each entry is `(slug, children)`. Use `&[]` for leaf nodes.
pub fn assert_nav_shape(nav: &[NavNode], expected: &[(&str, &[&str])]) {
    let expected_slugs: Vec<&str> = expected.iter().map(|(s, _)| *s).collect();
    assert_eq!(nav_slugs(nav), expected_slugs, "nav top-level slugs mismatch");

    for ((slug, children), node) in expected.iter().zip(nav) {
        assert_eq!(
            nav_slugs(&node.children),
            children.to_vec(),
            "nav children of '{slug}' mismatch"
        );
    }
}
