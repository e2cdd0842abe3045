//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. The primary display
//! for every entity is its identity (positional index, title and slug), with
//! the file it came from shown as an indented `Source:` line. This keeps a
//! listing readable as a content inventory while still letting users trace
//! an entity back to its file.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Rejected
//!     page 'untitled' (pages/untitled.md)
//!         title: required field is missing
//!
//! Warnings
//!     page 'intro' references: 'missing-note' does not exist
//!
//! Loaded 3 pages, 2 groups, 1 series (1 rejected, 0 unreadable, 1 warning)
//! ```
//!
//! ## List
//!
//! ```text
//! Groups
//! 001 Async Rust (async)
//!     Source: groups/async.md
//! 002 Rust (rust)
//!     Source: groups/rust.yaml
//! ```
//!
//! ## Tree
//!
//! ```text
//! 001 Rust (rust)
//!     001 Async Rust (async)
//! 002 Writing (writing)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::load::Loaded;
use crate::manifest::NavNode;
use crate::store::{Diagnostic, DuplicateSlug};
use crate::types::{EntityKind, EntityRef, Node};
use crate::view::{GraphView, MembershipTargets, Resolved};
use chrono::{DateTime, Utc};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entity header: positional index, title and slug, marking drafts.
///
/// ```text
/// 001 Ownership (ownership)
/// 002 Unfinished notes (notes) [draft]
/// ```
fn entity_header(index: usize, entity: &dyn Node) -> String {
    let draft = if entity.is_draft() { " [draft]" } else { "" };
    format!(
        "{} {} ({}){}",
        format_index(index),
        entity.title(),
        entity.slug(),
        draft
    )
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn section_title(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Page => "Pages",
        EntityKind::Group => "Groups",
        EntityKind::Series => "Series",
    }
}

/// Push `label: a, b, c` when `items` isn't empty.
fn push_list(lines: &mut Vec<String>, depth: usize, label: &str, items: &[String]) {
    if !items.is_empty() {
        lines.push(format!("{}{}: {}", indent(depth), label, items.join(", ")));
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the result of loading: every dropped record, every warning, and a
/// summary line.
pub fn format_check_output(loaded: &Loaded) -> Vec<String> {
    let mut lines = Vec::new();

    if !loaded.rejected.is_empty() {
        lines.push("Rejected".to_string());
        for error in &loaded.rejected {
            lines.push(format!(
                "    {} '{}' ({})",
                error.kind, error.slug, error.location
            ));
            for field_error in &error.errors {
                lines.push(format!("        {}", field_error));
            }
        }
        lines.push(String::new());
    }

    if !loaded.unreadable.is_empty() {
        lines.push("Unreadable".to_string());
        for failure in &loaded.unreadable {
            lines.push(format!("    {}", failure.location));
            lines.push(format!("        {}", failure.error));
        }
        lines.push(String::new());
    }

    let diagnostics = loaded.graph.diagnostics();
    if !diagnostics.is_empty() {
        lines.push("Warnings".to_string());
        lines.extend(format_diagnostics(diagnostics));
        lines.push(String::new());
    }

    let graph = &loaded.graph;
    lines.push(format!(
        "Loaded {}, {}, {} ({} rejected, {} unreadable, {})",
        plural(graph.count(EntityKind::Page), "page", "pages"),
        plural(graph.count(EntityKind::Group), "group", "groups"),
        graph.count(EntityKind::Series).to_string() + " series",
        loaded.rejected.len(),
        loaded.unreadable.len(),
        plural(diagnostics.len(), "warning", "warnings"),
    ));
    lines
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|d| format!("    {d}")).collect()
}

/// Format duplicate slug errors, one block per extra definition.
pub fn format_duplicates(duplicates: &[DuplicateSlug]) -> Vec<String> {
    let mut lines = vec!["Duplicate slugs".to_string()];
    for dup in duplicates {
        lines.push(format!("    {} '{}'", dup.kind, dup.slug));
        lines.push(format!("        First: {}", dup.first));
        lines.push(format!("        Again: {}", dup.second));
    }
    lines
}

pub fn print_check_output(loaded: &Loaded) {
    for line in format_check_output(loaded) {
        println!("{}", line);
    }
}

pub fn print_duplicates(duplicates: &[DuplicateSlug]) {
    for line in format_duplicates(duplicates) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// List
// ============================================================================

/// Format every visible entity of `kind`, in slug order.
pub fn format_listing(view: &GraphView<'_>, kind: EntityKind) -> Vec<String> {
    let mut lines = vec![section_title(kind).to_string()];
    for (i, entity) in view.list(kind).iter().enumerate() {
        lines.push(entity_header(i + 1, entity));
        if let Some(source) = view.graph().location(kind, entity.slug()) {
            lines.push(format!("    Source: {}", source));
        }
        if let Some(desc) = description(*entity) {
            let truncated = truncate_desc(desc.trim(), 60);
            if !truncated.is_empty() {
                lines.push(format!("    {}", truncated));
            }
        }
    }
    lines
}

fn description(entity: EntityRef<'_>) -> Option<&str> {
    match entity {
        EntityRef::Page(p) => p.description.as_deref(),
        EntityRef::Group(g) => Some(&g.description),
        EntityRef::Series(s) => s.description.as_deref(),
    }
}

pub fn print_listing(view: &GraphView<'_>, kind: EntityKind) {
    for line in format_listing(view, kind) {
        println!("{}", line);
    }
}

// ============================================================================
// Show
// ============================================================================

/// Format one entity with its resolved relationships.
///
/// Returns `None` when the entity doesn't exist or isn't visible.
pub fn format_entity(view: &GraphView<'_>, kind: EntityKind, slug: &str) -> Option<Vec<String>> {
    let entity = view.by_slug(kind, slug)?;
    let mut lines = vec![format!(
        "{} {} ({}){}",
        kind,
        entity.title(),
        entity.slug(),
        if entity.is_draft() { " [draft]" } else { "" }
    )];
    if let Some(source) = view.graph().location(kind, slug) {
        lines.push(format!("    Source: {}", source));
    }
    if let Some(desc) = description(entity) {
        lines.push(format!("    Description: {}", desc.trim()));
    }
    lines.push(format!("    Created: {}", format_date(entity.created())));
    if let Some(updated) = entity.updated() {
        lines.push(format!("    Updated: {}", format_date(updated)));
    }

    match entity {
        EntityRef::Page(page) => {
            let tags: Vec<String> = page.tags.iter().cloned().collect();
            push_list(&mut lines, 1, "Tags", &tags);
            match view.membership(slug) {
                Some(MembershipTargets::Groups(groups)) => {
                    let slugs: Vec<String> = groups.iter().map(|g| g.slug.clone()).collect();
                    push_list(&mut lines, 1, "Groups", &slugs);
                }
                Some(MembershipTargets::Series(Some(series))) => {
                    lines.push(format!("    Series: {}", series.slug));
                }
                Some(MembershipTargets::Series(None)) | None => {}
            }
            let references: Vec<String> = view
                .references(slug)
                .unwrap_or_default()
                .into_iter()
                .map(|r| match r {
                    Resolved::Found(e) => format!("{}:{}", e.kind(), e.slug()),
                    Resolved::Unresolved(raw) => format!("{raw} (unresolved)"),
                })
                .collect();
            push_list(&mut lines, 1, "References", &references);
        }
        EntityRef::Group(group) => {
            lines.push(format!("    Color: {}", group.color));
            if let Some(lineage) = view.ancestors(slug) {
                let slugs: Vec<String> = lineage.slugs().iter().map(|s| s.to_string()).collect();
                push_list(&mut lines, 1, "Ancestors", &slugs);
                if let Some(cycle) = lineage.cycle {
                    lines.push(format!("    Warning: {}", cycle));
                }
            }
            if let Some(children) = view.children(slug) {
                let sub: Vec<String> = children.subgroups.iter().map(|g| g.slug.clone()).collect();
                let pages: Vec<String> = children.pages.iter().map(|p| p.slug.clone()).collect();
                let series: Vec<String> = children.series.iter().map(|s| s.slug.clone()).collect();
                push_list(&mut lines, 1, "Subgroups", &sub);
                push_list(&mut lines, 1, "Pages", &pages);
                push_list(&mut lines, 1, "Series", &series);
            }
        }
        EntityRef::Series(series) => {
            let groups: Vec<String> = series
                .groups
                .iter()
                .filter(|g| view.group(g).is_some())
                .cloned()
                .collect();
            push_list(&mut lines, 1, "Groups", &groups);
            if let Some(cover) = &series.cover_image {
                lines.push(format!("    Cover: {}", cover));
            }
            let pages = view.series_pages(slug).unwrap_or_default();
            if !pages.is_empty() {
                lines.push("    Reading order".to_string());
                for (i, page) in pages.iter().enumerate() {
                    lines.push(format!("{}{}", indent(2), entity_header(i + 1, *page)));
                }
            }
        }
    }
    Some(lines)
}

pub fn print_entity(view: &GraphView<'_>, kind: EntityKind, slug: &str) -> bool {
    match format_entity(view, kind, slug) {
        Some(lines) => {
            for line in lines {
                println!("{}", line);
            }
            true
        }
        None => false,
    }
}

// ============================================================================
// Tree
// ============================================================================

/// Format the navigation tree, indices restarting at each sibling level.
pub fn format_tree(nav: &[NavNode]) -> Vec<String> {
    let mut lines = Vec::new();
    format_tree_recursive(nav, 0, &mut lines);
    lines
}

fn format_tree_recursive(nodes: &[NavNode], depth: usize, lines: &mut Vec<String>) {
    for (i, node) in nodes.iter().enumerate() {
        lines.push(format!(
            "{}{} {} ({})",
            indent(depth),
            format_index(i + 1),
            node.title,
            node.slug
        ));
        format_tree_recursive(&node.children, depth + 1, lines);
    }
}

pub fn print_tree(nav: &[NavNode]) {
    for line in format_tree(nav) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::load_records;
    use crate::schema::SchemaOptions;
    use crate::store::ContentGraph;
    use crate::test_helpers::*;
    use crate::visibility::Visibility;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn site() -> ContentGraph {
        graph_of(vec![
            group_with(group_record("rust", group_fields()), "title", json!("Rust")),
            group_with(
                group_with(group_record("async", group_fields()), "title", json!("Async")),
                "parent",
                json!("rust"),
            ),
            page_record("intro", json!({
                "title": "Intro",
                "description": "Where to start",
                "created": "2024-01-01",
                "updated": "2024-02-01",
                "groups": ["rust"],
                "tags": ["basics"],
                "references": ["group:async", "ghost"],
            })),
            page_record("notes", json!({
                "title": "Notes",
                "created": "2024-01-01",
                "groups": ["rust"],
                "draft": true,
            })),
            page_in_series("p1", "tour"),
            page_in_series("p2", "tour"),
            series_with(series_record("tour", series_fields(&["p2", "p1"])), "title", json!("Tour")),
        ])
    }

    #[test]
    fn truncate_desc_short() {
        assert_eq!(truncate_desc("Short text", 40), "Short text");
    }

    #[test]
    fn truncate_desc_exact() {
        let text = "a".repeat(40);
        assert_eq!(truncate_desc(&text, 40), text);
    }

    #[test]
    fn truncate_desc_long() {
        let text = "a".repeat(50);
        let expected = format!("{}...", "a".repeat(40));
        assert_eq!(truncate_desc(&text, 40), expected);
    }

    #[test]
    fn truncate_desc_multibyte() {
        assert_eq!(truncate_desc("ééééé", 2), "éé...");
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn listing_hides_drafts_in_production() {
        let graph = site();
        let lines = format_listing(&graph.view(Visibility::PUBLISHED), EntityKind::Page);
        assert_eq!(
            lines,
            vec![
                "Pages",
                "001 Intro (intro)",
                "    Source: pages/intro.md",
                "    Where to start",
                "002 P1 (p1)",
                "    Source: pages/p1.md",
                "003 P2 (p2)",
                "    Source: pages/p2.md",
            ]
        );
    }

    #[test]
    fn listing_marks_drafts_in_development() {
        let graph = site();
        let lines = format_listing(&graph.view(Visibility::ALL), EntityKind::Page);
        assert!(lines.contains(&"002 Notes (notes) [draft]".to_string()));
    }

    #[test]
    fn show_page() {
        let graph = site();
        let lines = format_entity(&graph.view(Visibility::PUBLISHED), EntityKind::Page, "intro").unwrap();
        assert_eq!(
            lines,
            vec![
                "page Intro (intro)",
                "    Source: pages/intro.md",
                "    Description: Where to start",
                "    Created: 2024-01-01",
                "    Updated: 2024-02-01",
                "    Tags: basics",
                "    Groups: rust",
                "    References: ghost (unresolved), group:async",
            ]
        );
    }

    #[test]
    fn show_group_lists_visible_children() {
        let graph = site();
        let lines = format_entity(&graph.view(Visibility::PUBLISHED), EntityKind::Group, "rust").unwrap();
        assert!(lines.contains(&"    Subgroups: async".to_string()));
        assert!(lines.contains(&"    Pages: intro".to_string()));
        assert!(!lines.iter().any(|l| l.contains("Ancestors")));

        let lines = format_entity(&graph.view(Visibility::ALL), EntityKind::Group, "rust").unwrap();
        assert!(lines.contains(&"    Pages: intro, notes".to_string()));

        let lines = format_entity(&graph.view(Visibility::ALL), EntityKind::Group, "async").unwrap();
        assert!(lines.contains(&"    Ancestors: rust".to_string()));
    }

    #[test]
    fn show_series_in_reading_order() {
        let graph = site();
        let lines = format_entity(&graph.view(Visibility::PUBLISHED), EntityKind::Series, "tour").unwrap();
        let tail: Vec<&str> = lines.iter().rev().take(3).rev().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec!["    Reading order", "        001 P2 (p2)", "        002 P1 (p1)"]
        );
    }

    #[test]
    fn show_hidden_entity_is_none() {
        let graph = site();
        let view = graph.view(Visibility::PUBLISHED);
        assert!(format_entity(&view, EntityKind::Page, "notes").is_none());
        assert!(format_entity(&view, EntityKind::Page, "nope").is_none());
    }

    #[test]
    fn tree_indexes_per_level() {
        let nav = vec![
            NavNode {
                slug: "rust".into(),
                title: "Rust".into(),
                color: "#B7410E".into(),
                children: vec![NavNode {
                    slug: "async".into(),
                    title: "Async".into(),
                    color: "#3B82F6".into(),
                    children: vec![],
                }],
            },
            NavNode {
                slug: "writing".into(),
                title: "Writing".into(),
                color: "#3B82F6".into(),
                children: vec![],
            },
        ];
        assert_eq!(
            format_tree(&nav),
            vec!["001 Rust (rust)", "    001 Async (async)", "002 Writing (writing)"]
        );
    }

    #[test]
    fn check_output_reports_everything() {
        let records = vec![
            group_record("rust", group_fields()),
            page_record("untitled", json!({"created": "2024-01-01", "groups": ["rust"]})),
            page_record("intro", json!({
                "title": "Intro",
                "created": "2024-01-01",
                "groups": ["rust"],
                "references": ["missing-note"],
            })),
        ];
        let loaded = load_records(records, &SchemaOptions::default()).unwrap();
        let lines = format_check_output(&loaded);
        assert_eq!(
            lines,
            vec![
                "Rejected",
                "    page 'untitled' (pages/untitled.md)",
                "        title: required field is missing",
                "",
                "Warnings",
                "    page 'intro' references: 'missing-note' does not exist",
                "",
                "Loaded 1 page, 1 group, 0 series (1 rejected, 0 unreadable, 1 warning)",
            ]
        );
    }

    #[test]
    fn clean_check_is_one_line() {
        let loaded = load_records(vec![group_record("rust", group_fields())], &SchemaOptions::default()).unwrap();
        assert_eq!(
            format_check_output(&loaded),
            vec!["Loaded 0 pages, 1 group, 0 series (0 rejected, 0 unreadable, 0 warnings)"]
        );
    }

    #[test]
    fn duplicates_name_both_sources() {
        let lines = format_duplicates(&[DuplicateSlug {
            kind: EntityKind::Group,
            slug: "a".into(),
            first: "groups/a.md".into(),
            second: "groups/a.json".into(),
        }]);
        assert_eq!(
            lines,
            vec![
                "Duplicate slugs",
                "    group 'a'",
                "        First: groups/a.md",
                "        Again: groups/a.json",
            ]
        );
    }
}
