//! End-to-end checks against the checked-in `fixtures/site` project.

use content_graph::config::load_config;
use content_graph::load::{Loaded, load};
use content_graph::manifest::{Manifest, build_manifest, navigation, write_manifest};
use content_graph::store::Diagnostic;
use content_graph::types::{EntityKind, Node};
use content_graph::view::{MembershipTargets, Resolved};
use content_graph::visibility::{BuildMode, Visibility};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site")
}

fn load_fixture() -> Loaded {
    let root = fixture_root();
    let config = load_config(&root).unwrap();
    load(&root, &config).unwrap()
}

fn slugs<T: Node>(items: &[T]) -> Vec<String> {
    items.iter().map(|i| i.slug().to_string()).collect()
}

#[test]
fn every_fixture_file_loads() {
    let loaded = load_fixture();
    assert!(loaded.is_clean(), "rejected: {:?}\nunreadable: {:?}", loaded.rejected, loaded.unreadable);
    assert_eq!(loaded.graph.count(EntityKind::Page), 7);
    assert_eq!(loaded.graph.count(EntityKind::Group), 4);
    assert_eq!(loaded.graph.count(EntityKind::Series), 1);
}

#[test]
fn config_selects_production() {
    let config = load_config(&fixture_root()).unwrap();
    assert_eq!(config.drafts.mode, BuildMode::Production);
    assert_eq!(config.drafts.visibility(None), Visibility::PUBLISHED);
    assert_eq!(
        config.drafts.visibility(Some(BuildMode::Development)),
        Visibility::ALL
    );
}

#[test]
fn only_the_missing_note_is_dangling() {
    let loaded = load_fixture();
    assert_eq!(
        loaded.graph.diagnostics(),
        &[Diagnostic::DanglingReference {
            kind: EntityKind::Page,
            slug: "async".into(),
            field: "references",
            target: "pinning-deep-dive".into(),
        }]
    );
}

#[test]
fn drafts_hidden_in_production() {
    let loaded = load_fixture();
    let view = loaded.graph.view(Visibility::PUBLISHED);

    assert!(view.by_slug(EntityKind::Page, "notes").is_none());
    assert!(view.by_slug(EntityKind::Group, "lab").is_none());
    assert_eq!(view.list(EntityKind::Page).len(), 6);

    let writing = view.children("writing").unwrap();
    assert_eq!(slugs(&writing.pages), vec!["style"]);

    let rust = view.children("rust").unwrap();
    assert_eq!(slugs(&rust.subgroups), vec!["async"]);
    assert_eq!(slugs(&rust.series), vec!["tour"]);

    // Published page inside a draft group: visible itself, but its group isn't.
    assert_eq!(
        view.membership("lab-report"),
        Some(MembershipTargets::Groups(vec![]))
    );
}

#[test]
fn drafts_shown_in_development() {
    let loaded = load_fixture();
    let view = loaded.graph.view(Visibility::ALL);

    assert!(view.by_slug(EntityKind::Page, "notes").unwrap().is_draft());
    let writing = view.children("writing").unwrap();
    assert_eq!(slugs(&writing.pages), vec!["notes", "style"]);
    let rust = view.children("rust").unwrap();
    assert_eq!(slugs(&rust.subgroups), vec!["async", "lab"]);
}

#[test]
fn series_reading_order_appends_unlisted_pages() {
    let loaded = load_fixture();
    let view = loaded.graph.view(Visibility::PUBLISHED);
    let pages = view.series_pages("tour").unwrap();
    assert_eq!(slugs(&pages), vec!["ownership", "borrowing", "lifetimes"]);
}

#[test]
fn legacy_fields_read() {
    let loaded = load_fixture();
    let view = loaded.graph.view(Visibility::PUBLISHED);

    let ancestors = view.ancestors("async").unwrap();
    assert_eq!(ancestors.slugs(), vec!["rust"]);
    assert!(ancestors.cycle.is_none());

    let ownership = view.page("ownership").unwrap();
    assert_eq!(ownership.created.format("%Y-%m-%d").to_string(), "2023-02-01");
}

#[test]
fn references_resolve_by_kind() {
    let loaded = load_fixture();
    let view = loaded.graph.view(Visibility::PUBLISHED);
    let refs = view.references("async").unwrap();

    let described: Vec<String> = refs
        .iter()
        .map(|r| match r {
            Resolved::Found(e) => format!("{}:{}", e.kind(), e.slug()),
            Resolved::Unresolved(raw) => format!("? {raw}"),
        })
        .collect();
    assert_eq!(
        described,
        vec!["group:rust", "? pinning-deep-dive", "series:tour"]
    );

    let borrowing = view.references("borrowing").unwrap();
    assert_eq!(
        borrowing[0].entity().map(|e| e.kind()),
        Some(EntityKind::Page)
    );
}

#[test]
fn navigation_follows_mode() {
    let loaded = load_fixture();

    let published = navigation(&loaded.graph.view(Visibility::PUBLISHED));
    let top: Vec<&str> = published.iter().map(|n| n.slug.as_str()).collect();
    assert_eq!(top, vec!["rust", "writing"]);
    assert_eq!(published[0].color, "#B7410E");
    assert_eq!(published[0].children.len(), 1);

    let all = navigation(&loaded.graph.view(Visibility::ALL));
    assert_eq!(all[0].children.len(), 2);
}

#[test]
fn manifest_round_trips_through_disk() {
    let loaded = load_fixture();
    let manifest = build_manifest(&loaded.graph.view(Visibility::PUBLISHED));
    let tmp = TempDir::new().unwrap();

    let path = write_manifest(&manifest, tmp.path()).unwrap();
    let back: Manifest = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

    assert_eq!(back, manifest);
    assert!(back.pages.iter().all(|p| !p.page.draft));
    let tour = back.series.iter().find(|s| s.series.slug == "tour").unwrap();
    assert_eq!(tour.series.cover_image.as_deref(), Some("tour.png"));
    assert_eq!(tour.source.as_deref(), Some("series/tour.toml"));

    let json = std::fs::read_to_string(tmp.path().join("manifest.json")).unwrap();
    assert!(!json.contains("\"lab\""), "draft group named in manifest");
    assert!(!json.contains("\"notes\""), "draft page named in manifest");
}
