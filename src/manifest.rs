//! The JSON manifest handed to the site generator.
//!
//! A [`Manifest`] is a snapshot of one [`GraphView`]: only visible entities
//! appear, and every derived link (children, ancestors, reading order,
//! resolved references) is computed under the same visibility. The link
//! fields copied from each entity (`parents`, `pages`, `membership` and the
//! rest) are cut down to visible slugs too, and a reference that names a
//! hidden entity is dropped. A site generator reading `manifest.json` never
//! needs to know about drafts.
//!
//! ```json
//! {
//!   "show_drafts": false,
//!   "pages": [{ "slug": "intro", "title": "Intro", ..., "source": "pages/intro.md",
//!               "resolved_references": [{ "reference": "group:rust", "kind": "group", "slug": "rust" }] }],
//!   "groups": [{ "slug": "rust", ..., "ancestors": [], "children": { "subgroups": [], "pages": ["intro"], "series": [] } }],
//!   "series": [{ "slug": "tour", ..., "reading_order": ["intro"] }],
//!   "navigation": [{ "slug": "rust", "title": "Rust", "color": "#3B82F6", "children": [] }]
//! }
//! ```

use crate::types::{EntityKind, Group, Membership, Node, Page, Series, Slug};
use crate::view::{GraphView, Resolved};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub show_drafts: bool,
    pub pages: Vec<PageEntry>,
    pub groups: Vec<GroupEntry>,
    pub series: Vec<SeriesEntry>,
    pub navigation: Vec<NavNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    #[serde(flatten)]
    pub page: Page,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub resolved_references: Vec<ReferenceEntry>,
}

/// A reference and what it points at; `kind` and `slug` are absent when
/// the reference didn't resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntityKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<Slug>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEntry {
    #[serde(flatten)]
    pub group: Group,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Nearest first.
    #[serde(default)]
    pub ancestors: Vec<Slug>,
    pub children: ChildLinks,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChildLinks {
    pub subgroups: Vec<Slug>,
    pub pages: Vec<Slug>,
    pub series: Vec<Slug>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesEntry {
    #[serde(flatten)]
    pub series: Series,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub reading_order: Vec<Slug>,
}

/// A group in the navigation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavNode {
    pub slug: Slug,
    pub title: String,
    pub color: String,
    #[serde(default)]
    pub children: Vec<NavNode>,
}

/// Snapshot the visible graph.
pub fn build_manifest(view: &GraphView<'_>) -> Manifest {
    let graph = view.graph();
    let source = |kind: EntityKind, slug: &str| graph.location(kind, slug).map(str::to_string);

    let pages = view
        .list(EntityKind::Page)
        .into_iter()
        .filter_map(|e| view.page(e.slug()))
        .map(|page| PageEntry {
            page: visible_page(view, page),
            source: source(EntityKind::Page, &page.slug),
            resolved_references: view
                .references(&page.slug)
                .unwrap_or_default()
                .into_iter()
                .zip(&page.references)
                .filter(|(_, raw)| !names_hidden(view, raw))
                .map(|(resolved, raw)| reference_entry(raw, resolved))
                .collect(),
        })
        .collect();

    let groups = view
        .list(EntityKind::Group)
        .into_iter()
        .filter_map(|e| view.group(e.slug()))
        .map(|group| {
            let children = view.children(&group.slug).unwrap_or_default();
            GroupEntry {
                group: visible_group(view, group),
                source: source(EntityKind::Group, &group.slug),
                ancestors: view
                    .ancestors(&group.slug)
                    .map(|l| l.groups.iter().map(|g| g.slug.clone()).collect())
                    .unwrap_or_default(),
                children: ChildLinks {
                    subgroups: children.subgroups.iter().map(|g| g.slug.clone()).collect(),
                    pages: children.pages.iter().map(|p| p.slug.clone()).collect(),
                    series: children.series.iter().map(|s| s.slug.clone()).collect(),
                },
            }
        })
        .collect();

    let series = view
        .list(EntityKind::Series)
        .into_iter()
        .filter_map(|e| view.series(e.slug()))
        .map(|series| SeriesEntry {
            series: visible_series(view, series),
            source: source(EntityKind::Series, &series.slug),
            reading_order: view
                .series_pages(&series.slug)
                .unwrap_or_default()
                .iter()
                .map(|p| p.slug.clone())
                .collect(),
        })
        .collect();

    Manifest {
        show_drafts: view.visibility().shows_drafts(),
        pages,
        groups,
        series,
        navigation: navigation(view),
    }
}

/// Keep the slugs that name a visible entity of `kind`.
fn visible_slugs<'a, C>(
    view: &GraphView<'_>,
    kind: EntityKind,
    slugs: impl IntoIterator<Item = &'a Slug>,
) -> C
where
    C: FromIterator<Slug>,
{
    slugs
        .into_iter()
        .filter(|s| view.by_slug(kind, s).is_some())
        .cloned()
        .collect()
}

/// Whether `raw` resolves in the graph but not in the view.
fn names_hidden(view: &GraphView<'_>, raw: &str) -> bool {
    view.graph()
        .resolve_reference(raw)
        .is_some_and(|entity| !view.visibility().admits(&entity))
}

/// A page whose only series is hidden comes out with no groups.
fn visible_page(view: &GraphView<'_>, page: &Page) -> Page {
    let membership = match &page.membership {
        Membership::Series { series } if view.series(series).is_some() => Membership::Series {
            series: series.clone(),
        },
        Membership::Series { .. } => Membership::Groups {
            groups: Default::default(),
        },
        Membership::Groups { groups } => Membership::Groups {
            groups: visible_slugs(view, EntityKind::Group, groups),
        },
    };
    Page {
        membership,
        references: page
            .references
            .iter()
            .filter(|raw| !names_hidden(view, raw))
            .cloned()
            .collect(),
        ..page.clone()
    }
}

fn visible_group(view: &GraphView<'_>, group: &Group) -> Group {
    Group {
        parents: visible_slugs(view, EntityKind::Group, &group.parents),
        subgroups: visible_slugs(view, EntityKind::Group, &group.subgroups),
        series: visible_slugs(view, EntityKind::Series, &group.series),
        pages: visible_slugs(view, EntityKind::Page, &group.pages),
        ..group.clone()
    }
}

fn visible_series(view: &GraphView<'_>, series: &Series) -> Series {
    Series {
        pages: visible_slugs(view, EntityKind::Page, &series.pages),
        groups: visible_slugs(view, EntityKind::Group, &series.groups),
        ..series.clone()
    }
}

fn reference_entry(raw: &str, resolved: Resolved<'_>) -> ReferenceEntry {
    match resolved.entity() {
        Some(entity) => ReferenceEntry {
            reference: raw.to_string(),
            kind: Some(entity.kind()),
            slug: Some(entity.slug().to_string()),
        },
        None => ReferenceEntry {
            reference: raw.to_string(),
            kind: None,
            slug: None,
        },
    }
}

/// The group tree from [`GraphView::roots`] down through visible subgroups.
///
/// A group appears under every visible parent. A subgroup already on the
/// current path is skipped, so a cycle below a root ends the branch.
pub fn navigation(view: &GraphView<'_>) -> Vec<NavNode> {
    let mut path = BTreeSet::new();
    view.roots()
        .into_iter()
        .map(|root| nav_node(view, root, &mut path))
        .collect()
}

fn nav_node<'g>(view: &GraphView<'g>, group: &'g Group, path: &mut BTreeSet<&'g str>) -> NavNode {
    path.insert(&group.slug);
    let children = view
        .children(&group.slug)
        .map(|c| c.subgroups)
        .unwrap_or_default()
        .into_iter()
        .filter(|child| !path.contains(child.slug.as_str()))
        .collect::<Vec<_>>()
        .into_iter()
        .map(|child| nav_node(view, child, path))
        .collect();
    path.remove(group.slug.as_str());
    NavNode {
        slug: group.slug.clone(),
        title: group.title.clone(),
        color: group.color.clone(),
        children,
    }
}

/// Write `manifest.json` into `dir`, creating it if needed.
pub fn write_manifest(manifest: &Manifest, dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(&path, json)?;
    Ok(path)
}
