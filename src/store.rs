//! The content graph store.
//!
//! Validated entities are committed once, through a [`GraphBuilder`], into an
//! immutable [`ContentGraph`]. The builder is not queryable: a graph only
//! exists after [`GraphBuilder::finish`] has seen every entity and found no
//! duplicate slugs, so a half-populated store can never be observed.
//!
//! ## Derived adjacency
//!
//! Relationships can be declared from either end (a group lists its
//! `subgroups`, a subgroup lists its `parents`), so the store merges both
//! directions into one link set per group:
//!
//! | Link | Declared on the group | Declared on the other end |
//! |------|----------------------|---------------------------|
//! | parents | `parents` | parent's `subgroups` |
//! | subgroups | `subgroups` | child's `parents` |
//! | pages | `pages` | page's group membership |
//! | series | `series` | series' `groups` |
//!
//! A series' reading order is its declared `pages`, followed by pages that
//! name the series as their membership without being listed (slug order).
//!
//! ## Diagnostics
//!
//! Slugs pointing at nothing and parent cycles are recorded as
//! [`Diagnostic`]s and logged as warnings. Neither stops the build: dangling
//! links resolve as absent, and traversals carry a visited set.
//!
//! Queries go through [`ContentGraph::view`], which applies draft visibility.

use crate::types::{Entity, EntityKind, EntityRef, Group, Node, Page, Reference, Series, Slug};
use crate::view::GraphView;
use crate::visibility::Visibility;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Two entities of the same kind claim the same slug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate {kind} slug '{slug}': defined in {first} and {second}")]
pub struct DuplicateSlug {
    pub kind: EntityKind,
    pub slug: Slug,
    pub first: String,
    pub second: String,
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("{}", describe_duplicates(.0))]
    DuplicateSlugs(Vec<DuplicateSlug>),
}

fn describe_duplicates(duplicates: &[DuplicateSlug]) -> String {
    duplicates
        .iter()
        .map(DuplicateSlug::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A chain of parent links that returns to where it started.
///
/// `path` begins and ends with the same slug: `["a", "b", "a"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("parent cycle: {}", .path.join(" -> "))]
pub struct CycleDetected {
    pub path: Vec<Slug>,
}

/// A non-fatal problem found while assembling the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    DanglingReference {
        kind: EntityKind,
        slug: Slug,
        field: &'static str,
        target: String,
    },
    CycleDetected(CycleDetected),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DanglingReference {
                kind,
                slug,
                field,
                target,
            } => write!(f, "{kind} '{slug}' {field}: '{target}' does not exist"),
            Diagnostic::CycleDetected(cycle) => cycle.fmt(f),
        }
    }
}

/// Collects entities, then commits them into a [`ContentGraph`] in one step.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    pages: BTreeMap<Slug, Page>,
    groups: BTreeMap<Slug, Group>,
    series: BTreeMap<Slug, Series>,
    locations: HashMap<(EntityKind, Slug), String>,
    duplicates: Vec<DuplicateSlug>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity. A second entity with an already-used slug of the same
    /// kind is recorded as a duplicate and otherwise ignored.
    pub fn insert(&mut self, entity: Entity, location: impl Into<String>) {
        let key = (entity.kind(), entity.slug().to_string());
        let location = location.into();
        if let Some(first) = self.locations.get(&key) {
            self.duplicates.push(DuplicateSlug {
                kind: key.0,
                slug: key.1,
                first: first.clone(),
                second: location,
            });
            return;
        }
        self.locations.insert(key, location);
        match entity {
            Entity::Page(p) => {
                self.pages.insert(p.slug.clone(), p);
            }
            Entity::Group(g) => {
                self.groups.insert(g.slug.clone(), g);
            }
            Entity::Series(s) => {
                self.series.insert(s.slug.clone(), s);
            }
        }
    }

    /// Build the graph, or fail with every duplicate slug found.
    pub fn finish(self) -> Result<ContentGraph, GraphError> {
        if !self.duplicates.is_empty() {
            return Err(GraphError::DuplicateSlugs(self.duplicates));
        }
        Ok(ContentGraph::assemble(
            self.pages,
            self.groups,
            self.series,
            self.locations,
        ))
    }
}

/// Merged links of one group, by slug.
#[derive(Debug, Default, Clone)]
pub(crate) struct GroupLinks {
    pub parents: BTreeSet<Slug>,
    pub subgroups: BTreeSet<Slug>,
    pub pages: BTreeSet<Slug>,
    pub series: BTreeSet<Slug>,
}

/// Which way a group traversal follows links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Up,
    Down,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Mark {
    Temp,
    Perm,
}

/// Groups reached by a traversal, nearest first, plus any cycle met on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk<'g> {
    pub groups: Vec<&'g Group>,
    pub cycle: Option<CycleDetected>,
}

/// Immutable, validated content with derived adjacency.
#[derive(Debug)]
pub struct ContentGraph {
    pages: BTreeMap<Slug, Page>,
    groups: BTreeMap<Slug, Group>,
    series: BTreeMap<Slug, Series>,
    locations: HashMap<(EntityKind, Slug), String>,
    links: BTreeMap<Slug, GroupLinks>,
    reading_order: BTreeMap<Slug, Vec<Slug>>,
    diagnostics: Vec<Diagnostic>,
}

impl ContentGraph {
    /// Build a graph from `(entity, location)` pairs.
    pub fn build<I>(entities: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (Entity, String)>,
    {
        let mut builder = GraphBuilder::new();
        for (entity, location) in entities {
            builder.insert(entity, location);
        }
        builder.finish()
    }

    fn assemble(
        pages: BTreeMap<Slug, Page>,
        groups: BTreeMap<Slug, Group>,
        series: BTreeMap<Slug, Series>,
        locations: HashMap<(EntityKind, Slug), String>,
    ) -> Self {
        let mut graph = ContentGraph {
            pages,
            groups,
            series,
            locations,
            links: BTreeMap::new(),
            reading_order: BTreeMap::new(),
            diagnostics: Vec::new(),
        };
        graph.derive_links();
        graph.derive_reading_order();
        graph.detect_cycles();

        for diagnostic in &graph.diagnostics {
            warn!("{diagnostic}");
        }
        debug!(
            pages = graph.pages.len(),
            groups = graph.groups.len(),
            series = graph.series.len(),
            diagnostics = graph.diagnostics.len(),
            "content graph assembled"
        );
        graph
    }

    fn derive_links(&mut self) {
        let mut links: BTreeMap<Slug, GroupLinks> = self
            .groups
            .values()
            .map(|g| {
                let declared = GroupLinks {
                    parents: g.parents.clone(),
                    subgroups: g.subgroups.clone(),
                    pages: g.pages.clone(),
                    series: g.series.clone(),
                };
                (g.slug.clone(), declared)
            })
            .collect();
        let mut dangling = Vec::new();

        let mut check = |exists: bool, kind, slug: &str, field, target: &str| {
            if !exists {
                dangling.push(Diagnostic::DanglingReference {
                    kind,
                    slug: slug.to_string(),
                    field,
                    target: target.to_string(),
                });
            }
            exists
        };

        for group in self.groups.values() {
            for parent in &group.parents {
                let exists = self.groups.contains_key(parent);
                if check(exists, EntityKind::Group, &group.slug, "parents", parent)
                    && let Some(l) = links.get_mut(parent)
                {
                    l.subgroups.insert(group.slug.clone());
                }
            }
            for child in &group.subgroups {
                let exists = self.groups.contains_key(child);
                if check(exists, EntityKind::Group, &group.slug, "subgroups", child)
                    && let Some(l) = links.get_mut(child)
                {
                    l.parents.insert(group.slug.clone());
                }
            }
            for page in &group.pages {
                let exists = self.pages.contains_key(page);
                check(exists, EntityKind::Group, &group.slug, "pages", page);
            }
            for series in &group.series {
                let exists = self.series.contains_key(series);
                check(exists, EntityKind::Group, &group.slug, "series", series);
            }
        }

        for page in self.pages.values() {
            for group in page.membership.groups() {
                let exists = self.groups.contains_key(group);
                if check(exists, EntityKind::Page, &page.slug, "membership.groups", group)
                    && let Some(l) = links.get_mut(group)
                {
                    l.pages.insert(page.slug.clone());
                }
            }
            if let Some(series) = page.membership.series() {
                let exists = self.series.contains_key(series);
                check(exists, EntityKind::Page, &page.slug, "membership.series", series);
            }
            for raw in &page.references {
                let resolved = self.resolve_reference(raw).is_some();
                check(resolved, EntityKind::Page, &page.slug, "references", raw);
            }
        }

        for series in self.series.values() {
            for page in &series.pages {
                let exists = self.pages.contains_key(page);
                check(exists, EntityKind::Series, &series.slug, "pages", page);
            }
            for group in &series.groups {
                let exists = self.groups.contains_key(group);
                if check(exists, EntityKind::Series, &series.slug, "groups", group)
                    && let Some(l) = links.get_mut(group)
                {
                    l.series.insert(series.slug.clone());
                }
            }
        }

        self.links = links;
        self.diagnostics.extend(dangling);
    }

    fn derive_reading_order(&mut self) {
        let mut order: BTreeMap<Slug, Vec<Slug>> = self
            .series
            .values()
            .map(|s| (s.slug.clone(), s.pages.clone()))
            .collect();
        for page in self.pages.values() {
            if let Some(series) = page.membership.series()
                && let Some(list) = order.get_mut(series)
                && !list.contains(&page.slug)
            {
                list.push(page.slug.clone());
            }
        }
        self.reading_order = order;
    }

    fn detect_cycles(&mut self) {
        let mut marks = HashMap::new();
        let mut found = Vec::new();
        for slug in self.groups.keys() {
            if !marks.contains_key(slug.as_str()) {
                let mut stack = Vec::new();
                self.cycle_dfs(slug, Direction::Up, &|_| true, &mut marks, &mut stack, &mut found);
            }
        }
        self.diagnostics
            .extend(found.into_iter().map(Diagnostic::CycleDetected));
    }

    /// Depth-first search over group links, recording every back edge as a cycle.
    fn cycle_dfs<'a>(
        &'a self,
        node: &'a str,
        direction: Direction,
        admit: &dyn Fn(&Group) -> bool,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
        found: &mut Vec<CycleDetected>,
    ) {
        marks.insert(node, Mark::Temp);
        stack.push(node);
        for next in self.linked_groups(node, direction, admit) {
            let next = next.slug.as_str();
            match marks.get(next) {
                Some(Mark::Temp) => {
                    let start = stack.iter().position(|s| *s == next).unwrap_or(0);
                    let mut path: Vec<Slug> =
                        stack[start..].iter().map(|s| s.to_string()).collect();
                    path.push(next.to_string());
                    found.push(CycleDetected { path });
                }
                Some(Mark::Perm) => {}
                None => self.cycle_dfs(next, direction, admit, marks, stack, found),
            }
        }
        stack.pop();
        marks.insert(node, Mark::Perm);
    }

    /// Existing, admitted groups one link away from `slug`.
    fn linked_groups<'a>(
        &'a self,
        slug: &str,
        direction: Direction,
        admit: &dyn Fn(&Group) -> bool,
    ) -> Vec<&'a Group> {
        let Some(links) = self.links.get(slug) else {
            return Vec::new();
        };
        let slugs = match direction {
            Direction::Up => &links.parents,
            Direction::Down => &links.subgroups,
        };
        slugs
            .iter()
            .filter_map(|s| self.groups.get(s))
            .filter(|g| admit(g))
            .collect()
    }

    /// Breadth-first walk from `start` (excluded), nearest first, each group
    /// once. Also reports the first cycle reachable from `start`.
    pub(crate) fn walk(
        &self,
        start: &str,
        direction: Direction,
        admit: &dyn Fn(&Group) -> bool,
    ) -> Walk<'_> {
        let mut visited: BTreeSet<&str> = BTreeSet::from([start]);
        let mut frontier = vec![start];
        let mut groups = Vec::new();
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for slug in frontier {
                for group in self.linked_groups(slug, direction, admit) {
                    if visited.insert(group.slug.as_str()) {
                        groups.push(group);
                        next.push(group.slug.as_str());
                    }
                }
            }
            frontier = next;
        }

        let mut found = Vec::new();
        if let Some((key, _)) = self.groups.get_key_value(start) {
            self.cycle_dfs(key, direction, admit, &mut HashMap::new(), &mut Vec::new(), &mut found);
        }
        Walk {
            groups,
            cycle: found.into_iter().next(),
        }
    }

    /// Resolve a reference string to an entity, ignoring visibility.
    pub(crate) fn resolve_reference(&self, raw: &str) -> Option<EntityRef<'_>> {
        let reference = Reference::parse(raw).ok()?;
        match reference.kind {
            Some(kind) => self.get(kind, reference.slug),
            None => EntityKind::ALL
                .iter()
                .find_map(|&kind| self.get(kind, reference.slug)),
        }
    }

    pub(crate) fn get(&self, kind: EntityKind, slug: &str) -> Option<EntityRef<'_>> {
        match kind {
            EntityKind::Page => self.pages.get(slug).map(EntityRef::Page),
            EntityKind::Group => self.groups.get(slug).map(EntityRef::Group),
            EntityKind::Series => self.series.get(slug).map(EntityRef::Series),
        }
    }

    pub(crate) fn page(&self, slug: &str) -> Option<&Page> {
        self.pages.get(slug)
    }

    pub(crate) fn group(&self, slug: &str) -> Option<&Group> {
        self.groups.get(slug)
    }

    pub(crate) fn series(&self, slug: &str) -> Option<&Series> {
        self.series.get(slug)
    }

    pub(crate) fn all(&self, kind: EntityKind) -> Vec<EntityRef<'_>> {
        match kind {
            EntityKind::Page => self.pages.values().map(EntityRef::Page).collect(),
            EntityKind::Group => self.groups.values().map(EntityRef::Group).collect(),
            EntityKind::Series => self.series.values().map(EntityRef::Series).collect(),
        }
    }

    pub(crate) fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub(crate) fn links(&self, group: &str) -> Option<&GroupLinks> {
        self.links.get(group)
    }

    pub(crate) fn reading_order(&self, series: &str) -> Option<&[Slug]> {
        self.reading_order.get(series).map(Vec::as_slice)
    }

    /// Query the graph under a visibility mode.
    pub fn view(&self, visibility: Visibility) -> GraphView<'_> {
        GraphView::new(self, visibility)
    }

    /// Dangling references and cycles found while assembling.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Where an entity was loaded from.
    pub fn location(&self, kind: EntityKind, slug: &str) -> Option<&str> {
        self.locations
            .get(&(kind, slug.to_string()))
            .map(String::as_str)
    }

    /// Number of entities of `kind`, drafts included.
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Page => self.pages.len(),
            EntityKind::Group => self.groups.len(),
            EntityKind::Series => self.series.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len() + self.groups.len() + self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
