//! Visibility-filtered queries over a [`ContentGraph`].
//!
//! A [`GraphView`] is the graph bound to one [`Visibility`]. Every query
//! returns only entities the visibility admits, so in a production view a
//! draft is indistinguishable from a missing slug:
//!
//! - lookups of a draft return `None`;
//! - draft children, series pages and membership targets are omitted;
//! - ancestor and descendant walks stop at a draft group instead of
//!   passing through it;
//! - a reference to a draft resolves as [`Resolved::Unresolved`].
//!
//! Links to slugs that don't exist are dropped the same way, which is what
//! makes dangling references non-fatal.

use crate::store::{ContentGraph, CycleDetected, Direction};
use crate::types::{EntityKind, EntityRef, Group, Node, Page, Series};
use crate::visibility::Visibility;

#[derive(Debug, Clone, Copy)]
pub struct GraphView<'g> {
    graph: &'g ContentGraph,
    visibility: Visibility,
}

/// Direct children of a group, each list sorted by slug.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Children<'g> {
    pub subgroups: Vec<&'g Group>,
    pub pages: Vec<&'g Page>,
    pub series: Vec<&'g Series>,
}

impl Children<'_> {
    pub fn is_empty(&self) -> bool {
        self.subgroups.is_empty() && self.pages.is_empty() && self.series.is_empty()
    }
}

/// Groups reached by following links from a starting group.
///
/// `groups` is nearest-first. When the links loop, `cycle` holds the loop
/// and `groups` is the chain up to the point where it would repeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineage<'g> {
    pub groups: Vec<&'g Group>,
    pub cycle: Option<CycleDetected>,
}

impl Lineage<'_> {
    pub fn slugs(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.slug.as_str()).collect()
    }
}

/// Where a page belongs, resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipTargets<'g> {
    Groups(Vec<&'g Group>),
    Series(Option<&'g Series>),
}

/// One entry of a page's `references`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<'g> {
    Found(EntityRef<'g>),
    /// The target doesn't exist or isn't visible.
    Unresolved(&'g str),
}

impl<'g> Resolved<'g> {
    pub fn entity(self) -> Option<EntityRef<'g>> {
        match self {
            Resolved::Found(entity) => Some(entity),
            Resolved::Unresolved(_) => None,
        }
    }
}

impl<'g> GraphView<'g> {
    pub(crate) fn new(graph: &'g ContentGraph, visibility: Visibility) -> Self {
        Self { graph, visibility }
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn graph(&self) -> &'g ContentGraph {
        self.graph
    }

    fn admit<T: Node>(&self, entity: Option<T>) -> Option<T> {
        entity.filter(|e| self.visibility.admits(e))
    }

    /// Look up an entity by kind and slug.
    pub fn by_slug(&self, kind: EntityKind, slug: &str) -> Option<EntityRef<'g>> {
        self.admit(self.graph.get(kind, slug))
    }

    pub fn page(&self, slug: &str) -> Option<&'g Page> {
        self.admit(self.graph.page(slug))
    }

    pub fn group(&self, slug: &str) -> Option<&'g Group> {
        self.admit(self.graph.group(slug))
    }

    pub fn series(&self, slug: &str) -> Option<&'g Series> {
        self.admit(self.graph.series(slug))
    }

    /// Every visible entity of `kind`, sorted by slug.
    pub fn list(&self, kind: EntityKind) -> Vec<EntityRef<'g>> {
        self.visibility.filter(self.graph.all(kind))
    }

    /// Direct subgroups, pages and series of a visible group.
    pub fn children(&self, group: &str) -> Option<Children<'g>> {
        self.group(group)?;
        let Some(links) = self.graph.links(group) else {
            return Some(Children::default());
        };
        Some(Children {
            subgroups: links.subgroups.iter().filter_map(|s| self.group(s)).collect(),
            pages: links.pages.iter().filter_map(|s| self.page(s)).collect(),
            series: links.series.iter().filter_map(|s| self.series(s)).collect(),
        })
    }

    /// Parent groups, nearest first, breadth-first over multiple parents.
    ///
    /// Returns `None` when `group` is missing or hidden.
    pub fn ancestors(&self, group: &str) -> Option<Lineage<'g>> {
        self.lineage(group, Direction::Up)
    }

    /// Every group reachable through subgroup links, nearest first.
    pub fn descendants(&self, group: &str) -> Option<Lineage<'g>> {
        self.lineage(group, Direction::Down)
    }

    fn lineage(&self, group: &str, direction: Direction) -> Option<Lineage<'g>> {
        self.group(group)?;
        let visibility = self.visibility;
        let walk = self
            .graph
            .walk(group, direction, &|g: &Group| visibility.admits(g));
        Some(Lineage {
            groups: walk.groups,
            cycle: walk.cycle,
        })
    }

    /// Visible pages of a series in reading order.
    pub fn series_pages(&self, series: &str) -> Option<Vec<&'g Page>> {
        self.series(series)?;
        let order = self.graph.reading_order(series).unwrap_or_default();
        Some(order.iter().filter_map(|s| self.page(s)).collect())
    }

    /// The visible groups or series a page belongs to.
    pub fn membership(&self, page: &str) -> Option<MembershipTargets<'g>> {
        let page = self.page(page)?;
        Some(match page.membership.series() {
            Some(series) => MembershipTargets::Series(self.series(series)),
            None => MembershipTargets::Groups(
                page.membership
                    .groups()
                    .filter_map(|g| self.group(g))
                    .collect(),
            ),
        })
    }

    /// A page's references, in slug order, each resolved or unresolved.
    pub fn references(&self, page: &str) -> Option<Vec<Resolved<'g>>> {
        let page = self.page(page)?;
        Some(
            page.references
                .iter()
                .map(|raw| match self.admit(self.graph.resolve_reference(raw)) {
                    Some(entity) => Resolved::Found(entity),
                    None => Resolved::Unresolved(raw.as_str()),
                })
                .collect(),
        )
    }

    /// Visible groups with no visible parent.
    pub fn roots(&self) -> Vec<&'g Group> {
        self.graph
            .groups()
            .filter(|g| self.visibility.admits(*g))
            .filter(|g| {
                self.graph
                    .links(&g.slug)
                    .is_none_or(|l| l.parents.iter().all(|p| self.group(p).is_none()))
            })
            .collect()
    }
}
