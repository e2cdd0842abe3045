//! Entity types shared by the validator, the graph store and the manifest.
//!
//! Every entity serializes back into the record shape that
//! [`schema::validate`](crate::schema::validate) accepts: writing a validated
//! entity out as JSON and validating it again yields the same entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// URL-safe identifier, unique within its [`EntityKind`].
pub type Slug = String;

/// Group color applied when a record doesn't set one.
pub const DEFAULT_GROUP_COLOR: &str = "#3B82F6";

/// The three content collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Page,
    Group,
    Series,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Page, EntityKind::Group, EntityKind::Series];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Page => "page",
            EntityKind::Group => "group",
            EntityKind::Series => "series",
        }
    }

    /// Default collection directory name (`pages`, `groups`, `series`).
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Page => "pages",
            EntityKind::Group => "groups",
            EntityKind::Series => "series",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity kind '{0}' (expected page, group or series)")]
pub struct UnknownKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownKind;

    /// Accepts singular and plural spellings, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "page" | "pages" => Ok(EntityKind::Page),
            "group" | "groups" => Ok(EntityKind::Group),
            "series" => Ok(EntityKind::Series),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// Where a page lives: a set of groups, or exactly one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Membership {
    Groups { groups: BTreeSet<Slug> },
    Series { series: Slug },
}

impl Membership {
    /// Group slugs of a `Groups` membership; empty for a series page.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        let groups = match self {
            Membership::Groups { groups } => Some(groups),
            Membership::Series { .. } => None,
        };
        groups.into_iter().flatten().map(String::as_str)
    }

    pub fn series(&self) -> Option<&str> {
        match self {
            Membership::Groups { .. } => None,
            Membership::Series { series } => Some(series),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub slug: Slug,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub draft: bool,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    pub membership: Membership,
    /// Raw reference strings, optionally kind-qualified (`group:rust`).
    #[serde(default)]
    pub references: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub slug: Slug,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub parents: BTreeSet<Slug>,
    #[serde(default)]
    pub subgroups: BTreeSet<Slug>,
    #[serde(default)]
    pub series: BTreeSet<Slug>,
    #[serde(default)]
    pub pages: BTreeSet<Slug>,
    pub color: String,
    #[serde(default)]
    pub draft: bool,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub slug: Slug,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Reading order. Never re-sorted.
    #[serde(default)]
    pub pages: Vec<Slug>,
    #[serde(default)]
    pub groups: BTreeSet<Slug>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub draft: bool,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

/// A validated entity of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Entity {
    Page(Page),
    Group(Group),
    Series(Series),
}

/// Borrowed view of an entity held by the graph store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EntityRef<'a> {
    Page(&'a Page),
    Group(&'a Group),
    Series(&'a Series),
}

/// Accessors common to every entity kind.
pub trait Node {
    fn kind(&self) -> EntityKind;
    fn slug(&self) -> &str;
    fn title(&self) -> &str;
    fn is_draft(&self) -> bool;
    fn created(&self) -> DateTime<Utc>;
    fn updated(&self) -> Option<DateTime<Utc>>;
}

macro_rules! impl_node {
    ($ty:ty, $kind:expr) => {
        impl Node for $ty {
            fn kind(&self) -> EntityKind {
                $kind
            }
            fn slug(&self) -> &str {
                &self.slug
            }
            fn title(&self) -> &str {
                &self.title
            }
            fn is_draft(&self) -> bool {
                self.draft
            }
            fn created(&self) -> DateTime<Utc> {
                self.created
            }
            fn updated(&self) -> Option<DateTime<Utc>> {
                self.updated
            }
        }
    };
}

impl_node!(Page, EntityKind::Page);
impl_node!(Group, EntityKind::Group);
impl_node!(Series, EntityKind::Series);

impl<'a> EntityRef<'a> {
    fn node(&self) -> &'a dyn Node {
        match *self {
            EntityRef::Page(p) => p,
            EntityRef::Group(g) => g,
            EntityRef::Series(s) => s,
        }
    }
}

impl Node for EntityRef<'_> {
    fn kind(&self) -> EntityKind {
        self.node().kind()
    }
    fn slug(&self) -> &str {
        self.node().slug()
    }
    fn title(&self) -> &str {
        self.node().title()
    }
    fn is_draft(&self) -> bool {
        self.node().is_draft()
    }
    fn created(&self) -> DateTime<Utc> {
        self.node().created()
    }
    fn updated(&self) -> Option<DateTime<Utc>> {
        self.node().updated()
    }
}

impl Entity {
    pub fn as_ref(&self) -> EntityRef<'_> {
        match self {
            Entity::Page(p) => EntityRef::Page(p),
            Entity::Group(g) => EntityRef::Group(g),
            Entity::Series(s) => EntityRef::Series(s),
        }
    }
}

impl Node for Entity {
    fn kind(&self) -> EntityKind {
        self.as_ref().kind()
    }
    fn slug(&self) -> &str {
        match self {
            Entity::Page(p) => &p.slug,
            Entity::Group(g) => &g.slug,
            Entity::Series(s) => &s.slug,
        }
    }
    fn title(&self) -> &str {
        match self {
            Entity::Page(p) => &p.title,
            Entity::Group(g) => &g.title,
            Entity::Series(s) => &s.title,
        }
    }
    fn is_draft(&self) -> bool {
        self.as_ref().is_draft()
    }
    fn created(&self) -> DateTime<Utc> {
        self.as_ref().created()
    }
    fn updated(&self) -> Option<DateTime<Utc>> {
        self.as_ref().updated()
    }
}

impl<T: Node + ?Sized> Node for &T {
    fn kind(&self) -> EntityKind {
        (**self).kind()
    }
    fn slug(&self) -> &str {
        (**self).slug()
    }
    fn title(&self) -> &str {
        (**self).title()
    }
    fn is_draft(&self) -> bool {
        (**self).is_draft()
    }
    fn created(&self) -> DateTime<Utc> {
        (**self).created()
    }
    fn updated(&self) -> Option<DateTime<Utc>> {
        (**self).updated()
    }
}

/// A parsed entry of a page's `references` set.
///
/// `group:rust` pins the kind; a bare `rust` is looked up as a page, then a
/// group, then a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
    pub kind: Option<EntityKind>,
    pub slug: &'a str,
}

impl<'a> Reference<'a> {
    pub fn parse(raw: &'a str) -> Result<Self, UnknownKind> {
        match raw.split_once(':') {
            Some((kind, slug)) => Ok(Reference {
                kind: Some(kind.parse()?),
                slug,
            }),
            None => Ok(Reference {
                kind: None,
                slug: raw,
            }),
        }
    }
}
