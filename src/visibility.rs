//! Draft visibility.
//!
//! Whether drafts are shown is a pure function of an explicit [`Visibility`]
//! value: development builds show everything, production builds drop every
//! entity whose `draft` flag is set. Nothing here reads process-wide state;
//! the caller decides the [`BuildMode`] and threads it in.
//!
//! The filter is applied by [`GraphView`](crate::view::GraphView), the only
//! query surface of the graph store, so a draft can't reach a production
//! build through a side door such as a group's child list.

use crate::types::Node;
use serde::{Deserialize, Serialize};

/// Which kind of build is running.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Local preview: drafts are shown.
    Development,
    /// Published site: drafts are hidden.
    #[default]
    Production,
}

/// The two-mode draft filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    show_drafts: bool,
}

impl Visibility {
    /// Shows drafts.
    pub const ALL: Visibility = Visibility { show_drafts: true };
    /// Hides drafts.
    pub const PUBLISHED: Visibility = Visibility { show_drafts: false };

    pub const fn new(show_drafts: bool) -> Self {
        Self { show_drafts }
    }

    pub const fn for_mode(mode: BuildMode) -> Self {
        match mode {
            BuildMode::Development => Self::ALL,
            BuildMode::Production => Self::PUBLISHED,
        }
    }

    pub const fn shows_drafts(self) -> bool {
        self.show_drafts
    }

    /// Whether a single entity passes the filter.
    pub fn admits<T: Node + ?Sized>(self, entity: &T) -> bool {
        self.show_drafts || !entity.is_draft()
    }

    /// Whether an optional entity exists and passes the filter.
    pub fn is_visible<T: Node>(self, entity: Option<&T>) -> bool {
        entity.is_some_and(|e| self.admits(e))
    }

    /// Keep the entities that pass the filter, in their original order.
    pub fn filter<I>(self, entities: I) -> Vec<I::Item>
    where
        I: IntoIterator,
        I::Item: Node,
    {
        entities.into_iter().filter(|e| self.admits(e)).collect()
    }
}

impl From<BuildMode> for Visibility {
    fn from(mode: BuildMode) -> Self {
        Visibility::for_mode(mode)
    }
}
