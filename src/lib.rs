//! # Content Graph
//!
//! The data layer of a blog / knowledge base: markdown pages grouped into
//! **groups** and **series**, validated against typed schemas,
//! cross-referenced by slug, and filtered for drafts before a static site
//! generator ever sees them.
//!
//! # Architecture: Load, Commit, Query
//!
//! ```text
//! 1. Load      content/  →  raw records      (front matter → serde_json::Value)
//! 2. Validate  records   →  entities         (parallel, per-field errors)
//! 3. Commit    entities  →  ContentGraph     (one builder, derived adjacency)
//! 4. Query     graph     →  GraphView        (draft filter on every path)
//! ```
//!
//! The graph is immutable once built. All reads go through a
//! [`view::GraphView`] bound to a [`visibility::Visibility`], so whether a
//! draft can be seen is decided in one place.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Entity kinds, `Page` / `Group` / `Series`, the `Membership` union, typed references |
//! | [`naming`] | Slug syntax and slug derivation from file paths |
//! | [`frontmatter`] | YAML / TOML front matter and whole-file data records |
//! | [`schema`] | Validates raw records into entities, collecting every field error |
//! | [`store`] | `GraphBuilder` and the immutable `ContentGraph`: duplicates, adjacency, cycles |
//! | [`visibility`] | `BuildMode` and the two-mode draft filter |
//! | [`view`] | Visibility-filtered queries: lookup, children, ancestors, series order, references |
//! | [`load`] | Walks the content tree, validates in parallel, commits to the store |
//! | [`manifest`] | JSON snapshot of a view for the site generator |
//! | [`config`] | `config.toml` loading, validation, and the stock config |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Membership Is a Sum Type
//!
//! A page belongs to groups **or** to one series, never both and never
//! neither. [`types::Membership`] makes that unrepresentable rather than
//! checked: the validator is the only place that sees the raw fields, and it
//! rejects records that set both or neither.
//!
//! ## Dangling Links Are Warnings
//!
//! Content is edited by hand, and a reference to a note that hasn't been
//! written yet is normal. Slugs that point nowhere are reported as
//! [`store::Diagnostic`]s and resolve as absent; only duplicate slugs fail a
//! build, because there is no right answer for which duplicate wins.
//!
//! ## Mode Is a Parameter
//!
//! The library never reads the environment to decide whether drafts are
//! shown. The CLI turns `--mode` / `config.toml` into a
//! [`visibility::Visibility`] and hands it to [`store::ContentGraph::view`].
//!
//! ## Cycles Don't Hang
//!
//! Parent links are authored from both ends and can loop. Every traversal
//! carries a visited set, and a loop is returned next to the truncated chain
//! as a [`store::CycleDetected`] instead of aborting the query.

pub mod config;
pub mod frontmatter;
pub mod load;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod schema;
pub mod store;
pub mod types;
pub mod view;
pub mod visibility;

#[cfg(test)]
pub(crate) mod test_helpers;
