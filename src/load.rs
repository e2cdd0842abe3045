//! Loading a content tree into a [`ContentGraph`].
//!
//! ```text
//! <project root>/
//! ├── config.toml
//! └── <content_root>/
//!     ├── pages/            # one file per page
//!     │   ├── intro.md
//!     │   └── rust/
//!     │       └── index.md  # slug "rust"
//!     ├── groups/
//!     │   └── rust.yaml
//!     └── series/
//!         └── tour.toml
//! ```
//!
//! Loading runs in three passes:
//!
//! 1. **Collect**: walk each collection directory (sorted, hidden entries
//!    skipped) and turn every content file into a [`RawRecord`]. A file whose
//!    front matter can't be parsed becomes a [`SourceFailure`].
//! 2. **Validate**: records are validated in parallel on the rayon pool.
//! 3. **Commit**: valid entities go through one [`GraphBuilder`]; duplicate
//!    slugs fail the whole load.
//!
//! Per-record problems (unparseable files, invalid records) don't stop the
//! load. They're returned in [`Loaded`] next to the graph so the caller
//! can report all of them at once.

use crate::config::SiteConfig;
use crate::frontmatter::{self, Format, FrontMatterError};
use crate::naming;
use crate::schema::{self, RawRecord, SchemaOptions, ValidationError};
use crate::store::{ContentGraph, GraphBuilder, GraphError};
use crate::types::{Entity, EntityKind};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Content root not found: {0}")]
    MissingRoot(PathBuf),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Why a file couldn't be turned into a record.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot derive a slug from the file name")]
    NoSlug,
    #[error("'slug' must be a string")]
    SlugNotString,
}

#[derive(Error, Debug)]
#[error("{location}: {error}")]
pub struct SourceFailure {
    pub location: String,
    pub error: SourceError,
}

/// The result of a load: the graph plus everything that was left out of it.
#[derive(Debug)]
pub struct Loaded {
    pub graph: ContentGraph,
    pub rejected: Vec<ValidationError>,
    pub unreadable: Vec<SourceFailure>,
}

impl Loaded {
    /// No record was dropped.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.unreadable.is_empty()
    }
}

/// Load the content tree under `project_root` as configured.
pub fn load(project_root: &Path, config: &SiteConfig) -> Result<Loaded, LoadError> {
    let content_root = project_root.join(&config.content_root);
    if !content_root.is_dir() {
        return Err(LoadError::MissingRoot(content_root));
    }

    let mut records = Vec::new();
    let mut unreadable = Vec::new();
    for kind in EntityKind::ALL {
        let dir = content_root.join(config.collections.dir(kind));
        let (found, failed) = collect_records(&content_root, &dir, kind)?;
        debug!(kind = %kind, records = found.len(), failed = failed.len(), "collected");
        records.extend(found);
        unreadable.extend(failed);
    }

    let mut loaded = load_records(records, &SchemaOptions::from(&config.schema))?;
    loaded.unreadable.extend(unreadable);
    Ok(loaded)
}

/// Validate records and commit the valid ones to a graph.
pub fn load_records(
    records: Vec<RawRecord>,
    options: &SchemaOptions,
) -> Result<Loaded, LoadError> {
    let (entities, rejected) = validate_records(records, options);

    let mut builder = GraphBuilder::new();
    for (entity, location) in entities {
        builder.insert(entity, location);
    }
    Ok(Loaded {
        graph: builder.finish()?,
        rejected,
        unreadable: Vec::new(),
    })
}

/// Validate every record on the rayon pool. Output order follows input order.
pub fn validate_records(
    records: Vec<RawRecord>,
    options: &SchemaOptions,
) -> (Vec<(Entity, String)>, Vec<ValidationError>) {
    let results: Vec<_> = records
        .into_par_iter()
        .map(|record| schema::validate(&record, options).map(|entity| (entity, record.location)))
        .collect();

    let mut valid = Vec::new();
    let mut rejected = Vec::new();
    for result in results {
        match result {
            Ok(pair) => valid.push(pair),
            Err(e) => rejected.push(e),
        }
    }
    (valid, rejected)
}

/// Read every content file of one collection.
///
/// A missing collection directory is an empty collection. Locations are
/// relative to `content_root` with `/` separators.
pub fn collect_records(
    content_root: &Path,
    dir: &Path,
    kind: EntityKind,
) -> Result<(Vec<RawRecord>, Vec<SourceFailure>), LoadError> {
    let mut records = Vec::new();
    let mut failures = Vec::new();
    if !dir.is_dir() {
        return Ok((records, failures));
    }

    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_string_lossy().as_ref()));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(format) = Format::from_path(path) else {
            continue;
        };
        let location = relative_location(content_root, path);
        let relative = path.strip_prefix(dir).unwrap_or(path);

        match read_record(path, relative, format, kind, &location) {
            Ok(record) => records.push(record),
            Err(error) => failures.push(SourceFailure { location, error }),
        }
    }
    Ok((records, failures))
}

fn read_record(
    path: &Path,
    relative: &Path,
    format: Format,
    kind: EntityKind,
    location: &str,
) -> Result<RawRecord, SourceError> {
    let content = fs::read_to_string(path)?;
    let document = frontmatter::parse(&content, format)?;
    let slug = match document.data.get("slug") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(_) => return Err(SourceError::SlugNotString),
        None => naming::slug_from_path(relative).ok_or(SourceError::NoSlug)?,
    };
    Ok(RawRecord::new(kind, slug, location, document.data))
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

fn relative_location(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
