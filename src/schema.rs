//! Schema validation for raw content records.
//!
//! A [`RawRecord`] is an untyped map of fields tagged with its kind, slug and
//! location. [`validate`] turns it into a typed [`Entity`] or a
//! [`ValidationError`] listing *every* problem found, each tied to the field
//! that caused it, so an author sees all mistakes in one pass.
//!
//! ## Field rules
//!
//! | Kind | Required | Defaults |
//! |------|----------|----------|
//! | page | `title`, `created`, membership | `tags`=∅, `references`=∅, `draft`=false |
//! | group | `title`, `description`, `created` | sets=∅, `color`=configured, `draft`=false |
//! | series | `title`, `created` | `pages`=[], `groups`=∅, `draft`=false |
//!
//! Page membership is either the canonical object
//!
//! ```yaml
//! membership:
//!   kind: groups
//!   groups: [rust, systems]
//! ```
//!
//! or the shorthand `groups: [...]` / `series: tour` at the top level. Both
//! spellings at once, both targets at once, or neither, are rejected.
//!
//! ## Older schema revisions
//!
//! A group's single `parent` string is read as `parents: [parent]`, and a
//! `date` field is read as `created`. Using both spellings of the same field
//! is an error.
//!
//! Validation is pure: it never touches the graph store or the filesystem.

use crate::config::SchemaConfig;
use crate::naming::is_valid_slug;
use crate::types::{
    DEFAULT_GROUP_COLOR, Entity, EntityKind, Group, Membership, Page, Reference, Series, Slug,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// An unvalidated record as read from a content file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub kind: EntityKind,
    pub slug: Slug,
    /// Where the record came from, for error reports (usually a relative path).
    pub location: String,
    pub data: Value,
}

impl RawRecord {
    pub fn new(
        kind: EntityKind,
        slug: impl Into<Slug>,
        location: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            kind,
            slug: slug.into(),
            location: location.into(),
            data,
        }
    }
}

/// Knobs that change what the validator accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaOptions {
    /// Color given to groups that don't declare one.
    pub default_color: String,
    /// Reject fields the schema doesn't know instead of ignoring them.
    pub deny_unknown_fields: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            default_color: DEFAULT_GROUP_COLOR.to_string(),
            deny_unknown_fields: false,
        }
    }
}

impl From<&SchemaConfig> for SchemaOptions {
    fn from(config: &SchemaConfig) -> Self {
        Self {
            default_color: config.default_color.clone(),
            deny_unknown_fields: config.deny_unknown_fields,
        }
    }
}

/// What is wrong with a single field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Problem {
    #[error("required field is missing")]
    Missing,
    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("'{0}' is not a valid timestamp (expected YYYY-MM-DD or RFC 3339)")]
    InvalidTimestamp(String),
    #[error("'{0}' is not a valid slug")]
    InvalidSlug(String),
    #[error("unknown reference kind in '{0}'")]
    UnknownReferenceKind(String),
    #[error("unknown membership kind '{0}' (expected \"groups\" or \"series\")")]
    UnknownDiscriminator(String),
    #[error("membership kind \"{declared}\" does not take field '{field}'")]
    DiscriminatorMismatch {
        declared: &'static str,
        field: &'static str,
    },
    #[error("page belongs to both groups and a series; pick one")]
    AmbiguousMembership,
    #[error("page must belong to at least one group or to a series")]
    MissingMembership,
    #[error("'{0}' and '{1}' are both set; keep only '{0}'")]
    ConflictingAlias(&'static str, &'static str),
    #[error("must not be empty")]
    Empty,
    #[error("'{0}' is listed more than once")]
    DuplicateEntry(String),
    #[error("created ({created}) is after updated ({updated})")]
    CreatedAfterUpdated { created: String, updated: String },
    #[error("slug '{found}' does not match the record slug '{expected}'")]
    SlugMismatch { expected: String, found: String },
    #[error("unknown field")]
    UnknownField,
}

/// A problem tied to a field path such as `membership.groups[1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub problem: Problem,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.problem)
    }
}

/// A rejected record with every problem found in it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} '{slug}' ({location}): {}", summarize(.errors))]
pub struct ValidationError {
    pub kind: EntityKind,
    pub slug: Slug,
    pub location: String,
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

const PAGE_FIELDS: &[&str] = &[
    "slug",
    "title",
    "description",
    "tags",
    "draft",
    "created",
    "updated",
    "date",
    "membership",
    "groups",
    "series",
    "references",
];

const GROUP_FIELDS: &[&str] = &[
    "slug",
    "title",
    "description",
    "parents",
    "parent",
    "subgroups",
    "series",
    "pages",
    "color",
    "draft",
    "created",
    "updated",
    "date",
];

const MEMBERSHIP_FIELDS: &[&str] = &["kind", "groups", "series"];

const SERIES_FIELDS: &[&str] = &[
    "slug",
    "title",
    "description",
    "pages",
    "groups",
    "coverImage",
    "draft",
    "created",
    "updated",
    "date",
];

/// Validate a raw record against the schema of its kind.
pub fn validate(record: &RawRecord, options: &SchemaOptions) -> Result<Entity, ValidationError> {
    let reject = |errors: Vec<FieldError>| ValidationError {
        kind: record.kind,
        slug: record.slug.clone(),
        location: record.location.clone(),
        errors,
    };

    let mut errors = Vec::new();
    if !is_valid_slug(&record.slug) {
        errors.push(FieldError {
            field: "slug".into(),
            problem: Problem::InvalidSlug(record.slug.clone()),
        });
    }

    let Some(map) = record.data.as_object() else {
        errors.push(FieldError {
            field: "(record)".into(),
            problem: Problem::WrongType {
                expected: "map",
                found: type_name(&record.data),
            },
        });
        return Err(reject(errors));
    };

    let mut fields = Fields { map, errors };
    fields.check_slug(&record.slug);

    let (entity, known) = match record.kind {
        EntityKind::Page => (
            validate_page(&record.slug, &mut fields).map(Entity::Page),
            PAGE_FIELDS,
        ),
        EntityKind::Group => (
            validate_group(&record.slug, &mut fields, options).map(Entity::Group),
            GROUP_FIELDS,
        ),
        EntityKind::Series => (
            validate_series(&record.slug, &mut fields).map(Entity::Series),
            SERIES_FIELDS,
        ),
    };

    if options.deny_unknown_fields {
        fields.check_unknown(known);
        if record.kind == EntityKind::Page {
            fields.check_unknown_membership();
        }
    }

    match entity {
        Some(entity) if fields.errors.is_empty() => Ok(entity),
        _ => Err(reject(fields.into_errors())),
    }
}

pub fn validate_page(slug: &str, fields: &mut Fields<'_>) -> Option<Page> {
    let title = fields.required_string("title");
    let description = fields.optional_string("description");
    let tags = fields.string_set("tags");
    let draft = fields.bool_or("draft", false);
    let (created, updated) = fields.timestamps();
    let membership = fields.membership();
    let references = fields.references("references");

    Some(Page {
        slug: slug.to_string(),
        title: title?,
        description,
        tags,
        draft,
        created: created?,
        updated,
        membership: membership?,
        references,
    })
}

pub fn validate_group(
    slug: &str,
    fields: &mut Fields<'_>,
    options: &SchemaOptions,
) -> Option<Group> {
    let title = fields.required_string("title");
    let description = fields.required_string("description");
    let parents = fields.parents();
    let subgroups = fields.slug_set("subgroups");
    let series = fields.slug_set("series");
    let pages = fields.slug_set("pages");
    let color = fields
        .optional_string("color")
        .unwrap_or_else(|| options.default_color.clone());
    let draft = fields.bool_or("draft", false);
    let (created, updated) = fields.timestamps();

    Some(Group {
        slug: slug.to_string(),
        title: title?,
        description: description?,
        parents,
        subgroups,
        series,
        pages,
        color,
        draft,
        created: created?,
        updated,
    })
}

pub fn validate_series(slug: &str, fields: &mut Fields<'_>) -> Option<Series> {
    let title = fields.required_string("title");
    let description = fields.optional_string("description");
    let pages = fields.slug_list("pages");
    let groups = fields.slug_set("groups");
    let cover_image = fields.optional_string("coverImage");
    let draft = fields.bool_or("draft", false);
    let (created, updated) = fields.timestamps();

    Some(Series {
        slug: slug.to_string(),
        title: title?,
        description,
        pages,
        groups,
        cover_image,
        draft,
        created: created?,
        updated,
    })
}

/// Parse a timestamp in one of the accepted layouts.
///
/// - `2024-03-01` (midnight UTC)
/// - `2024-03-01T09:30:00` or `2024-03-01 09:30:00` (read as UTC)
/// - RFC 3339, e.g. `2024-03-01T09:30:00+02:00`
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

/// Field reader over one record's map, collecting errors as it goes.
///
/// `null` is treated the same as an absent field.
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> Fields<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self {
            map,
            errors: Vec::new(),
        }
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    fn error(&mut self, field: impl Into<String>, problem: Problem) {
        self.errors.push(FieldError {
            field: field.into(),
            problem,
        });
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn check_slug(&mut self, expected: &str) {
        match self.get("slug") {
            None => {}
            Some(Value::String(found)) if found == expected => {}
            Some(Value::String(found)) => self.error(
                "slug",
                Problem::SlugMismatch {
                    expected: expected.to_string(),
                    found: found.clone(),
                },
            ),
            Some(other) => self.error(
                "slug",
                Problem::WrongType {
                    expected: "string",
                    found: type_name(other),
                },
            ),
        }
    }

    fn check_unknown(&mut self, known: &[&str]) {
        let map = self.map;
        self.unknown_keys(map, known, "");
    }

    /// Unknown keys inside a canonical `membership` object.
    fn check_unknown_membership(&mut self) {
        if let Some(Value::Object(inner)) = self.get("membership") {
            self.unknown_keys(inner, MEMBERSHIP_FIELDS, "membership.");
        }
    }

    fn unknown_keys(&mut self, map: &Map<String, Value>, known: &[&str], prefix: &str) {
        for key in map.keys() {
            if !known.contains(&key.as_str()) {
                self.error(format!("{prefix}{key}"), Problem::UnknownField);
            }
        }
    }

    fn string_at(&mut self, value: &Value, path: &str) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            other => {
                self.error(
                    path,
                    Problem::WrongType {
                        expected: "string",
                        found: type_name(other),
                    },
                );
                None
            }
        }
    }

    pub fn required_string(&mut self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(value) => self.string_at(value, key),
            None => {
                self.error(key, Problem::Missing);
                None
            }
        }
    }

    pub fn optional_string(&mut self, key: &str) -> Option<String> {
        let value = self.get(key)?;
        self.string_at(value, key)
    }

    pub fn bool_or(&mut self, key: &str, default: bool) -> bool {
        match self.get(key) {
            None => default,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                self.error(
                    key,
                    Problem::WrongType {
                        expected: "boolean",
                        found: type_name(other),
                    },
                );
                default
            }
        }
    }

    /// Read an array of strings; absent means empty.
    fn strings_at(&mut self, value: Option<&Value>, path: &str) -> Vec<(String, String)> {
        match value {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| {
                    let item_path = format!("{path}[{i}]");
                    self.string_at(item, &item_path).map(|s| (item_path, s))
                })
                .collect(),
            Some(other) => {
                self.error(
                    path,
                    Problem::WrongType {
                        expected: "array",
                        found: type_name(other),
                    },
                );
                Vec::new()
            }
        }
    }

    /// Keep only entries that are valid slugs, reporting the rest.
    fn slugs_only(&mut self, entries: Vec<(String, String)>) -> Vec<String> {
        entries
            .into_iter()
            .filter_map(|(path, s)| {
                if is_valid_slug(&s) {
                    Some(s)
                } else {
                    self.error(path, Problem::InvalidSlug(s));
                    None
                }
            })
            .collect()
    }

    pub fn string_set(&mut self, key: &str) -> BTreeSet<String> {
        let value = self.get(key);
        self.strings_at(value, key)
            .into_iter()
            .map(|(_, s)| s)
            .collect()
    }

    pub fn slug_set(&mut self, key: &str) -> BTreeSet<Slug> {
        let value = self.get(key);
        let entries = self.strings_at(value, key);
        self.slugs_only(entries).into_iter().collect()
    }

    /// Ordered slug list; repeating an entry is an error.
    pub fn slug_list(&mut self, key: &str) -> Vec<Slug> {
        let value = self.get(key);
        let entries = self.strings_at(value, key);
        let mut seen = BTreeSet::new();
        let mut list = Vec::with_capacity(entries.len());
        for (path, s) in entries {
            if !is_valid_slug(&s) {
                self.error(path, Problem::InvalidSlug(s));
            } else if !seen.insert(s.clone()) {
                self.error(path, Problem::DuplicateEntry(s));
            } else {
                list.push(s);
            }
        }
        list
    }

    /// Reference strings: a slug, optionally prefixed by `page:`, `group:` or `series:`.
    pub fn references(&mut self, key: &str) -> BTreeSet<String> {
        let value = self.get(key);
        let entries = self.strings_at(value, key);
        let mut refs = BTreeSet::new();
        for (path, raw) in entries {
            match Reference::parse(&raw) {
                Err(_) => self.error(path, Problem::UnknownReferenceKind(raw)),
                Ok(r) if !is_valid_slug(r.slug) => {
                    self.error(path, Problem::InvalidSlug(r.slug.to_string()))
                }
                Ok(_) => {
                    refs.insert(raw);
                }
            }
        }
        refs
    }

    fn timestamp(&mut self, key: &str) -> Option<DateTime<Utc>> {
        let value = self.get(key)?;
        let raw = self.string_at(value, key)?;
        let parsed = parse_timestamp(&raw);
        if parsed.is_none() {
            self.error(key, Problem::InvalidTimestamp(raw));
        }
        parsed
    }

    /// `created` (or legacy `date`) plus optional `updated`, checked for order.
    pub fn timestamps(&mut self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let created = match (self.get("created").is_some(), self.get("date").is_some()) {
            (true, true) => {
                self.error("date", Problem::ConflictingAlias("created", "date"));
                self.timestamp("created")
            }
            (true, false) => self.timestamp("created"),
            (false, true) => self.timestamp("date"),
            (false, false) => {
                self.error("created", Problem::Missing);
                None
            }
        };
        let updated = self.timestamp("updated");

        if let (Some(c), Some(u)) = (created, updated)
            && c > u
        {
            self.error(
                "updated",
                Problem::CreatedAfterUpdated {
                    created: c.to_rfc3339(),
                    updated: u.to_rfc3339(),
                },
            );
        }
        (created, updated)
    }

    /// `parents` (or legacy single `parent`).
    pub fn parents(&mut self) -> BTreeSet<Slug> {
        match (self.get("parents").is_some(), self.get("parent")) {
            (true, Some(_)) => {
                self.error("parent", Problem::ConflictingAlias("parents", "parent"));
                self.slug_set("parents")
            }
            (false, Some(value)) => {
                let Some(parent) = self.string_at(value, "parent") else {
                    return BTreeSet::new();
                };
                if is_valid_slug(&parent) {
                    BTreeSet::from([parent])
                } else {
                    self.error("parent", Problem::InvalidSlug(parent));
                    BTreeSet::new()
                }
            }
            _ => self.slug_set("parents"),
        }
    }

    fn membership_groups(&mut self, value: Option<&Value>, path: &str) -> Option<Membership> {
        let Some(value) = value else {
            self.error(path, Problem::Missing);
            return None;
        };
        let entries = self.strings_at(Some(value), path);
        let groups: BTreeSet<Slug> = self.slugs_only(entries).into_iter().collect();
        if groups.is_empty() {
            if value.as_array().is_some_and(|a| a.is_empty()) {
                self.error(path, Problem::Empty);
            }
            return None;
        }
        Some(Membership::Groups { groups })
    }

    fn membership_series(&mut self, value: Option<&Value>, path: &str) -> Option<Membership> {
        let Some(value) = value else {
            self.error(path, Problem::Missing);
            return None;
        };
        let series = self.string_at(value, path)?;
        if !is_valid_slug(&series) {
            self.error(path, Problem::InvalidSlug(series));
            return None;
        }
        Some(Membership::Series { series })
    }

    /// Read page membership from the canonical object or the shorthand fields.
    pub fn membership(&mut self) -> Option<Membership> {
        let groups = self.get("groups");
        let series = self.get("series");

        let Some(canonical) = self.get("membership") else {
            return match (groups, series) {
                (Some(_), Some(_)) => {
                    self.error("membership", Problem::AmbiguousMembership);
                    None
                }
                (Some(g), None) => self.membership_groups(Some(g), "groups"),
                (None, Some(s)) => self.membership_series(Some(s), "series"),
                (None, None) => {
                    self.error("membership", Problem::MissingMembership);
                    None
                }
            };
        };

        if groups.is_some() {
            self.error("groups", Problem::ConflictingAlias("membership", "groups"));
        }
        if series.is_some() {
            self.error("series", Problem::ConflictingAlias("membership", "series"));
        }

        let Value::Object(m) = canonical else {
            self.error(
                "membership",
                Problem::WrongType {
                    expected: "map",
                    found: type_name(canonical),
                },
            );
            return None;
        };
        let inner = |key: &str| m.get(key).filter(|v| !v.is_null());

        let kind = match inner("kind") {
            Some(value) => self.string_at(value, "membership.kind")?,
            None => {
                self.error("membership.kind", Problem::Missing);
                return None;
            }
        };

        match kind.as_str() {
            "groups" => {
                if inner("series").is_some() {
                    self.error(
                        "membership.series",
                        Problem::DiscriminatorMismatch {
                            declared: "groups",
                            field: "series",
                        },
                    );
                }
                self.membership_groups(inner("groups"), "membership.groups")
            }
            "series" => {
                if inner("groups").is_some() {
                    self.error(
                        "membership.groups",
                        Problem::DiscriminatorMismatch {
                            declared: "series",
                            field: "groups",
                        },
                    );
                }
                self.membership_series(inner("series"), "membership.series")
            }
            _ => {
                self.error("membership.kind", Problem::UnknownDiscriminator(kind));
                None
            }
        }
    }
}
