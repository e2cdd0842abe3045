//! Front matter and data file parsing.
//!
//! Content files come in two shapes:
//!
//! - **Documents** (`.md`, `.mdx`): a fenced metadata block followed by the
//!   body. `---` fences hold YAML, `+++` fences hold TOML. A document without
//!   a fence has no fields.
//! - **Data files** (`.json`, `.yaml`, `.yml`, `.toml`): the whole file is
//!   the record.
//!
//! Either way the fields come out as a `serde_json::Value` so the schema
//! validator sees one representation regardless of the source syntax. TOML
//! datetimes become strings, which the validator parses like any other
//! timestamp.

use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("front matter opened with '{0}' is never closed")]
    Unterminated(&'static str),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("front matter must be a map of fields")]
    NotAMap,
}

/// How a content file is laid out, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Document,
    Json,
    Yaml,
    Toml,
}

impl Format {
    /// Returns `None` for files that aren't content (images, stylesheets, ...).
    pub fn from_path(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "md" | "mdx" | "markdown" => Some(Format::Document),
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            _ => None,
        }
    }
}

/// A parsed content file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The record fields. Always a JSON object.
    pub data: Value,
    /// Markdown body; empty for data files.
    pub body: String,
}

/// Parse file contents according to `format`.
pub fn parse(content: &str, format: Format) -> Result<Document, FrontMatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    match format {
        Format::Document => split(content),
        Format::Json => Ok(Document {
            data: ensure_map(serde_json::from_str(content)?)?,
            body: String::new(),
        }),
        Format::Yaml => Ok(Document {
            data: parse_yaml(content)?,
            body: String::new(),
        }),
        Format::Toml => Ok(Document {
            data: parse_toml(content)?,
            body: String::new(),
        }),
    }
}

/// Split a markdown document into front matter fields and body.
pub fn split(content: &str) -> Result<Document, FrontMatterError> {
    if let Some((fields, body)) = fenced(content, "---")? {
        return Ok(Document {
            data: parse_yaml(fields)?,
            body: body.to_string(),
        });
    }
    if let Some((fields, body)) = fenced(content, "+++")? {
        return Ok(Document {
            data: parse_toml(fields)?,
            body: body.to_string(),
        });
    }
    Ok(Document {
        data: Value::Object(Map::new()),
        body: content.to_string(),
    })
}

/// Find a block opened by `fence` on the first line and closed by `fence` on
/// a later line of its own. Returns `(block, rest)`.
fn fenced<'a>(
    content: &'a str,
    fence: &'static str,
) -> Result<Option<(&'a str, &'a str)>, FrontMatterError> {
    let Some(after_open) = content.strip_prefix(fence) else {
        return Ok(None);
    };
    let Some(inner) = after_open
        .strip_prefix("\r\n")
        .or_else(|| after_open.strip_prefix('\n'))
    else {
        return Ok(None);
    };

    let mut offset = 0;
    for line in inner.split_inclusive('\n') {
        if line.trim_end() == fence {
            return Ok(Some((&inner[..offset], &inner[offset + line.len()..])));
        }
        offset += line.len();
    }
    Err(FrontMatterError::Unterminated(fence))
}

fn ensure_map(value: Value) -> Result<Value, FrontMatterError> {
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(FrontMatterError::NotAMap),
    }
}

fn parse_yaml(source: &str) -> Result<Value, FrontMatterError> {
    if source.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    ensure_map(serde_yaml::from_str(source)?)
}

fn parse_toml(source: &str) -> Result<Value, FrontMatterError> {
    let table: toml::Table = toml::from_str(source)?;
    Ok(toml_to_json(toml::Value::Table(table)))
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.md")), Some(Format::Document));
        assert_eq!(Format::from_path(Path::new("a.MDX")), Some(Format::Document));
        assert_eq!(Format::from_path(Path::new("a.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("a.yml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("a.toml")), Some(Format::Toml));
        assert_eq!(Format::from_path(Path::new("cover.png")), None);
        assert_eq!(Format::from_path(Path::new("README")), None);
    }

    #[test]
    fn yaml_front_matter() {
        let doc = split("---\ntitle: Intro\ntags: [a, b]\ndraft: true\n---\n# Hello\n").unwrap();
        assert_eq!(
            doc.data,
            json!({"title": "Intro", "tags": ["a", "b"], "draft": true})
        );
        assert_eq!(doc.body, "# Hello\n");
    }

    #[test]
    fn yaml_dates_stay_strings() {
        let doc = split("---\ncreated: 2024-01-05\n---\n").unwrap();
        assert_eq!(doc.data["created"], json!("2024-01-05"));
    }

    #[test]
    fn toml_front_matter() {
        let doc = split("+++\ntitle = \"Intro\"\ncreated = 2024-01-05\n+++\nBody").unwrap();
        assert_eq!(doc.data["title"], json!("Intro"));
        assert_eq!(doc.data["created"], json!("2024-01-05"));
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn toml_offset_datetime_becomes_string() {
        let doc = split("+++\ncreated = 2024-01-05T10:00:00Z\n+++\n").unwrap();
        assert_eq!(doc.data["created"], json!("2024-01-05T10:00:00Z"));
    }

    #[test]
    fn crlf_line_endings() {
        let doc = split("---\r\ntitle: Intro\r\n---\r\nBody\r\n").unwrap();
        assert_eq!(doc.data["title"], json!("Intro"));
        assert_eq!(doc.body, "Body\r\n");
    }

    #[test]
    fn empty_front_matter_is_empty_map() {
        let doc = split("---\n---\nBody").unwrap();
        assert_eq!(doc.data, json!({}));
        assert_eq!(doc.body, "Body");
    }

    #[test]
    fn no_front_matter() {
        let doc = split("# Just markdown\n").unwrap();
        assert_eq!(doc.data, json!({}));
        assert_eq!(doc.body, "# Just markdown\n");
    }

    #[test]
    fn horizontal_rule_is_not_a_fence() {
        let doc = split("----\ntext").unwrap();
        assert_eq!(doc.data, json!({}));
    }

    #[test]
    fn unterminated_front_matter() {
        let err = split("---\ntitle: Intro\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::Unterminated("---")));
    }

    #[test]
    fn scalar_front_matter_rejected() {
        let err = split("---\njust a string\n---\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::NotAMap));
    }

    #[test]
    fn invalid_yaml_is_error() {
        let err = split("---\ntitle: [unclosed\n---\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::Yaml(_)));
    }

    #[test]
    fn data_files() {
        let json_doc = parse(r#"{"title": "Rust"}"#, Format::Json).unwrap();
        assert_eq!(json_doc.data, json!({"title": "Rust"}));
        assert!(json_doc.body.is_empty());

        let yaml_doc = parse("title: Rust\npages:\n  - a\n  - b\n", Format::Yaml).unwrap();
        assert_eq!(yaml_doc.data, json!({"title": "Rust", "pages": ["a", "b"]}));

        let toml_doc = parse("title = \"Rust\"\nweight = 1.5\n", Format::Toml).unwrap();
        assert_eq!(toml_doc.data, json!({"title": "Rust", "weight": 1.5}));
    }

    #[test]
    fn json_array_rejected() {
        let err = parse("[1, 2]", Format::Json).unwrap_err();
        assert!(matches!(err, FrontMatterError::NotAMap));
    }

    #[test]
    fn byte_order_mark_skipped() {
        let doc = parse("\u{feff}---\ntitle: Intro\n---\n", Format::Document).unwrap();
        assert_eq!(doc.data["title"], json!("Intro"));
    }
}
