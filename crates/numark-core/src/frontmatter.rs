//! Frontmatter parsing for content files.

use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
pub use serde_yaml::Value;

use crate::error::{CoreError, Result};

/// Frontmatter metadata for content files.
///
/// Recognized keys are typed; anything else lands in [`Frontmatter::extra`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    /// Page title.
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,

    /// Explicit URL slug.
    #[serde(default, deserialize_with = "lenient_string")]
    pub slug: Option<String>,

    /// Template to use for rendering.
    #[serde(default, deserialize_with = "lenient_string")]
    pub template: Option<String>,

    /// Layout wrapping the rendered template.
    #[serde(default, deserialize_with = "lenient_string")]
    pub layout: Option<String>,

    /// Publication date as written in the source.
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,

    /// Whether this is a draft.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub draft: bool,

    /// Tags, from either a list or a comma-separated string.
    #[serde(default, deserialize_with = "string_list")]
    pub tags: Vec<String>,

    /// Categories, normalized like tags.
    #[serde(default, deserialize_with = "string_list")]
    pub categories: Vec<String>,

    /// Explicit collection name.
    #[serde(default, deserialize_with = "lenient_string")]
    pub collection: Option<String>,

    /// Explicit excerpt.
    #[serde(default, deserialize_with = "lenient_string")]
    pub excerpt: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub author: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub image: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub canonical: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub robots: Option<String>,

    /// Page description for meta tags.
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,

    /// Custom extra fields.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Delimiter types for frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterFormat {
    /// YAML frontmatter delimited by `---`.
    Yaml,
    /// TOML frontmatter delimited by `+++`.
    Toml,
}

impl FrontmatterFormat {
    /// Get the delimiter string for this format.
    pub fn delimiter(&self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// Split content into frontmatter and body.
///
/// The block must open on the first non-blank line and close on a line
/// holding only the same delimiter. An unclosed block is not frontmatter.
pub fn split_frontmatter(content: &str) -> Option<(FrontmatterFormat, &str, &str)> {
    let content = content.trim_start_matches('\u{feff}').trim_start();

    let format = if content.starts_with("---") {
        FrontmatterFormat::Yaml
    } else if content.starts_with("+++") {
        FrontmatterFormat::Toml
    } else {
        return None;
    };
    let delimiter = format.delimiter();

    let first_end = content.find('\n')?;
    if content[..first_end].trim() != delimiter {
        return None;
    }

    let rest = &content[first_end + 1..];
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim() == delimiter {
            let frontmatter = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((format, frontmatter, body));
        }
        offset += line.len();
    }

    None
}

/// Parse frontmatter from a string.
///
/// Returns the frontmatter and the trimmed body. Content without a block
/// yields empty frontmatter and the whole trimmed input.
pub fn parse_frontmatter(content: &str, path: &Path) -> Result<(Frontmatter, String)> {
    let Some((format, fm_str, body)) = split_frontmatter(content) else {
        return Ok((Frontmatter::default(), content.trim().to_string()));
    };

    let value = match format {
        FrontmatterFormat::Yaml => serde_yaml::from_str::<Value>(fm_str)
            .map_err(|e| CoreError::frontmatter(path, e.to_string()))?,
        FrontmatterFormat::Toml => {
            let table = toml::from_str::<toml::Table>(fm_str)
                .map_err(|e| CoreError::frontmatter(path, e.to_string()))?;
            toml_to_yaml(toml::Value::Table(table))
        }
    };

    let frontmatter = match value {
        Value::Null => Frontmatter::default(),
        Value::Mapping(_) => serde_yaml::from_value(value)
            .map_err(|e| CoreError::frontmatter(path, e.to_string()))?,
        _ => {
            return Err(CoreError::frontmatter(
                path,
                "frontmatter must be a key-value mapping",
            ));
        }
    };

    Ok((frontmatter, body.trim().to_string()))
}

fn toml_to_yaml(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => Value::Number(f.into()),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Sequence(items.into_iter().map(toml_to_yaml).collect()),
        toml::Value::Table(table) => Value::Mapping(
            table
                .into_iter()
                .map(|(k, v)| (Value::String(k), toml_to_yaml(v)))
                .collect(),
        ),
    }
}

/// Render a YAML scalar as text. Collections yield `None`.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        other => scalar_to_string(&other)
            .map(Some)
            .ok_or_else(|| D::Error::custom("expected a scalar value")),
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" | "" => Ok(false),
            other => Err(D::Error::custom(format!("invalid boolean: {other}"))),
        },
        Value::Number(n) => Ok(n.as_i64().is_some_and(|i| i != 0)),
        _ => Err(D::Error::custom("expected a boolean")),
    }
}

fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Vec<String> = match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Sequence(seq) => seq
            .iter()
            .map(|v| {
                scalar_to_string(v).ok_or_else(|| D::Error::custom("list items must be scalars"))
            })
            .collect::<std::result::Result<_, _>>()?,
        other => vec![
            scalar_to_string(&other).ok_or_else(|| D::Error::custom("expected a list"))?,
        ],
    };

    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

impl Frontmatter {
    /// Parse the `date` field.
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and
    /// plain `YYYY-MM-DD` (midnight UTC).
    pub fn parsed_date(&self) -> Option<DateTime<Utc>> {
        let raw = self.date.as_deref()?.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(dt.and_utc());
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    /// Whether a non-blank title is set.
    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Look up any field as text, typed or extra.
    pub fn get(&self, key: &str) -> Option<String> {
        let typed = match key {
            "title" => &self.title,
            "slug" => &self.slug,
            "template" => &self.template,
            "layout" => &self.layout,
            "date" => &self.date,
            "collection" => &self.collection,
            "excerpt" => &self.excerpt,
            "author" => &self.author,
            "image" => &self.image,
            "canonical" => &self.canonical,
            "robots" => &self.robots,
            "description" => &self.description,
            "draft" => return Some(self.draft.to_string()),
            "tags" => return Some(self.tags.join(", ")),
            "categories" => return Some(self.categories.join(", ")),
            _ => return self.extra.get(key).and_then(scalar_to_string),
        };
        typed.clone()
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
