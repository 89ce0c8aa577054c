//! The `---` delimited header block at the top of a record file.
//!
//! ```text
//! ---
//! title: "Sunset"
//! image: "2024-01-01-sunset.jpg"
//! caption: "Golden hour #sunset"
//! published: false
//! ---
//! ```
//!
//! Parsing keeps the byte span of every line so that marking a record as
//! published only touches the `published` and `publishedAt` lines.

use std::ops::Range;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::timestamp;

const DELIMITER: &str = "---";

pub const TITLE: &str = "title";
pub const IMAGE: &str = "image";
pub const CAPTION: &str = "caption";
pub const PUBLISHED: &str = "published";
pub const PUBLISHED_AT: &str = "publishedAt";
pub const CREATED_AT: &str = "createdAt";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record does not start with a `---` header block")]
    MissingHeader,
    #[error("header block is not closed with `---`")]
    UnterminatedHeader,
    #[error("incomplete record, missing {}", .missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },
    #[error("invalid value for `{key}`: {value}")]
    InvalidValue { key: String, value: String },
    #[error("record is already published")]
    AlreadyPublished,
}

#[derive(Debug, Clone)]
struct Field {
    key: String,
    raw: String,
    /// Line content, without its terminator.
    span: Range<usize>,
    eol: &'static str,
}

/// Raw `key: value` lines of a header block, borrowed from the record source.
#[derive(Debug, Clone)]
pub struct FrontMatter<'a> {
    source: &'a str,
    fields: Vec<Field>,
}

impl<'a> FrontMatter<'a> {
    pub fn parse(source: &'a str) -> Result<Self, RecordError> {
        let mut lines = Lines::new(source);
        match lines.next() {
            Some((line, _, _)) if line == DELIMITER => {}
            _ => return Err(RecordError::MissingHeader),
        }

        let mut fields = vec![];
        for (line, span, eol) in lines.by_ref() {
            if line == DELIMITER {
                return Ok(Self { source, fields });
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() || key.starts_with('#') {
                continue;
            }
            fields.push(Field {
                key: key.to_string(),
                raw: value.trim().to_string(),
                span,
                eol,
            });
        }

        Err(RecordError::UnterminatedHeader)
    }

    fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.key == key)
    }

    /// A string value. Quoted values follow JSON escaping, bare values are taken as written.
    pub fn string(&self, key: &str) -> Result<Option<String>, RecordError> {
        let Some(field) = self.field(key) else {
            return Ok(None);
        };
        let raw = field.raw.as_str();
        if raw.is_empty() {
            return Ok(None);
        }

        let value = if raw.starts_with('"') {
            serde_json::from_str::<String>(raw).map_err(|_| invalid(key, raw))?
        } else {
            raw.to_string()
        };

        Ok(Some(value).filter(|value| !value.is_empty()))
    }

    pub fn boolean(&self, key: &str) -> Result<Option<bool>, RecordError> {
        match self.field(key).map(|field| field.raw.as_str()) {
            None => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(raw) => Err(invalid(key, raw)),
        }
    }

    pub fn datetime(&self, key: &str) -> Result<Option<DateTime<Utc>>, RecordError> {
        let Some(value) = self.string(key)? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&value)
            .map(|time| Some(time.to_utc()))
            .map_err(|_| invalid(key, &value))
    }

    /// Rewrite the source with `published: true` and a fresh `publishedAt`.
    ///
    /// An existing `publishedAt` line is replaced in place, otherwise the
    /// stamp goes on the line right after `published`.
    pub fn mark_published(&self, now: &DateTime<Utc>) -> Result<String, RecordError> {
        let published = self.field(PUBLISHED).ok_or(RecordError::Incomplete {
            missing: vec![PUBLISHED],
        })?;
        if self.boolean(PUBLISHED)? == Some(true) {
            return Err(RecordError::AlreadyPublished);
        }

        let stamp = format!("{}: \"{}\"", PUBLISHED_AT, timestamp(now));
        let mut edits = vec![(published.span.clone(), format!("{}: true", PUBLISHED))];
        match self.field(PUBLISHED_AT) {
            Some(field) => edits.push((field.span.clone(), stamp)),
            None => {
                let at = published.span.end;
                edits.push((at..at, format!("{}{}", published.eol, stamp)));
            }
        }
        edits.sort_by_key(|(range, _)| range.start);

        let mut output = String::with_capacity(self.source.len() + 48);
        let mut cursor = 0;
        for (range, text) in edits {
            output.push_str(&self.source[cursor..range.start]);
            output.push_str(&text);
            cursor = range.end;
        }
        output.push_str(&self.source[cursor..]);

        Ok(output)
    }
}

fn invalid(key: &str, value: &str) -> RecordError {
    RecordError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Typed view of a complete record header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub title: String,
    pub image: String,
    pub caption: String,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl RecordHeader {
    pub fn parse(source: &str) -> Result<Self, RecordError> {
        Self::from_front_matter(&FrontMatter::parse(source)?)
    }

    pub fn from_front_matter(front: &FrontMatter) -> Result<Self, RecordError> {
        let title = front.string(TITLE)?;
        let image = front.string(IMAGE)?;
        let caption = front.string(CAPTION)?;
        let published = front.boolean(PUBLISHED)?;

        let mut missing = vec![];
        if title.is_none() {
            missing.push(TITLE);
        }
        if image.is_none() {
            missing.push(IMAGE);
        }
        if caption.is_none() {
            missing.push(CAPTION);
        }
        if published.is_none() {
            missing.push(PUBLISHED);
        }

        match (title, image, caption, published) {
            (Some(title), Some(image), Some(caption), Some(published)) => Ok(Self {
                title,
                image,
                caption,
                published,
                published_at: front.datetime(PUBLISHED_AT)?,
                created_at: front.datetime(CREATED_AT)?,
            }),
            _ => Err(RecordError::Incomplete { missing }),
        }
    }
}

/// Lines with their byte span and terminator.
struct Lines<'a> {
    source: &'a str,
    offset: usize,
}

impl<'a> Lines<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, offset: 0 }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = (&'a str, Range<usize>, &'static str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.source.len() {
            return None;
        }

        let rest = &self.source[self.offset..];
        let (content, eol) = match rest.find('\n') {
            Some(end) if rest[..end].ends_with('\r') => (&rest[..end - 1], "\r\n"),
            Some(end) => (&rest[..end], "\n"),
            None => (rest, ""),
        };

        let start = self.offset;
        let span = start..start + content.len();
        self.offset = span.end + eol.len();
        Some((content, span, eol))
    }
}
