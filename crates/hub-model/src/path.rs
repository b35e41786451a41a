//! Slash-separated key paths through a source document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Separator between keys in a rendered path.
pub const PATH_SEPARATOR: char = '/';

const QUOTED_OPEN: &str = "node('";

/// Key usable verbatim in a path step: a name optionally prefixed with `@`,
/// starting with a letter or `_`, followed by letters, digits, `_ - . :`.
pub fn is_name(key: &str) -> bool {
    let name = key.strip_prefix('@').unwrap_or(key);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

/// Read the body of a `node('...')` step; `''` stands for one quote.
/// Returns the key and the text after the closing `)`.
fn read_quoted(text: &str) -> Option<(String, &str)> {
    let mut key = String::new();
    let mut chars = text.char_indices();
    while let Some((index, c)) = chars.next() {
        if c != '\'' {
            key.push(c);
            continue;
        }
        let after = &text[index + 1..];
        if after.starts_with('\'') {
            key.push('\'');
            chars.next();
            continue;
        }
        return after.strip_prefix(')').map(|rest| (key, rest));
    }
    None
}

fn write_segment(f: &mut fmt::Formatter<'_>, key: &str) -> fmt::Result {
    if is_name(key) {
        f.write_str(key)
    } else {
        write!(f, "{QUOTED_OPEN}{}')", key.replace('\'', "''"))
    }
}

/// Ordered keys from the document root (excluded) down to a node.
///
/// The same type carries relative paths produced by the resolver: an empty
/// path is the document root (or the context itself) and renders as `/`.
/// Keys are kept verbatim, so XML namespace prefixes such as
/// `nutFree:name` survive unchanged. Keys that are not plain names (spaces,
/// `/`, `$`, leading digits) render as `node('first name')`.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub struct SourcePath(Vec<String>);

impl SourcePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parse a rendered path. Surrounding whitespace and leading or trailing
    /// separators are ignored, and `/` or the empty string yield the root
    /// path. Each segment is either a plain name or a quoted `node('...')`
    /// key, exactly as [`Display`](fmt::Display) writes them.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim().trim_matches(PATH_SEPARATOR);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        let mut rest = trimmed;
        loop {
            let (segment, remainder) = if let Some(quoted) = rest.strip_prefix(QUOTED_OPEN) {
                read_quoted(quoted).ok_or_else(|| ModelError::InvalidSegment(text.to_string()))?
            } else {
                let end = rest.find(PATH_SEPARATOR).unwrap_or(rest.len());
                let name = &rest[..end];
                if name.is_empty() {
                    return Err(ModelError::EmptySegment(text.to_string()));
                }
                if !is_name(name) {
                    return Err(ModelError::InvalidSegment(text.to_string()));
                }
                (name.to_string(), &rest[end..])
            };
            segments.push(segment);
            if remainder.is_empty() {
                break;
            }
            rest = remainder
                .strip_prefix(PATH_SEPARATOR)
                .ok_or_else(|| ModelError::InvalidSegment(text.to_string()))?;
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The last key, or `None` for the root.
    pub fn key(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    #[must_use]
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.into());
        Self(segments)
    }

    #[must_use]
    pub fn join(&self, other: &SourcePath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    /// Segment-wise prefix test; `a/b` is not a prefix of `a/bc`.
    pub fn starts_with(&self, prefix: &SourcePath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// True when `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &SourcePath) -> bool {
        self.0.len() > ancestor.0.len() && self.starts_with(ancestor)
    }

    pub fn strip_prefix(&self, prefix: &SourcePath) -> Option<Self> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| Self(rest.to_vec()))
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "{PATH_SEPARATOR}");
        }
        for (index, key) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, "{PATH_SEPARATOR}")?;
            }
            write_segment(f, key)?;
        }
        Ok(())
    }
}

impl FromStr for SourcePath {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<SourcePath> for String {
    fn from(path: SourcePath) -> Self {
        path.to_string()
    }
}

impl TryFrom<String> for SourcePath {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}
