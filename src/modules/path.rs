//! Remote field paths used by provider mappings.
//!
//! A path is a dot-separated list of object keys, each optionally followed by
//! one or more `[index]` array subscripts: `authors[0].name`,
//! `identifiers.isbn_13[0]`, `covers[1][0]`.

use std::fmt;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// A parsed remote path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    segments: Vec<Segment>,
}

impl RemotePath {
    /// Parse a path, returning a description of the first syntax error.
    pub fn parse(path: &str) -> Result<Self, String> {
        if path.trim().is_empty() {
            return Err("path must not be empty".to_string());
        }

        let mut segments = Vec::new();
        for part in path.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(pos) => part.split_at(pos),
                None => (part, ""),
            };
            if key.is_empty() && (rest.is_empty() || segments.is_empty()) {
                return Err(format!("empty segment in path '{path}'"));
            }
            if !key.is_empty() {
                segments.push(Segment::Key(key.to_string()));
            }
            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| format!("unclosed '[' in path '{path}'"))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| format!("invalid array index in path '{path}'"))?;
                segments.push(Segment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(format!("unexpected characters after ']' in path '{path}'"));
                }
            }
        }

        Ok(Self { segments })
    }

    /// Walk `root` along this path. Missing keys, out-of-range indexes and
    /// type mismatches all resolve to `None`.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |value, segment| match segment {
                Segment::Key(key) => value.as_object()?.get(key),
                Segment::Index(index) => value.as_array()?.get(*index),
            })
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_keys_and_indexes() {
        let path = RemotePath::parse("authors[0].name").unwrap();
        assert_eq!(path.to_string(), "authors[0].name");

        let nested = RemotePath::parse("covers[1][0]").unwrap();
        assert_eq!(nested.to_string(), "covers[1][0]");
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!(RemotePath::parse("").is_err());
        assert!(RemotePath::parse("a..b").is_err());
        assert!(RemotePath::parse("authors[").is_err());
        assert!(RemotePath::parse("authors[x]").is_err());
        assert!(RemotePath::parse("authors[0]name").is_err());
        assert!(RemotePath::parse("[0]").is_err());
    }

    #[test]
    fn resolves_nested_values() {
        let raw = json!({
            "title": "Dune",
            "authors": [{"name": "Frank Herbert"}],
            "identifiers": {"isbn_13": ["9780441013593"]}
        });

        let title = RemotePath::parse("title").unwrap();
        assert_eq!(title.resolve(&raw), Some(&json!("Dune")));

        let author = RemotePath::parse("authors[0].name").unwrap();
        assert_eq!(author.resolve(&raw), Some(&json!("Frank Herbert")));

        let isbn = RemotePath::parse("identifiers.isbn_13[0]").unwrap();
        assert_eq!(isbn.resolve(&raw), Some(&json!("9780441013593")));
    }

    #[test]
    fn missing_values_resolve_to_none() {
        let raw = json!({"authors": [], "title": "x"});
        assert!(RemotePath::parse("authors[0].name").unwrap().resolve(&raw).is_none());
        assert!(RemotePath::parse("title.sub").unwrap().resolve(&raw).is_none());
        assert!(RemotePath::parse("publisher").unwrap().resolve(&raw).is_none());
    }
}
