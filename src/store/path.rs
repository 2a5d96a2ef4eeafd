//! Dotted/indexed field paths such as `lens.treatment` or `persons[0].name`.
//!
//! A path may also be a *template*: `persons[*].name` names the `name` field of
//! every element of the `persons` group. Templates are what schemas and rules
//! declare; concrete paths are what issues and snapshots use.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Empty field path")]
    Empty,
    #[error("Empty segment in field path '{0}'")]
    EmptySegment(String),
    #[error("Invalid index '{index}' in field path '{path}'")]
    BadIndex { path: String, index: String },
    #[error("Unclosed '[' in field path '{0}'")]
    UnclosedBracket(String),
    #[error("Field path '{0}' must start with a field name")]
    LeadingIndex(String),
    #[error("Wildcard path '{0}' cannot be written to")]
    Wildcard(String),
    #[error("Field path '{0}' does not match the shape of the form value")]
    Shape(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Key(String),
    Index(usize),
    /// `[*]`: any element of a repeated group.
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: SmallVec<[Segment; 2]>,
}

impl FieldPath {
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = SmallVec::new();
        for part in s.split('.') {
            if part.is_empty() {
                return Err(PathError::EmptySegment(s.to_string()));
            }
            let (key, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if key.is_empty() {
                return Err(PathError::LeadingIndex(s.to_string()));
            }
            segments.push(Segment::Key(key.to_string()));

            while !rest.is_empty() {
                // `rest` always starts with '[' here.
                let close = rest.find(']').ok_or_else(|| PathError::UnclosedBracket(s.to_string()))?;
                let inner = &rest[1..close];
                if inner == "*" {
                    segments.push(Segment::Any);
                } else {
                    let idx = inner.parse::<usize>().map_err(|_| PathError::BadIndex {
                        path: s.to_string(),
                        index: inner.to_string(),
                    })?;
                    segments.push(Segment::Index(idx));
                }
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(PathError::EmptySegment(s.to_string()));
                }
            }
        }

        Ok(Self { segments })
    }

    /// A single top-level field.
    pub fn key(name: impl Into<String>) -> Self {
        let mut segments = SmallVec::new();
        segments.push(Segment::Key(name.into()));
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Appends a segment, returning the extended path.
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    pub fn is_template(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Any))
    }

    /// The template a concrete path belongs to: every index becomes `[*]`.
    pub fn template(&self) -> Self {
        let segments = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Index(_) => Segment::Any,
                other => other.clone(),
            })
            .collect();
        Self { segments }
    }

    /// True when `concrete` is an instance of this path (`[*]` matches any index).
    pub fn matches(&self, concrete: &FieldPath) -> bool {
        self.segments.len() == concrete.segments.len()
            && self
                .segments
                .iter()
                .zip(concrete.segments.iter())
                .all(|(t, c)| match (t, c) {
                    (Segment::Any, Segment::Index(_)) => true,
                    (a, b) => a == b,
                })
    }

    /// Substitutes the indices of `concrete` into this template's wildcards, in order.
    ///
    /// Used to resolve a sibling template (`persons[*].relationship_other`) against
    /// the concrete element a rule is currently evaluating (`persons[2].relationship`).
    pub fn bind(&self, concrete: &FieldPath) -> Self {
        let mut indices = concrete.segments.iter().filter_map(|s| match s {
            Segment::Index(i) => Some(*i),
            _ => None,
        });
        let segments = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Any => indices.next().map_or(Segment::Any, Segment::Index),
                other => other.clone(),
            })
            .collect();
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                Segment::Key(k) if i == 0 => write!(f, "{}", k)?,
                Segment::Key(k) => write!(f, ".{}", k)?,
                Segment::Index(idx) => write!(f, "[{}]", idx)?,
                Segment::Any => write!(f, "[*]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        FieldPath::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("payment_method", "payment_method")]
    #[case("lens.treatment", "lens.treatment")]
    #[case("persons[0].name", "persons[0].name")]
    #[case("persons[*].name", "persons[*].name")]
    #[case("  visit.date ", "visit.date")]
    fn test_parse_and_display(#[case] input: &str, #[case] expected: &str) {
        let path = FieldPath::parse(input).unwrap();
        assert_eq!(path.to_string(), expected);
    }

    #[test]
    fn test_parse_invalid() {
        let failures = vec![
            "",              // Empty
            "a..b",          // Empty segment
            "[0].name",      // Leading index
            "persons[x]",    // Non-numeric index
            "persons[0",     // Unclosed
            "persons[0]x",   // Trailing garbage after index
        ];

        for input in failures {
            assert!(FieldPath::parse(input).is_err(), "Should fail: '{}'", input);
        }
    }

    #[test]
    fn test_template_matching() {
        let template = FieldPath::parse("persons[*].name").unwrap();
        let concrete = FieldPath::parse("persons[3].name").unwrap();
        let other = FieldPath::parse("persons[3].dob").unwrap();

        assert!(template.matches(&concrete));
        assert!(!template.matches(&other));
        assert_eq!(concrete.template(), template);
        assert!(template.is_template());
        assert!(!concrete.is_template());
    }

    #[test]
    fn test_bind_sibling_template() {
        let sibling = FieldPath::parse("persons[*].relationship_other").unwrap();
        let concrete = FieldPath::parse("persons[2].relationship").unwrap();
        assert_eq!(sibling.bind(&concrete).to_string(), "persons[2].relationship_other");
    }

    #[test]
    fn test_serde_as_string() {
        let path = FieldPath::parse("persons[1].name").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"persons[1].name\"");
        let back: FieldPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
