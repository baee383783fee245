//! Path template parsing.
//!
//! A template is a series of `/`-separated items. An item is either a
//! literal or a positional argument written `{<index>:<name>}`, where
//! `<index>` is the zero-based handler parameter the segment feeds and
//! `<name>` is documentation only. The legacy shorthand `:<name>` takes the
//! next index in order of appearance.
//!
//! ```text
//! /a/{0:b}/c      → Literal(a), Positional(0, b), Literal(c)
//! /users/:id/tags → Literal(users), Positional(0, id), Literal(tags)
//! ```

use std::collections::BTreeSet;
use std::fmt;

use crate::error::ConfigurationError;

/// One item of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Exact-match component.
    Literal(String),
    /// Component bound to handler parameter `index`.
    Positional { index: usize, name: String },
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(text) => f.write_str(text),
            Segment::Positional { index, name } => write!(f, "{{{}:{}}}", index, name),
        }
    }
}

/// Parsed path template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

/// Split a request or template path into its non-empty components.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl PathTemplate {
    /// Parse a raw template, rejecting malformed items and repeated indices.
    pub fn parse(raw: &str) -> Result<Self, ConfigurationError> {
        let malformed = |reason: String| ConfigurationError::MalformedTemplate {
            template: raw.to_string(),
            reason,
        };

        let mut segments = Vec::new();
        let mut seen = BTreeSet::new();

        for item in split_path(raw) {
            let segment = if let Some(name) = item.strip_prefix(':') {
                Segment::Positional {
                    index: seen.len(),
                    name: name.to_string(),
                }
            } else if let Some(inner) = item.strip_prefix('{') {
                let inner = inner
                    .strip_suffix('}')
                    .ok_or_else(|| malformed(format!("unterminated argument '{}'", item)))?;
                let (index, name) = inner.split_once(':').unwrap_or((inner, ""));
                if name.contains(['{', '}']) {
                    return Err(malformed(format!("invalid argument name in '{}'", item)));
                }
                let index = index
                    .parse::<usize>()
                    .map_err(|e| malformed(format!("unable to parse position '{}': {}", index, e)))?;
                Segment::Positional {
                    index,
                    name: name.to_string(),
                }
            } else if item.contains(['{', '}']) {
                return Err(malformed(format!("invalid '{{' or '}}' in literal '{}'", item)));
            } else {
                Segment::Literal(item.to_string())
            };

            if let Segment::Positional { index, .. } = &segment {
                if !seen.insert(*index) {
                    return Err(ConfigurationError::DuplicatePosition {
                        template: raw.to_string(),
                        pos: *index,
                    });
                }
            }
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Positional indices in order of appearance.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Positional { index, .. } => Some(*index),
            Segment::Literal(_) => None,
        })
    }

    /// Check the template against a handler of `arity` parameters and return
    /// the parameter left for the body, if any.
    pub fn bind(&self, arity: usize) -> Result<Option<usize>, ConfigurationError> {
        let mut uncovered: BTreeSet<usize> = (0..arity).collect();

        for pos in self.positions() {
            if pos >= arity {
                return Err(ConfigurationError::PositionOutOfRange {
                    template: self.to_string(),
                    pos,
                    arity,
                });
            }
            uncovered.remove(&pos);
        }

        if uncovered.len() > 1 {
            return Err(ConfigurationError::AmbiguousBody {
                template: self.to_string(),
                uncovered: uncovered.into_iter().collect(),
            });
        }

        Ok(uncovered.into_iter().next())
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}
