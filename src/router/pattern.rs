//! Route pattern grammar and validation.
//!
//! ```text
//! path    = "/" segment ("/" segment)*
//! segment = literal | ":" name | "*" name
//! name    = one or more chars, none of "/", ":", "*"
//! ```
//!
//! `*` is only legal in the final segment; at most one `:`/`*` per segment;
//! no `?` anywhere in the pattern (that would collide with the query
//! separator at lookup time).

use crate::error::Error;

/// One parsed segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    Wildcard(String),
}

/// A validated, segment-split route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub raw: String,
    pub segments: Vec<Segment>,
}

impl Pattern {
    /// Whether this pattern contains no `:` or `*` segments — eligible for
    /// the static map tier.
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Whether this pattern contains a wildcard segment.
    pub fn has_wildcard(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Wildcard(_)))
    }

    /// Number of segments — the key for the segment-count-bucketed
    /// parametric tier. Not meaningful for wildcard patterns (the suffix
    /// collapses an unknown number of request segments into one capture).
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

/// Parse and validate a route pattern string.
pub fn parse(raw: &str) -> Result<Pattern, Error> {
    if raw.is_empty() || !raw.starts_with('/') {
        return Err(Error::InvalidPattern {
            pattern: raw.to_string(),
            reason: "pattern must be non-empty and start with '/'",
        });
    }
    if raw.contains('?') {
        return Err(Error::InvalidPattern {
            pattern: raw.to_string(),
            reason: "pattern must not contain '?'",
        });
    }

    let parts: Vec<&str> = raw
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let mut segments = Vec::with_capacity(parts.len());
    let last_index = parts.len().checked_sub(1);

    for (i, part) in parts.iter().enumerate() {
        let param_count = part.matches(':').count() + part.matches('*').count();
        if param_count > 1 {
            return Err(Error::InvalidPattern {
                pattern: raw.to_string(),
                reason: "at most one ':' or '*' per segment",
            });
        }

        if let Some(name) = part.strip_prefix('*') {
            if name.is_empty() {
                return Err(Error::InvalidPattern {
                    pattern: raw.to_string(),
                    reason: "wildcard segment must have a non-empty name",
                });
            }
            if Some(i) != last_index {
                return Err(Error::InvalidPattern {
                    pattern: raw.to_string(),
                    reason: "'*' wildcard is only allowed as the final segment",
                });
            }
            segments.push(Segment::Wildcard(name.to_string()));
        } else if let Some(name) = part.strip_prefix(':') {
            if name.is_empty() {
                return Err(Error::InvalidPattern {
                    pattern: raw.to_string(),
                    reason: "parametric segment must have a non-empty name",
                });
            }
            segments.push(Segment::Param(name.to_string()));
        } else if part.contains(':') || part.contains('*') {
            return Err(Error::InvalidPattern {
                pattern: raw.to_string(),
                reason: "':' and '*' must lead a segment, not appear mid-segment",
            });
        } else {
            segments.push(Segment::Literal(part.to_string()));
        }
    }

    Ok(Pattern {
        raw: raw.to_string(),
        segments,
    })
}
