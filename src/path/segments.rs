//! Raw path segments as received from the transport.

use crate::error::ResolutionError;

/// Separator between segments in a request path.
pub const SEPARATOR: char = '/';

/// True when the segment is an unsigned decimal literal (`^[0-9]+$`).
pub fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a numeric segment as an identifier. Ids are stored as signed 64-bit keys,
/// so values above `i64::MAX` are rejected.
pub fn parse_id(segment: &str) -> Result<u64, ResolutionError> {
    segment
        .parse::<u64>()
        .ok()
        .filter(|n| *n <= i64::MAX as u64)
        .ok_or_else(|| ResolutionError::IdentifierOutOfRange(segment.to_string()))
}

/// Ordered, non-empty list of path segments. Segments are kept verbatim (no decoding, no reordering).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathSegments(Vec<String>);

impl PathSegments {
    /// Build from an explicit list. Empty list is `EmptyPath`; an empty segment is malformed.
    pub fn new<I, S>(segments: I) -> Result<Self, ResolutionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(ResolutionError::EmptyPath);
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ResolutionError::MalformedPath(segments.join("/")));
        }
        Ok(PathSegments(segments))
    }

    /// Split a raw `/`-separated path. Empty segments (leading, trailing or doubled slashes) are dropped.
    pub fn parse(path: &str) -> Result<Self, ResolutionError> {
        let segments: Vec<String> = path
            .split(SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if segments.is_empty() {
            return Err(ResolutionError::EmptyPath);
        }
        Ok(PathSegments(segments))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn is_numeric_at(&self, index: usize) -> bool {
        self.get(index).is_some_and(is_numeric)
    }

    /// The whole path rejoined with the separator.
    pub fn full_path(&self) -> String {
        join(&self.0)
    }
}

/// Join segments with the separator.
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("/")
}
