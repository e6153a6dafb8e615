use std::fmt;

use crate::error::{DbError, DbResult};

/// Slash-separated location in the document tree, e.g. `progress/u1/c1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DocPath {
    segments: Vec<String>,
}

const FORBIDDEN: [char; 5] = ['.', '$', '#', '[', ']'];

impl DocPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> DbResult<Self> {
        if raw.trim_matches('/').is_empty() {
            return Ok(Self::root());
        }
        Self::root().child(raw)
    }

    /// Build a path from parts; each part may itself contain `/`.
    pub fn join<I, S>(parts: I) -> DbResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        parts
            .into_iter()
            .try_fold(Self::root(), |path, part| path.child(part))
    }

    /// Append a relative path. Leading and trailing `/` are trimmed;
    /// interior segments must be non-empty.
    pub fn child(&self, part: impl AsRef<str>) -> DbResult<Self> {
        let part = part.as_ref();
        let trimmed = part.trim_matches('/');
        if trimmed.is_empty() {
            return Err(invalid(part, "empty segment"));
        }
        let mut segments = self.segments.clone();
        for segment in trimmed.split('/') {
            check_segment(part, segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Append exactly one segment. Ids supplied by callers go through here
    /// so they can never address a location outside their own subtree.
    pub fn segment(&self, id: &str) -> DbResult<Self> {
        if id.contains('/') {
            return Err(invalid(id, "'/' is not allowed in a key"));
        }
        check_segment(id, id)?;
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment (the key under the parent), `None` at the root.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

fn check_segment(path: &str, segment: &str) -> DbResult<()> {
    if segment.is_empty() {
        return Err(invalid(path, "empty segment"));
    }
    if let Some(bad) = segment.chars().find(|c| FORBIDDEN.contains(c) || c.is_control()) {
        return Err(invalid(path, &format!("segment '{segment}' contains '{bad}'")));
    }
    Ok(())
}

fn invalid(path: &str, reason: &str) -> DbError {
    DbError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}
