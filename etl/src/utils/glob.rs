use common::{Error, Result};
use regex::Regex;

/// A Spark-style input glob such as `song_data/*/*/*`, evaluated one path
/// segment at a time against object keys relative to an input root.
///
/// A key matches when its leading segments match every pattern segment and
/// it either ends there (the pattern named a file) or has exactly one more
/// segment (the pattern named a directory, whose files are read).
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Wildcard(Regex),
}

impl Segment {
    fn parse(segment: &str) -> Result<Self> {
        if !segment.contains(['*', '?']) {
            return Ok(Segment::Literal(segment.to_string()));
        }

        let mut expr = String::from("^");
        for ch in segment.chars() {
            match ch {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| {
            Error::InvalidInput(format!("Invalid path pattern segment '{}': {}", segment, e))
        })?;
        Ok(Segment::Wildcard(regex))
    }

    fn matches(&self, part: &str) -> bool {
        match self {
            Segment::Literal(literal) => literal == part,
            Segment::Wildcard(regex) => regex.is_match(part),
        }
    }
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Segment::parse)
            .collect::<Result<Vec<_>>>()?;

        if segments.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Path pattern '{}' has no segments",
                pattern
            )));
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Leading segments without wildcards; listing can start below them.
    pub fn literal_prefix(&self) -> Vec<&str> {
        self.segments
            .iter()
            .map_while(|segment| match segment {
                Segment::Literal(literal) => Some(literal.as_str()),
                Segment::Wildcard(_) => None,
            })
            .collect()
    }

    pub fn matches<S: AsRef<str>>(&self, parts: &[S]) -> bool {
        let depth = self.segments.len();
        if parts.len() != depth && parts.len() != depth + 1 {
            return false;
        }

        // `_SUCCESS`, `.crc` and friends
        if parts.iter().any(|p| is_hidden(p.as_ref())) {
            return false;
        }

        self.segments
            .iter()
            .zip(parts)
            .all(|(segment, part)| segment.matches(part.as_ref()))
    }
}

fn is_hidden(part: &str) -> bool {
    part.starts_with('.') || part.starts_with('_')
}
