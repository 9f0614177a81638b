use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Compiled set of deny patterns applied to discovered links
///
/// Each pattern is a regular expression searched in the link's path plus
/// query string (`/path?query`). A query string is written with its leading
/// `?`, so the default `\?` pattern rejects every link that carries one.
#[derive(Debug, Clone, Default)]
pub struct DenyPatterns {
    patterns: Vec<Regex>,
}

impl DenyPatterns {
    /// Compiles the given patterns
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref())
                    .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", p.as_ref(), e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns the first pattern that matches the URL, if any
    pub fn matching(&self, url: &Url) -> Option<&str> {
        let target = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        self.patterns
            .iter()
            .find(|re| re.is_match(&target))
            .map(|re| re.as_str())
    }

    #[cfg(test)]
    fn is_denied(&self, url: &Url) -> bool {
        self.matching(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
