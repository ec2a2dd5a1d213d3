//! Named Key Patterns
//!
//! A [`KeyClassifier`] holds an ordered list of named regular expressions.
//! Classifying a key returns the name of the first pattern that matches it,
//! so more specific patterns must be listed before broader ones.
//!
//! All patterns are compiled into one [`RegexSet`] so a key is scanned once
//! regardless of how many patterns are configured. The set reports matches by
//! index, and the lowest index is the highest priority.

use regex::{Regex, RegexSet};
use thiserror::Error;

/// Errors raised while building a classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// A configured pattern is not a valid regular expression
    #[error("invalid pattern {pattern:?} for {name:?}: {source}")]
    InvalidPattern {
        name: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The combined pattern set could not be built
    #[error("failed to compile pattern set: {0}")]
    PatternSet(#[from] regex::Error),
}

/// A regular expression bound to the logical name it reports under.
#[derive(Debug, Clone)]
pub struct NamedPattern {
    name: String,
    regex: Regex,
}

impl NamedPattern {
    /// Compiles `pattern`, labelling matches with `name`.
    pub fn new(pattern: &str, name: impl Into<String>) -> Result<Self, ClassifierError> {
        let name = name.into();
        let regex = Regex::new(pattern).map_err(|source| ClassifierError::InvalidPattern {
            name: name.clone(),
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { name, regex })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

/// Maps raw keys to logical names by first-match over ordered patterns.
///
/// The classifier is immutable once built and can be shared freely between
/// threads.
///
/// # Example
///
/// ```
/// use keyheat::classifier::KeyClassifier;
///
/// let classifier = KeyClassifier::new([
///     ("^user_.*", "user"),
///     ("^session:", "session"),
/// ]).unwrap();
///
/// assert_eq!(classifier.classify("user_42"), Some("user"));
/// assert_eq!(classifier.classify("session:abc"), Some("session"));
/// assert_eq!(classifier.classify("config"), None);
/// ```
#[derive(Debug, Clone)]
pub struct KeyClassifier {
    patterns: Vec<NamedPattern>,
    set: RegexSet,
}

impl Default for KeyClassifier {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            set: RegexSet::empty(),
        }
    }
}

impl KeyClassifier {
    /// Builds a classifier from `(pattern, name)` pairs in priority order.
    ///
    /// Fails on the first pattern that does not compile.
    pub fn new<I, P, N>(patterns: I) -> Result<Self, ClassifierError>
    where
        I: IntoIterator<Item = (P, N)>,
        P: AsRef<str>,
        N: Into<String>,
    {
        let patterns = patterns
            .into_iter()
            .map(|(pattern, name)| NamedPattern::new(pattern.as_ref(), name))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_patterns(patterns)
    }

    /// Builds a classifier from already compiled patterns.
    pub fn from_patterns(patterns: Vec<NamedPattern>) -> Result<Self, ClassifierError> {
        let set = RegexSet::new(patterns.iter().map(NamedPattern::pattern))?;
        Ok(Self { patterns, set })
    }

    /// Returns the name of the first pattern matching `key`.
    pub fn classify(&self, key: &str) -> Option<&str> {
        self.set
            .matches(key)
            .iter()
            .next()
            .map(|index| self.patterns[index].name())
    }

    /// True when no patterns are configured.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn patterns(&self) -> &[NamedPattern] {
        &self.patterns
    }
}
