//! Catalog filtering predicates.

use crate::config::FilterConfig;
use crate::error::{Error, Result};
use crate::types::FileDescriptor;
use regex::Regex;
use std::collections::HashSet;

/// A predicate deciding whether a descriptor takes part in the batch
///
/// Implementations must be free of side effects: the filter stops at the first
/// rejecting predicate.
pub trait Condition: Send + Sync {
    /// Whether the descriptor should be processed
    fn accepts(&self, descriptor: &FileDescriptor) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}

/// Accepts paths matching at least one pattern
pub struct IncludePattern {
    patterns: Vec<Regex>,
}

impl IncludePattern {
    /// Compile the given patterns
    pub fn new(patterns: &[String]) -> Result<Self> {
        Ok(Self {
            patterns: compile(patterns, "include-patterns")?,
        })
    }
}

impl Condition for IncludePattern {
    fn accepts(&self, descriptor: &FileDescriptor) -> bool {
        self.patterns.iter().any(|re| re.is_match(&descriptor.path))
    }

    fn name(&self) -> &str {
        "include-patterns"
    }
}

/// Rejects paths matching any pattern
pub struct ExcludePattern {
    patterns: Vec<Regex>,
}

impl ExcludePattern {
    /// Compile the given patterns
    pub fn new(patterns: &[String]) -> Result<Self> {
        Ok(Self {
            patterns: compile(patterns, "exclude-patterns")?,
        })
    }
}

impl Condition for ExcludePattern {
    fn accepts(&self, descriptor: &FileDescriptor) -> bool {
        !self.patterns.iter().any(|re| re.is_match(&descriptor.path))
    }

    fn name(&self) -> &str {
        "exclude-patterns"
    }
}

/// Accepts only the listed catalog keys
pub struct KeyList {
    keys: HashSet<String>,
}

impl KeyList {
    /// Build from a list of keys
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl Condition for KeyList {
    fn accepts(&self, descriptor: &FileDescriptor) -> bool {
        self.keys.contains(&descriptor.key)
    }

    fn name(&self) -> &str {
        "only-keys"
    }
}

fn compile(patterns: &[String], key: &str) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|e| Error::config(key, format!("invalid pattern '{p}': {e}"))))
        .collect()
}

/// Ordered list of conditions; a descriptor is eligible only if all accept it
#[derive(Default)]
pub struct ConditionFilter {
    conditions: Vec<Box<dyn Condition>>,
}

impl ConditionFilter {
    /// An empty filter, which accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a condition; conditions run in insertion order
    pub fn with(mut self, condition: impl Condition + 'static) -> Self {
        self.conditions.push(Box::new(condition));
        self
    }

    /// Build the condition list described by the config
    ///
    /// Order: key list, include patterns, exclude patterns. Empty sections add
    /// no condition.
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        let mut filter = Self::new();
        if !config.only_keys.is_empty() {
            filter = filter.with(KeyList::new(config.only_keys.iter().cloned()));
        }
        if !config.include_patterns.is_empty() {
            filter = filter.with(IncludePattern::new(&config.include_patterns)?);
        }
        if !config.exclude_patterns.is_empty() {
            filter = filter.with(ExcludePattern::new(&config.exclude_patterns)?);
        }
        Ok(filter)
    }

    /// AND over all conditions, stopping at the first rejection
    pub fn accepts(&self, descriptor: &FileDescriptor) -> bool {
        match self.conditions.iter().find(|c| !c.accepts(descriptor)) {
            Some(condition) => {
                tracing::debug!(
                    key = %descriptor.key,
                    condition = condition.name(),
                    "descriptor rejected"
                );
                false
            }
            None => true,
        }
    }

    /// Number of registered conditions
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether no conditions are registered
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn descriptor(key: &str, path: &str) -> FileDescriptor {
        FileDescriptor::new(key, format!("http://host/{path}"), path)
    }

    struct Counting {
        verdict: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Condition for Counting {
        fn accepts(&self, _: &FileDescriptor) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = ConditionFilter::new();
        assert!(filter.accepts(&descriptor("a", "a.dat")));
    }

    #[test]
    fn stops_at_first_rejecting_condition() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let filter = ConditionFilter::new()
            .with(Counting {
                verdict: false,
                calls: first.clone(),
            })
            .with(Counting {
                verdict: true,
                calls: second.clone(),
            });

        assert!(!filter.accepts(&descriptor("a", "a.dat")));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(
            second.load(Ordering::SeqCst),
            0,
            "conditions after a rejection must not run"
        );
    }

    #[test]
    fn all_conditions_must_accept() {
        let filter = ConditionFilter::new()
            .with(IncludePattern::new(&[r"^system/".to_string()]).unwrap())
            .with(ExcludePattern::new(&[r"\.bak$".to_string()]).unwrap());

        assert!(filter.accepts(&descriptor("1", "system/l2.ini")));
        assert!(!filter.accepts(&descriptor("2", "system/l2.ini.bak")));
        assert!(!filter.accepts(&descriptor("3", "maps/20_21.unr")));
    }

    #[test]
    fn from_config_builds_conditions_in_order() {
        let config = FilterConfig {
            include_patterns: vec![r"\.dat$".to_string()],
            exclude_patterns: vec![],
            only_keys: vec!["keep".to_string()],
        };
        let filter = ConditionFilter::from_config(&config).unwrap();

        assert_eq!(filter.len(), 2);
        assert!(filter.accepts(&descriptor("keep", "x.dat")));
        assert!(!filter.accepts(&descriptor("drop", "x.dat")));
        assert!(!filter.accepts(&descriptor("keep", "x.ini")));
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let config = FilterConfig {
            exclude_patterns: vec!["(".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            ConditionFilter::from_config(&config),
            Err(Error::Config { .. })
        ));
    }
}
