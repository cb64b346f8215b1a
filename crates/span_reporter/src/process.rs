//! Process descriptor attached to every outgoing batch.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Process-level tags, ordered by key for stable serialization.
pub type Tags = BTreeMap<String, String>;

/// Service name and tags describing the emitting process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub service_name: String,
    pub tags: Tags,
    /// Maximum tag value length in characters (0 = unlimited)
    #[serde(default)]
    pub max_tag_value_length: usize,
}

impl Process {
    pub fn new(service_name: impl Into<String>, tags: Tags, max_tag_value_length: usize) -> Self {
        Self {
            service_name: service_name.into(),
            tags,
            max_tag_value_length,
        }
    }

    /// Returns the tags with every value cut to `max_tag_value_length` chars.
    ///
    /// Values that already fit are borrowed.
    pub fn truncated_tags(&self) -> BTreeMap<&str, Cow<'_, str>> {
        self.tags
            .iter()
            .map(|(key, value)| (key.as_str(), truncate(value, self.max_tag_value_length)))
            .collect()
    }
}

fn truncate(value: &str, max_length: usize) -> Cow<'_, str> {
    if max_length == 0 {
        return Cow::Borrowed(value);
    }
    match value.char_indices().nth(max_length) {
        Some((cut, _)) => Cow::Owned(value[..cut].to_string()),
        None => Cow::Borrowed(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(max: usize) -> Process {
        let mut tags = Tags::new();
        tags.insert("hostname".to_string(), "worker-0123456789".to_string());
        tags.insert("ip".to_string(), "10.0.0.1".to_string());
        Process::new("checkout", tags, max)
    }

    #[test]
    fn test_zero_max_length_keeps_values() {
        let p = process(0);
        let tags = p.truncated_tags();
        assert_eq!(tags["hostname"], "worker-0123456789");
        assert!(matches!(tags["ip"], Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncates_long_values_only() {
        let p = process(8);
        let tags = p.truncated_tags();
        assert_eq!(tags["hostname"], "worker-0");
        assert_eq!(tags["ip"], "10.0.0.1");
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let mut tags = Tags::new();
        tags.insert("region".to_string(), "zürich-1".to_string());
        let p = Process::new("svc", tags, 3);
        assert_eq!(p.truncated_tags()["region"], "zür");
    }
}
