//! Classification map: inventory tag -> monitoring groups and templates

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Groups and templates attached to every device of one class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRule {
    #[serde(default)]
    pub groups: BTreeSet<u64>,
    #[serde(default)]
    pub templates: BTreeSet<u64>,
}

/// Read-only lookup from classification tag to [`ClassRule`]
///
/// Rules are stored as configured. The sentinel group is kept apart and
/// merged into a host's groups by the applier on create and group updates.
#[derive(Debug, Clone)]
pub struct ClassificationMap {
    rules: BTreeMap<String, ClassRule>,
    sentinel: u64,
}

impl ClassificationMap {
    pub fn new(rules: BTreeMap<String, ClassRule>, sentinel: u64) -> Self {
        Self { rules, sentinel }
    }

    /// Recognized tags, in sorted order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn rule(&self, tag: &str) -> Option<&ClassRule> {
        self.rules.get(tag)
    }

    pub fn is_recognized(&self, tag: &str) -> bool {
        self.rules.contains_key(tag)
    }

    /// The managed-by-sync group id
    pub fn sentinel(&self) -> u64 {
        self.sentinel
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> ClassificationMap {
        let mut rules = BTreeMap::new();
        rules.insert(
            "router".to_string(),
            ClassRule {
                groups: BTreeSet::from([5]),
                templates: BTreeSet::from([10]),
            },
        );
        rules.insert("switch".to_string(), ClassRule::default());
        ClassificationMap::new(rules, 42)
    }

    #[test]
    fn test_tags_sorted() {
        assert_eq!(map().tags().collect::<Vec<_>>(), vec!["router", "switch"]);
    }

    #[test]
    fn test_rules_keep_configured_groups() {
        let map = map();
        assert_eq!(map.rule("router").unwrap().groups, BTreeSet::from([5]));
        assert!(map.rule("switch").unwrap().groups.is_empty());
        assert_eq!(map.sentinel(), 42);
    }

    #[test]
    fn test_unknown_tag() {
        let map = map();
        assert!(map.rule("firewall").is_none());
        assert!(!map.is_recognized("firewall"));
        assert!(map.is_recognized("router"));
        assert_eq!(map.len(), 2);
    }
}
