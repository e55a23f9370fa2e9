//! Goal specifications
//!
//! A GoalSpec is the declarative statement of what to retrieve, from where,
//! and under what constraints. Goals are immutable once accepted into a job;
//! clarification produces a new version linked to its predecessor via
//! `derived_from`, never an in-place edit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::generate_goal_id;

/// A single field the user wants extracted from the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Name of the field to extract (e.g. "price", "title")
    pub name: String,
    /// Description of what this field represents
    #[serde(default)]
    pub description: String,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }
}

/// Declarative statement of what data to retrieve and under what constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalSpec {
    /// Stable identifier for this goal version
    pub goal_id: String,

    /// Previous goal version this one was derived from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<String>,

    /// Original user query that produced this goal
    #[serde(default)]
    pub query: String,

    /// Target URLs or site descriptions to retrieve from
    pub targets: Vec<String>,

    /// Data fields to extract
    pub fields: Vec<FieldSpec>,

    /// Technical/behavioral requirement tags (e.g. "javascript_rendering",
    /// "pagination", "anti_block")
    #[serde(default)]
    pub requirements: Vec<String>,

    /// Additional constraints (filters, time windows)
    #[serde(default)]
    pub constraints: BTreeMap<String, serde_json::Value>,
}

impl GoalSpec {
    /// Create a goal with a fresh id and the given targets and fields
    pub fn new(targets: Vec<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            goal_id: generate_goal_id(),
            derived_from: None,
            query: String::new(),
            targets,
            fields,
            requirements: Vec::new(),
            constraints: BTreeMap::new(),
        }
    }

    /// Builder-style requirement tag
    pub fn with_requirement(mut self, tag: impl Into<String>) -> Self {
        self.requirements.push(tag.into());
        self
    }

    /// Builder-style user query
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// True if the goal carries the given requirement tag
    pub fn requires(&self, tag: &str) -> bool {
        self.requirements.iter().any(|r| r == tag)
    }

    /// Names of all requested fields, in declaration order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Produce a revised goal: a new version with a fresh id, linked back to
    /// this one. The caller supplies the revised content; identity and
    /// lineage are managed here.
    pub fn revise(&self) -> GoalSpec {
        let mut revised = self.clone();
        revised.derived_from = Some(self.goal_id.clone());
        revised.goal_id = generate_goal_id();
        revised
    }

    /// Host portion of the first target, used for history matching
    pub fn primary_host(&self) -> Option<&str> {
        let target = self.targets.first()?;
        let stripped = target
            .strip_prefix("https://")
            .or_else(|| target.strip_prefix("http://"))
            .unwrap_or(target);
        Some(stripped.split('/').next().unwrap_or(stripped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_goal() -> GoalSpec {
        GoalSpec::new(
            vec!["https://example.com/products".to_string()],
            vec![FieldSpec::new("price"), FieldSpec::new("title")],
        )
        .with_requirement("javascript_rendering")
        .with_query("get prices and titles from example.com")
    }

    #[test]
    fn test_goal_has_fresh_id() {
        let goal = sample_goal();
        assert!(goal.goal_id.starts_with("goal-"));
        assert!(goal.derived_from.is_none());
    }

    #[test]
    fn test_requires() {
        let goal = sample_goal();
        assert!(goal.requires("javascript_rendering"));
        assert!(!goal.requires("pagination"));
    }

    #[test]
    fn test_field_names() {
        let goal = sample_goal();
        assert_eq!(goal.field_names(), vec!["price", "title"]);
    }

    #[test]
    fn test_revise_links_predecessor() {
        let goal = sample_goal();
        let revised = goal.revise();
        assert_ne!(revised.goal_id, goal.goal_id);
        assert_eq!(revised.derived_from.as_deref(), Some(goal.goal_id.as_str()));
        // Content is carried over for the caller to adjust
        assert_eq!(revised.fields, goal.fields);
    }

    #[test]
    fn test_primary_host_strips_scheme_and_path() {
        let goal = sample_goal();
        assert_eq!(goal.primary_host(), Some("example.com"));
    }

    #[test]
    fn test_primary_host_plain_description() {
        let goal = GoalSpec::new(vec!["some shop".to_string()], vec![FieldSpec::new("price")]);
        assert_eq!(goal.primary_host(), Some("some shop"));
    }

    #[test]
    fn test_goal_serde_round_trip() {
        let goal = sample_goal();
        let json = serde_json::to_string(&goal).unwrap();
        let back: GoalSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back.goal_id, goal.goal_id);
        assert_eq!(back.fields, goal.fields);
        assert_eq!(back.requirements, goal.requirements);
    }
}
