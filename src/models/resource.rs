//! Resource models: canonical, long-lived schedule artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Tag;

/// Natural key of a resource: canonical path plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentity {
    pub path: String,
    pub name: String,
}

impl ResourceIdentity {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.path)
    }
}

/// A resource as stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: i32,
    pub name: String,
    pub path: String,
    pub metadata: Option<serde_json::Value>,
    pub deprecated: bool,
    pub last_update: DateTime<Utc>,
    pub tags: Vec<Tag>,
}

impl Resource {
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(&self.path, &self.name)
    }
}

/// Desired state of a resource, assembled before a single catalog write.
///
/// The classifier produces a plan; the catalog applies it atomically
/// (create or update, clear the deprecated flag, replace the tag set).
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePlan {
    pub identity: ResourceIdentity,
    pub metadata: Option<serde_json::Value>,
    pub tags: Vec<Tag>,
}

impl ResourcePlan {
    pub fn builder(identity: ResourceIdentity) -> ResourcePlanBuilder {
        ResourcePlanBuilder {
            identity,
            metadata: None,
            tags: Vec::new(),
        }
    }
}

/// Builder for [`ResourcePlan`].
#[derive(Debug)]
pub struct ResourcePlanBuilder {
    identity: ResourceIdentity,
    metadata: Option<serde_json::Value>,
    tags: Vec<Tag>,
}

impl ResourcePlanBuilder {
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    pub fn tags(self, tags: impl IntoIterator<Item = Tag>) -> Self {
        tags.into_iter().fold(self, |builder, tag| builder.tag(tag))
    }

    pub fn build(self) -> ResourcePlan {
        ResourcePlan {
            identity: self.identity,
            metadata: self.metadata,
            tags: self.tags,
        }
    }
}
