//! Resource kinds and their failure policies

use std::fmt;

/// What to do when creating a resource of a given kind is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the run and exit non-zero
    Abort,
    /// Log the failure and move on
    Continue,
}

/// Kind of Quickwit resource managed by the bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Index,
    Source,
}

impl ResourceKind {
    /// Top-level field carrying the resource identifier
    pub fn id_field(self) -> &'static str {
        match self {
            ResourceKind::Index => "index_id",
            ResourceKind::Source => "source_id",
        }
    }

    /// Nothing works without the index, while sources may be managed elsewhere
    pub fn failure_policy(self) -> FailurePolicy {
        match self {
            ResourceKind::Index => FailurePolicy::Abort,
            ResourceKind::Source => FailurePolicy::Continue,
        }
    }

    /// True if definitions of this kind live under a parent index
    pub fn has_parent(self) -> bool {
        matches!(self, ResourceKind::Source)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Index => write!(f, "index"),
            ResourceKind::Source => write!(f, "source"),
        }
    }
}
