//! The four job kinds sharing the queue engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of background job; each kind owns one store partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Download a remote URL and store it in the bucket.
    Fetch,
    /// Make an object publicly readable.
    Publish,
    /// Make an object private.
    Unpublish,
    /// Delete an object or folder.
    Delete,
}

impl JobKind {
    /// All kinds, in scheduling order.
    pub const ALL: [JobKind; 4] = [Self::Fetch, Self::Publish, Self::Unpublish, Self::Delete];

    /// Name of the store partition holding this kind's items.
    pub fn partition(&self) -> &'static str {
        match self {
            Self::Fetch => "queue_upload",
            Self::Publish => "queue_publish",
            Self::Unpublish => "queue_unpublish",
            Self::Delete => "queue_delete",
        }
    }

    /// Short lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
            Self::Delete => "delete",
        }
    }

    /// Partition names for every kind, used when opening the store.
    pub fn partitions() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.partition()).collect()
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
