//! Capability contract shared by every queued record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use s3browser_core::types::JobId;

use super::kind::JobKind;
use super::status::JobStatus;

/// Identity and status common to every job record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMeta {
    /// Identity assigned by the queue at push time.
    #[serde(default)]
    pub id: JobId,
    /// Current lifecycle status.
    #[serde(default)]
    pub status: JobStatus,
}

/// A record the generic queue can store, claim and update.
///
/// The queue only touches identity and status; everything else is
/// kind-specific payload carried through serialization untouched.
pub trait QueueItem:
    Serialize + DeserializeOwned + Clone + Send + Sync + std::fmt::Debug + 'static
{
    /// The job kind, which also binds the item to its store partition.
    const KIND: JobKind;

    /// Shared identity/status header.
    fn meta(&self) -> &JobMeta;

    /// Mutable access to the shared header.
    fn meta_mut(&mut self) -> &mut JobMeta;

    /// Identity of the item.
    fn id(&self) -> &JobId {
        &self.meta().id
    }

    /// Assign the identity.
    fn set_id(&mut self, id: JobId) {
        self.meta_mut().id = id;
    }

    /// Current status.
    fn status(&self) -> JobStatus {
        self.meta().status
    }

    /// Overwrite the status.
    fn set_status(&mut self, status: JobStatus) {
        self.meta_mut().status = status;
    }

    /// Short human-readable label for log lines.
    fn describe(&self) -> String;
}

/// Implement [`QueueItem`] for a record with a flattened `meta` field.
macro_rules! impl_queue_item {
    ($ty:ty, $kind:expr, |$item:ident| $describe:expr) => {
        impl $crate::job::item::QueueItem for $ty {
            const KIND: $crate::job::kind::JobKind = $kind;

            fn meta(&self) -> &$crate::job::item::JobMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut $crate::job::item::JobMeta {
                &mut self.meta
            }

            fn describe(&self) -> String {
                let $item = self;
                $describe
            }
        }
    };
}

pub(crate) use impl_queue_item;
