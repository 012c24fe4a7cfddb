//! Job records for the four job kinds.

use serde::{Deserialize, Serialize};

use super::item::{JobMeta, impl_queue_item};
use super::kind::JobKind;

/// Download a remote file and store it in the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchJob {
    /// Identity and status.
    #[serde(flatten)]
    pub meta: JobMeta,
    /// URL to download.
    pub remote_url: String,
    /// Object name to store the download under.
    pub destination_name: String,
    /// Folder prefix inside the bucket; empty for the bucket root.
    #[serde(default)]
    pub target_folder: String,
}

impl FetchJob {
    /// Create a new, not yet queued, fetch job.
    pub fn new(
        remote_url: impl Into<String>,
        destination_name: impl Into<String>,
        target_folder: impl Into<String>,
    ) -> Self {
        Self {
            meta: JobMeta::default(),
            remote_url: remote_url.into(),
            destination_name: destination_name.into(),
            target_folder: target_folder.into(),
        }
    }

    /// Object key the download is stored under.
    pub fn destination_key(&self) -> String {
        if self.target_folder.is_empty() {
            self.destination_name.clone()
        } else if self.target_folder.ends_with('/') {
            format!("{}{}", self.target_folder, self.destination_name)
        } else {
            format!("{}/{}", self.target_folder, self.destination_name)
        }
    }
}

impl_queue_item!(FetchJob, JobKind::Fetch, |job| format!(
    "{} -> {}",
    job.remote_url,
    job.destination_key()
));

/// Object-targeting payload shared by the ACL and delete kinds.
macro_rules! object_job {
    ($(#[$doc:meta])* $name:ident, $kind:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            /// Identity and status.
            #[serde(flatten)]
            pub meta: JobMeta,
            /// Object key (or folder prefix) in the bucket.
            pub file_path: String,
            /// Display name of the object.
            #[serde(default)]
            pub file_name: String,
        }

        impl $name {
            /// Create a new, not yet queued, job for `file_path`.
            pub fn new(file_path: impl Into<String>, file_name: impl Into<String>) -> Self {
                Self {
                    meta: JobMeta::default(),
                    file_path: file_path.into(),
                    file_name: file_name.into(),
                }
            }
        }

        impl_queue_item!($name, $kind, |job| job.file_path.clone());
    };
}

object_job!(
    /// Make an object publicly readable.
    PublishJob,
    JobKind::Publish
);

object_job!(
    /// Make an object private again.
    UnpublishJob,
    JobKind::Unpublish
);

object_job!(
    /// Delete an object, or every object under a folder prefix.
    DeleteJob,
    JobKind::Delete
);
