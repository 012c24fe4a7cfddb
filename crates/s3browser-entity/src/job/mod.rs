//! Background job domain entities.

pub mod item;
pub mod kind;
pub mod model;
pub mod status;

pub use item::{JobMeta, QueueItem};
pub use kind::JobKind;
pub use model::{DeleteJob, FetchJob, PublishJob, UnpublishJob};
pub use status::JobStatus;
