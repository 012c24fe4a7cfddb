//! Job handlers for the four job kinds.

pub mod delete;
pub mod fetch;
pub mod publish;
pub mod unpublish;

pub use delete::DeleteJobHandler;
pub use fetch::FetchJobHandler;
pub use publish::PublishJobHandler;
pub use unpublish::UnpublishJobHandler;
