//! Domain model: articles and the change notifications the origin emits for them.

pub mod articles;
pub mod events;

pub use articles::{Article, ArticleId};
pub use events::{ChangeEvent, ChangeKind};
