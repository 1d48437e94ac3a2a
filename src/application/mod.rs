//! Application services: cache-aside article reads and change-event revalidation.

pub mod articles;
pub mod error;
pub mod repos;
pub mod revalidate;
