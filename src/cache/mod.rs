//! Article cache.
//!
//! Entries live in a remote or in-process [`KvStore`] as JSON text keyed by
//! request path. [`CacheAside`] implements the read-through and write-through
//! pattern used by the article handlers and the revalidation webhook.

mod aside;
pub mod codec;
mod keys;
mod store;

pub use aside::{CacheAside, CacheError, Lookup};
pub use codec::CodecError;
pub use keys::CacheKey;
pub use store::{KvStore, MemoryKvStore, StoreError};
