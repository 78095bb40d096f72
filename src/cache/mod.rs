//! In-process response cache for match service reads.
//!
//! Entries expire lazily: a read compares the entry age against the TTL the caller
//! passes in, so one store can hold values with different lifetimes (catalog lists and
//! site statistics). There is no background sweeper and no eviction beyond expiry.
//!
//! ```toml
//! [cache]
//! ttl_seconds = 5
//! stats_ttl_seconds = 10
//! serve_stale = true
//! ```

mod config;
mod lock;
mod store;

pub use config::{CacheConfig, StalePolicy};
pub use store::{CacheOrigin, CacheRead, ResponseCache};
