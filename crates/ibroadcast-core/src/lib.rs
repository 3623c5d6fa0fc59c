//! Library model, normalization, caching and data access for the iBroadcast client.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod library;
pub mod manager;
pub mod normalize;
pub mod platform;
pub mod pool;
pub mod search;
pub mod token;
pub mod view;

pub use error::{ApiError, CacheError, LoadError, NormalizeError, PoolError};
pub use library::LibrarySnapshot;
pub use manager::{DataManager, Generation, LoadMode, LoadOutcome, LoadSource, RequestKind};
