//! functional simulator of set-associative caches with per-set LRU replacement.

mod bin;
pub mod cache;
pub mod config;
pub mod geometry;
pub mod observer;
pub mod sim;
pub mod trace;

#[cfg(feature = "stat")]
pub mod stat;

pub use cache::{AccessKind, AccessOutcome, Cache, CacheError, PhysAddr, Statistics};
