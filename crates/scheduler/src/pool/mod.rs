//! Dynamically sized worker pool.
//!
//! Split into focused submodules:
//! - `core`: WorkerPool struct, scaling, membership and shutdown
//! - `worker`: the per-worker polling loop

mod core;
mod worker;
#[cfg(test)]
mod tests;

pub use self::core::{PoolControl, WorkerPool};
