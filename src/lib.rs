//! Parallel, symlink-safe recursive ownership changes across trees with
//! millions of entries. `main.rs` is a thin CLI shim around the engine
//! exposed here.

pub mod cli;
pub mod config;
pub mod counters;
pub mod diagnostics;
pub mod dirread;
pub mod error;
pub mod exclude;
pub mod extreme_readdir;
pub mod filetype;
pub mod ids;
pub mod mutator;
pub mod ownerspec;
pub mod pool;
pub mod queue;
pub mod stats_printer;
pub mod task;
pub mod walker;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;
