//! The fetch, fallback, cache and classify pipeline.
//!
//! Leaves first: `classifier` and `history` are pure; `fallback_cache` holds the
//! only shared mutable state; `assembler` builds one city; `loader` fans out over
//! the whole catalog.

mod assembler;
mod classifier;
mod fallback_cache;
mod history;
mod loader;

pub use assembler::*;
pub use classifier::*;
pub use fallback_cache::*;
pub use history::{generate_history, HistoryProfile, DEFAULT_HISTORY_DAYS};
pub use loader::*;
