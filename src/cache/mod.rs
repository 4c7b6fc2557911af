//! In-memory result caching for pipeline modules.
//!
//! - `ModuleCache`: fingerprint → value store for one module instance
//! - `NullCache` / `CacheHandle`: the capability a module holds, real or no-op
//! - `CacheRegistry`: one cache per module, hit reset and pruning per run
//!
//! A top-level run is bracketed by `reset_all_hits` and `prune_all`; entries
//! not looked up during the run are dropped so deleted or renamed inputs do
//! not pin memory. Nothing here is persisted.

mod handle;
mod module;
mod registry;

pub use handle::{CacheHandle, NullCache};
pub use module::{CacheValue, ModuleCache};
pub use registry::{CacheRegistry, PruneReport};
