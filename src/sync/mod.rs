// ============================================================================
// Cross-Store Sync
// ============================================================================
//
// Propagates (optionally projected) records between stores after a primary
// write, driven by the configured rules:
// - onCreate:   upsert into the destination, keyed by the source record id
// - onComplete: append to the destination as a new entry
//
// Best-effort by contract: a failed destination write is logged and counted,
// never returned to the caller of the primary write.
//
// ============================================================================

mod engine;
mod rule;

pub use engine::{project_fields, SyncEngine, SyncReport};
pub use rule::{SyncRule, SyncTrigger};
