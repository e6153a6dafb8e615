// ============================================================================
// Entity Routing
// ============================================================================
//
// Maps a logical entity name to the model of the store that owns it:
// - registry: every model, keyed by (store, entity)
// - router:   routing-table lookup + lazy store connection
//
// ============================================================================

mod registry;
mod router;

pub use registry::ModelRegistry;
pub use router::{RouteStatus, Router};
