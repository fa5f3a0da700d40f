//! The dashboard's HTTP surface.
//!
//! Four endpoint groups: reading the latest cached artifact, forcing a
//! refresh, the generic proxy passthrough, and the shared-secret guarded
//! auto-refresh trigger. Read requests never touch the upstream; refreshes
//! run to completion within the triggering request's lifetime.

mod error;
mod routes;
mod state;

pub use routes::router;
pub use state::AppState;
