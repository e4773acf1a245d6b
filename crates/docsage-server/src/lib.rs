//! DocSage HTTP transport.
//!
//! Handlers only validate input, move blocking work off the runtime and map
//! results onto the JSON shapes clients expect. All pipeline behavior lives in
//! `docsage-runtime`.

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
