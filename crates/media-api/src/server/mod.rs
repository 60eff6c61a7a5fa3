//! HTTP server: shared state and request routing.

mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
