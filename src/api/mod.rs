//! API layer - HTTP endpoints over the engine

pub mod health;
pub mod middleware;
pub mod router;
pub mod state;
pub mod types;
pub mod v1;

pub use router::{cors_layer, create_router};
pub use state::AppState;
