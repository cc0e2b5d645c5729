pub mod config;
pub mod database;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
pub mod utils;

pub use routes::build_router;
pub use state::AppState;
