pub mod context;
pub mod health;
