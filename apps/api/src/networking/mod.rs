pub mod connections;
pub mod handlers;
