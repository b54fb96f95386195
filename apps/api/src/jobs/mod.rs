pub mod applications;
pub mod board;
pub mod handlers;
