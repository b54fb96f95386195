pub mod feed;
pub mod handlers;
