pub mod connection;
pub mod job;
pub mod message;
pub mod payment;
pub mod post;
pub mod user;
