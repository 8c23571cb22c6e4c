pub mod auth;
pub mod coordinator;
pub mod resolver;
