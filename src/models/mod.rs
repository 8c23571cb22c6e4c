pub mod account;
pub mod job;
pub mod query;
pub mod resolution;
