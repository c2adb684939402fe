pub mod cache;
pub mod client;
pub mod error;
pub mod store;
pub mod types;
