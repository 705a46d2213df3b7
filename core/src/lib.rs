pub mod api;
pub mod config;
pub mod error;
pub mod filter;
pub mod launcher;
pub mod publisher;
pub mod reader;
pub mod store;
pub mod task;
pub mod worker;
