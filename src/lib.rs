pub mod actors;
pub mod cache;
pub mod cli;
pub mod error;
pub mod flow;
pub mod github;
pub mod models;
pub mod retry;
pub mod tasks;
pub mod types;
