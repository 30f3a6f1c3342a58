pub mod config;
pub mod fetch;
pub mod handlers;
pub mod humanize;
pub mod observability;
