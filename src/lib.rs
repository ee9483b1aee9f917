pub mod config;
pub mod engine;
pub mod http;
pub mod humanize;
pub mod runner;
pub mod source;
