pub mod config;
pub mod level;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod shell;
pub mod textutil;
pub mod wiki;
