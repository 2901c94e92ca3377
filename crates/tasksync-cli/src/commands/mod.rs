pub mod common;
pub mod completions;
pub mod config;
pub mod history;
pub mod merge;
pub mod purge;
pub mod sync;
