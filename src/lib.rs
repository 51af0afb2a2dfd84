pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod git;
pub mod model;
pub mod parser;
pub mod rewrite;
pub mod upload;
