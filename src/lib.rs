pub mod commands;
pub mod error;
pub mod executor;
pub mod output;
pub mod package;
pub mod plan;
pub mod registry;
pub mod runtime;
