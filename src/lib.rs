pub mod app;
pub mod cli;
pub mod cli_source;
pub mod command_builder;
pub mod config;
pub mod error_handler;
pub mod executor;
pub mod parameter_spec;
pub mod parameters;
pub mod progress;
pub mod report;
pub mod runner;
pub mod store;
pub mod telemetry;
