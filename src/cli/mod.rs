//! CLI module for weavr - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for submitting goals,
//! inspecting jobs, resuming parked jobs and browsing the tool catalog.

pub mod commands;

pub use commands::Cli;
