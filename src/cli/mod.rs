//! CLI module for Rivet
//!
//! Handles command-line argument parsing; engine configuration lives in
//! `crate::config`.

pub mod args;

pub use args::{Args, Commands, ConfigCommand, GapsCommand};
