//! # Interface Layer
//!
//! Command parsing and handlers invoked by the `CommandRouter`.

pub mod commands;
