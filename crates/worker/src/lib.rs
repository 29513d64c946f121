//! Library half of the `showroom-worker` binary: configuration and
//! command-line parsing, kept out of `main.rs` so they can be tested.

pub mod cli;
pub mod config;
