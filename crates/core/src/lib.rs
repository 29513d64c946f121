//! Domain model for the Showroom 3D asset generation client.
//!
//! Holds the transient entities of one generation attempt (requests,
//! image and model artifacts, reconstruction jobs) and the status state
//! machine. This crate performs no I/O.

pub mod error;
pub mod generation;
pub mod job;
pub mod types;
