//! Client for the remote 3D generation service.
//!
//! Provides the [`RemoteJobService`] trait the orchestrator depends on,
//! an HTTP implementation over [`reqwest`], typed wire messages, a
//! normalizer for the service's inconsistent response envelopes, and
//! translation of presigned display URLs into canonical storage
//! locators.

pub mod api;
pub mod envelope;
pub mod error;
pub mod locator;
pub mod messages;
pub mod service;

pub use api::RemoteJobApi;
pub use error::RemoteError;
pub use locator::{to_locator, Locator, LocatorError};
pub use service::{ImageSource, JobStatusReport, RemoteJobService};
