use crate::locator::LocatorError;

/// Errors from the remote service layer.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status, either on the HTTP
    /// response or inside a proxy envelope.
    #[error("Remote API error ({status}): {body}")]
    ApiError {
        /// HTTP (or envelope) status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response was 2xx but did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// A display URL could not be turned into a storage locator.
    #[error(transparent)]
    Locator(#[from] LocatorError),
}
