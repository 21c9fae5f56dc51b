//! Server-level error types.

use thiserror::Error;

/// Errors that can occur while starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid bind address.
    #[error("invalid bind address '{address}': {source}")]
    InvalidBindAddress {
        /// The address string that failed to parse.
        address: String,
        /// Underlying parse error.
        #[source]
        source: std::net::AddrParseError,
    },

    /// Failed to bind the listening socket.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// The address that could not be bound.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The accept loop itself failed.
    #[error("server loop failed: {source}")]
    Serve {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to read or parse the credentials config file.
    #[error("failed to load credentials from '{path}': {reason}")]
    CredentialsConfig {
        /// Path to the config file.
        path: String,
        /// Human-readable reason.
        reason: String,
    },
}
