//! Host runtime error types.

use portcullis_core::NodeError;
use thiserror::Error;

/// Errors that can stop the host runtime.
#[derive(Debug, Error)]
pub enum HostError {
    /// Runtime configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// A node stopped on a fatal error.
    #[error("{node} node failed: {source}")]
    Node {
        /// Which node.
        node: &'static str,
        /// Why it stopped.
        #[source]
        source: NodeError,
    },

    /// A node thread panicked or was cancelled.
    #[error("{node} node thread aborted: {reason}")]
    Join {
        /// Which node.
        node: &'static str,
        /// Join failure description.
        reason: String,
    },
}
