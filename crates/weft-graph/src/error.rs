//! Graph wiring and execution errors.

use thiserror::Error;

/// Result alias for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Errors raised while wiring or executing a node graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The requested connection is not wirable.
    #[error("invalid connection: {reason}")]
    InvalidConnection {
        /// Why the connection was rejected.
        reason: String,
    },

    /// The connection would close a loop in the graph.
    #[error("connection would create a cycle")]
    CycleDetected,

    /// Input port index past the node's arity.
    #[error("port {port} out of range (node accepts {max} inputs)")]
    PortOutOfRange {
        /// Requested port.
        port: usize,
        /// Number of ports the node has.
        max: usize,
    },

    /// A required input port has nothing connected.
    #[error("input port {port} is not connected")]
    MissingInput {
        /// The unconnected port.
        port: usize,
    },

    /// `exec` was called on a node that is not a renderer.
    #[error("exec target is not a renderer node")]
    NotARenderer,

    /// The renderer's output is not consumed by a sink.
    #[error("renderer has no sink attached")]
    NoSink,

    /// Error from the core pipeline types.
    #[error(transparent)]
    Core(#[from] weft_core::Error),
}

impl GraphError {
    /// Creates an [`GraphError::InvalidConnection`].
    #[inline]
    pub fn invalid_connection(reason: impl Into<String>) -> Self {
        Self::InvalidConnection {
            reason: reason.into(),
        }
    }
}
