use crate::{NodeId, PortId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Port error: {0}")]
    Port(#[from] PortError),

    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    /// A propagation chain recursed past the configured limit
    #[error("Propagation depth {limit} exceeded at port {port}")]
    DepthExceeded { limit: usize, port: PortId },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument at position {position}: expected {expected}, got {actual}")]
    InvalidArgument {
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortError {
    #[error("Port not found: {0}")]
    NotFound(PortId),

    #[error("Port {0} cannot observe itself")]
    SelfObservation(PortId),

    #[error("Forwarding {from} to {to} would create a cycle")]
    ForwardingCycle { from: PortId, to: PortId },

    #[error("Port {port} is not an {expected}")]
    WrongDirection { port: PortId, expected: &'static str },

    #[error("Port {0} is closed")]
    Closed(PortId),

    #[error("Port {0} already belongs to a node")]
    AlreadyAttached(PortId),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {0} has been torn down")]
    NodeTornDown(NodeId),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("No port named '{name}' on node {node}")]
    PortNotFound { node: NodeId, name: String },

    #[error("Invalid connection: {0}")]
    InvalidConnection(String),
}
