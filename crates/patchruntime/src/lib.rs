//! Patch runtime
//!
//! Registry of node kinds and a driver façade that builds nodes by type
//! name, wires them by port name and feeds values into the patch.

mod registry;
mod runtime;

pub use registry::{NodeFactory, NodeMetadata, NodeRegistry, PortDefinition, PortKind};
pub use runtime::{PatchRuntime, RuntimeConfig};
