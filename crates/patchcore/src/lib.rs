//! Reactive core of the patch engine
//!
//! Nodes exchange [`Value`]s through typed ports. Inlets are hot or cold:
//! a value arriving on a hot inlet makes the owning node recompute and emit
//! on the same call stack, a cold inlet only stores it. Bangs are payload-free
//! triggers that bypass type checking. Everything lives in a [`Patch`].

mod config;
mod error;
pub mod events;
mod node;
mod patch;
mod port;
mod value;

pub use config::PatchConfig;
pub use error::{FlowError, NodeError, PatchError, PortError};
pub use events::{EventBus, PortEvent, PortSubscription};
pub use node::{Node, NodeContext, NodeData, NodeId, NodeState, NodeView};
pub use patch::{Delivery, Patch};
pub use port::{notification_name, ConnectionStatus, Observer, OutletHook, Port, PortId, PortRole};
pub use value::{TypeCheck, Value, ValueKind};

/// Result type for patch operations
pub type Result<T> = std::result::Result<T, FlowError>;
