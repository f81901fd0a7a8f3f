//! Standard node library
//!
//! Collection of built-in node kinds for common patching tasks

mod args;
mod control;
mod counter;
mod debug;
mod math;
mod store;

pub use control::{BangNode, LoadBangNode, TriggerKind, TriggerNode};
pub use counter::CounterNode;
pub use debug::{PrintNode, PRINT_HISTORY};
pub use math::{BinOp, BinOpNode};
pub use store::{FloatNode, MessageNode, PackNode};
use patchruntime::NodeRegistry;

use std::sync::Arc;

/// Register all standard nodes with a registry
pub fn register_all(registry: &mut NodeRegistry) {
    registry.register(Arc::new(control::BangNodeFactory));
    registry.register(Arc::new(control::LoadBangNodeFactory));
    registry.register(Arc::new(control::TriggerNodeFactory));
    registry.register(Arc::new(counter::CounterNodeFactory));
    registry.register(Arc::new(debug::PrintNodeFactory));
    for op in BinOp::ALL {
        registry.register(Arc::new(math::BinOpNodeFactory(op)));
    }
    registry.register(Arc::new(store::FloatNodeFactory));
    registry.register(Arc::new(store::MessageNodeFactory));
    registry.register(Arc::new(store::PackNodeFactory));
}

/// A registry holding every standard node
pub fn standard_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_all(&mut registry);
    registry
}
