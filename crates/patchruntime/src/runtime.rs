use crate::registry::NodeRegistry;
use patchcore::{
    Delivery, FlowError, NodeId, Patch, PatchConfig, PatchError, PortId, PortSubscription, Value,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Drives a patch built from registered node types
pub struct PatchRuntime {
    registry: Arc<NodeRegistry>,
    patch: Patch,
    config: RuntimeConfig,
}

impl PatchRuntime {
    /// Create a new runtime with default settings and an empty registry
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_registry(Arc::new(NodeRegistry::new()), config)
    }

    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        Self {
            registry,
            patch: Patch::with_config(config.patch.clone()),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    pub fn patch_mut(&mut self) -> &mut Patch {
        &mut self.patch
    }

    /// Construct a node of a registered type
    pub fn spawn(
        &mut self,
        node_type: &str,
        name: impl Into<String>,
        args: &[Value],
    ) -> Result<NodeId, FlowError> {
        let behavior = self.registry.create_node(node_type, args)?;
        let id = self.patch.create_node(behavior, name, args)?;
        if self.config.debug_nodes {
            self.patch.set_debug(id, true)?;
        }
        Ok(id)
    }

    pub fn inlet(&self, node: NodeId, name: &str) -> Result<PortId, FlowError> {
        self.patch
            .inlet_named(node, name)
            .ok_or_else(|| self.missing_port(node, name))
    }

    pub fn outlet(&self, node: NodeId, name: &str) -> Result<PortId, FlowError> {
        self.patch
            .outlet_named(node, name)
            .ok_or_else(|| self.missing_port(node, name))
    }

    fn missing_port(&self, node: NodeId, name: &str) -> FlowError {
        if self.patch.node(node).is_none() {
            PatchError::NodeNotFound(node).into()
        } else {
            PatchError::PortNotFound {
                node,
                name: name.to_string(),
            }
            .into()
        }
    }

    /// Connect an outlet of one node to an inlet of another, by port name
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_outlet: &str,
        to_node: NodeId,
        to_inlet: &str,
    ) -> Result<(), FlowError> {
        let outlet = self.outlet(from_node, from_outlet)?;
        let inlet = self.inlet(to_node, to_inlet)?;
        self.patch.connect(outlet, inlet)
    }

    pub fn disconnect(
        &mut self,
        from_node: NodeId,
        from_outlet: &str,
        to_node: NodeId,
        to_inlet: &str,
    ) -> Result<bool, FlowError> {
        let outlet = self.outlet(from_node, from_outlet)?;
        let inlet = self.inlet(to_node, to_inlet)?;
        Ok(self.patch.disconnect(outlet, inlet))
    }

    /// Deliver a value to a named inlet. Propagation completes before this returns.
    pub fn send(&mut self, node: NodeId, inlet: &str, value: Value) -> Result<Delivery, FlowError> {
        let inlet = self.inlet(node, inlet)?;
        self.patch.input(inlet, value)
    }

    pub fn bang(&mut self, node: NodeId, inlet: &str) -> Result<Delivery, FlowError> {
        self.send(node, inlet, Value::Bang)
    }

    /// Run the initialization pass: every node receives its load bang once
    pub fn load(&mut self) -> Result<(), FlowError> {
        tracing::info!("Loading patch with {} nodes", self.patch.node_count());
        self.patch.load_bang_all()
    }

    /// Watch a named port of a node
    pub fn subscribe(&self, node: NodeId, port: &str) -> Result<PortSubscription, FlowError> {
        let id = self.inlet(node, port).or_else(|_| self.outlet(node, port))?;
        let name = self
            .patch
            .port(id)
            .map(|p| p.notification_name())
            .ok_or_else(|| self.missing_port(node, port))?;
        Ok(self.patch.subscribe(name))
    }

    /// Tear down a node and drop it with its ports
    pub fn remove(&mut self, node: NodeId) -> Result<(), FlowError> {
        self.patch.remove_node(node)
    }
}

impl Default for PatchRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub patch: PatchConfig,
    /// Mark every spawned node for debug tracing
    pub debug_nodes: bool,
}
