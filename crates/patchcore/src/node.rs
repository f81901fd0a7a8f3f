use crate::error::FlowError;
use crate::patch::{Delivery, Patch};
use crate::port::{Port, PortId};
use crate::{PatchError, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

pub type NodeId = Uuid;

/// Behaviour of a node kind.
///
/// Methods take `&self`: everything a node mutates while reacting lives in
/// the patch and is reached through the [`NodeContext`]. This is what lets a
/// propagation chain re-enter the same node.
pub trait Node: Send + Sync {
    /// Type identifier (e.g. "float", "+")
    fn node_type(&self) -> &str;

    fn make_hot_inlet(&self) -> Port {
        Port::hot_inlet("hot")
    }

    fn make_cold_inlet(&self) -> Port {
        Port::cold_inlet("cold")
    }

    fn make_main_outlet(&self) -> Port {
        Port::outlet("out")
    }

    /// Optional: configure node-specific state. Default ports already exist.
    fn setup(&self, _ctx: &mut NodeContext<'_>, _args: &[Value]) -> Result<()> {
        Ok(())
    }

    /// Recompute the transfer function and emit through the node's outlets
    fn calculate_output(&self, ctx: &mut NodeContext<'_>) -> Result<()>;

    /// A validated value arrived on a hot inlet
    fn hot_inlet_received(
        &self,
        ctx: &mut NodeContext<'_>,
        inlet: PortId,
        value: Value,
    ) -> Result<()> {
        let key = ctx.port_name(inlet).unwrap_or_default();
        ctx.state_mut()?.set(key, value);
        self.calculate_output(ctx)
    }

    /// A bang arrived on any inlet
    fn inlet_received_bang(&self, ctx: &mut NodeContext<'_>, _inlet: PortId) -> Result<()> {
        ctx.output_main(Value::Bang)
    }

    /// Called once by the patch's initialization pass
    fn load_bang(&self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let hot = ctx.hot_inlet();
        self.inlet_received_bang(ctx, hot)
    }

    /// A port this node observes changed value
    fn port_value_changed(
        &self,
        _ctx: &mut NodeContext<'_>,
        _port: PortId,
        _value: &Value,
    ) -> Result<()> {
        Ok(())
    }

    /// Optional: release kind-specific resources. Ports are reset by the patch.
    fn tear_down(&self, _ctx: &mut NodeContext<'_>) {}
}

/// Working state a node keeps between activations
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub data: HashMap<String, Value>,
}

impl NodeState {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Read a number, falling back to `default` when absent or not numeric
    pub fn number_or(&self, key: &str, default: f64) -> f64 {
        self.number(key).unwrap_or(default)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// Structural record of a node instance inside a [`Patch`]
#[derive(Clone)]
pub struct NodeData {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) behavior: Arc<dyn Node>,
    pub(crate) hot_inlet: PortId,
    pub(crate) cold_inlet: PortId,
    pub(crate) main_outlet: PortId,
    pub(crate) inlets: Vec<PortId>,
    pub(crate) outlets: Vec<PortId>,
    pub(crate) plain_ports: Vec<PortId>,
    pub(crate) observed_ports: Vec<PortId>,
    pub(crate) subnodes: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) state: NodeState,
    pub(crate) debug: bool,
    pub(crate) loaded: bool,
    pub(crate) torn_down: bool,
}

impl NodeData {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_type(&self) -> &str {
        self.behavior.node_type()
    }

    pub fn hot_inlet(&self) -> PortId {
        self.hot_inlet
    }

    pub fn cold_inlet(&self) -> PortId {
        self.cold_inlet
    }

    pub fn main_outlet(&self) -> PortId {
        self.main_outlet
    }

    /// Extra inlets beyond the default pair
    pub fn inlets(&self) -> &[PortId] {
        &self.inlets
    }

    /// Extra outlets beyond the main outlet
    pub fn outlets(&self) -> &[PortId] {
        &self.outlets
    }

    /// Extra ports that are neither inlets nor outlets
    pub fn plain_ports(&self) -> &[PortId] {
        &self.plain_ports
    }

    /// Default and extra ports, inlets first
    pub fn all_ports(&self) -> Vec<PortId> {
        let mut ports = vec![self.hot_inlet, self.cold_inlet];
        ports.extend(&self.inlets);
        ports.push(self.main_outlet);
        ports.extend(&self.outlets);
        ports.extend(&self.plain_ports);
        ports
    }

    pub fn observed_ports(&self) -> &[PortId] {
        &self.observed_ports
    }

    pub fn subnodes(&self) -> &[NodeId] {
        &self.subnodes
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl PartialEq for NodeData {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeData {}

impl Hash for NodeData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for NodeData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeData")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("node_type", &self.node_type())
            .field("subnodes", &self.subnodes.len())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

/// Read-only view of a node, handed to outlet production hooks
pub struct NodeView<'a> {
    pub(crate) patch: &'a Patch,
    pub(crate) node: &'a NodeData,
}

impl<'a> NodeView<'a> {
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn state(&self) -> &NodeState {
        &self.node.state
    }

    /// Current value of an inlet looked up by name
    pub fn inlet_value(&self, name: &str) -> Option<&Value> {
        let id = self.patch.inlet_named(self.node.id, name)?;
        self.patch.port(id).map(Port::value)
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.patch.port(id)
    }
}

/// Execution context passed to node behaviour
pub struct NodeContext<'a> {
    patch: &'a mut Patch,
    node_id: NodeId,
    hot_inlet: PortId,
    cold_inlet: PortId,
    main_outlet: PortId,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn for_node(patch: &'a mut Patch, node_id: NodeId) -> Option<Self> {
        let (hot_inlet, cold_inlet, main_outlet) = {
            let node = patch.node(node_id)?;
            (node.hot_inlet, node.cold_inlet, node.main_outlet)
        };
        Some(Self {
            patch,
            node_id,
            hot_inlet,
            cold_inlet,
            main_outlet,
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn hot_inlet(&self) -> PortId {
        self.hot_inlet
    }

    pub fn cold_inlet(&self) -> PortId {
        self.cold_inlet
    }

    pub fn main_outlet(&self) -> PortId {
        self.main_outlet
    }

    pub fn patch(&self) -> &Patch {
        &*self.patch
    }

    pub fn patch_mut(&mut self) -> &mut Patch {
        &mut *self.patch
    }

    pub fn node(&self) -> Result<&NodeData> {
        self.patch
            .node(self.node_id)
            .ok_or(FlowError::Patch(PatchError::NodeNotFound(self.node_id)))
    }

    pub fn state(&self) -> Result<&NodeState> {
        Ok(&self.node()?.state)
    }

    pub fn state_mut(&mut self) -> Result<&mut NodeState> {
        self.patch
            .node_mut(self.node_id)
            .map(|n| &mut n.state)
            .ok_or(FlowError::Patch(PatchError::NodeNotFound(self.node_id)))
    }

    pub fn port_name(&self, port: PortId) -> Option<String> {
        self.patch.port(port).map(|p| p.name.clone())
    }

    pub fn port_value(&self, port: PortId) -> Option<&Value> {
        self.patch.port(port).map(Port::value)
    }

    pub fn inlet_named(&self, name: &str) -> Option<PortId> {
        self.patch.inlet_named(self.node_id, name)
    }

    pub fn outlet_named(&self, name: &str) -> Option<PortId> {
        self.patch.outlet_named(self.node_id, name)
    }

    pub fn subnodes(&self) -> Vec<NodeId> {
        self.patch
            .node(self.node_id)
            .map(|n| n.subnodes.clone())
            .unwrap_or_default()
    }

    /// Attach an extra port to this node
    pub fn add_port(&mut self, port: Port) -> Result<PortId> {
        self.patch.add_port(self.node_id, port)
    }

    /// Construct a node owned by this one
    pub fn add_subnode(
        &mut self,
        behavior: Arc<dyn Node>,
        name: impl Into<String>,
        args: &[Value],
    ) -> Result<NodeId> {
        self.patch.add_subnode(self.node_id, behavior, name, args)
    }

    pub fn output(&mut self, outlet: PortId, value: Value) -> Result<()> {
        self.patch.output(outlet, value)
    }

    pub fn output_main(&mut self, value: Value) -> Result<()> {
        let outlet = self.main_outlet;
        self.patch.output(outlet, value)
    }

    /// Evaluate an outlet's production hook and emit the result
    pub fn emit_produced(&mut self, outlet: PortId) -> Result<()> {
        self.patch.emit_produced(outlet)
    }

    pub fn input(&mut self, inlet: PortId, value: Value) -> Result<Delivery> {
        self.patch.input(inlet, value)
    }

    pub fn set_value(&mut self, port: PortId, value: Value) -> Result<()> {
        self.patch.set_value(port, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_state_helpers() {
        let mut state = NodeState::default();
        state.set("left", 2.0);
        state.set("label", "x");
        assert_eq!(state.number("left"), Some(2.0));
        assert_eq!(state.number("label"), None);
        assert_eq!(state.number_or("missing", 7.0), 7.0);
        assert_eq!(state.remove("left"), Some(Value::Number(2.0)));
        state.clear();
        assert!(state.data.is_empty());
    }
}
