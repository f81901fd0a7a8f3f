//! The patch: arena owning every node and port of one graph, and the
//! synchronous propagation that runs through it.
//!
//! All cross references (connections, observation, forwarding, owner links)
//! are ids into the arena. A reference to a removed or closed port is skipped.
//! Propagation runs inline on the caller's stack; each hop (`set_value`,
//! `input`, `output`) counts against [`PatchConfig::max_propagation_depth`].

use crate::events::{EventBus, PortEvent, PortSubscription};
use crate::node::{Node, NodeContext, NodeData, NodeState, NodeView};
use crate::port::{ConnectionStatus, Observer, Port, PortId, PortRole};
use crate::{FlowError, NodeId, PatchConfig, PatchError, PortError, Result, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of delivering a value to an inlet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Passed type checking and was stored
    Accepted,
    /// Failed type checking and was dropped
    Rejected,
    /// A bang, handed to the owner's bang handler
    Bang,
    /// The inlet is closed
    Ignored,
}

pub struct Patch {
    config: PatchConfig,
    nodes: HashMap<NodeId, NodeData>,
    order: Vec<NodeId>,
    ports: HashMap<PortId, Port>,
    events: EventBus,
    depth: usize,
}

impl Patch {
    pub fn new() -> Self {
        Self::with_config(PatchConfig::default())
    }

    pub fn with_config(config: PatchConfig) -> Self {
        let events = EventBus::new(config.event_buffer_size);
        Self {
            config,
            nodes: HashMap::new(),
            order: Vec::new(),
            ports: HashMap::new(),
            events,
            depth: 0,
        }
    }

    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(&id)
    }

    /// All nodes, subnodes included, in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(&id)
    }

    pub fn value(&self, port: PortId) -> Option<&Value> {
        self.port(port).map(Port::value)
    }

    pub fn connection_status(&self, port: PortId) -> Option<ConnectionStatus> {
        self.port(port).map(Port::connection_status)
    }

    /// Current nesting of the propagation in progress
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Watch a port by its notification name
    pub fn subscribe(&self, notification_name: impl Into<String>) -> PortSubscription {
        self.events.subscribe(notification_name)
    }

    pub fn set_debug(&mut self, node: NodeId, debug: bool) -> Result<()> {
        let data = self
            .nodes
            .get_mut(&node)
            .ok_or(PatchError::NodeNotFound(node))?;
        data.debug = debug;
        Ok(())
    }

    // ----- construction -------------------------------------------------

    /// Construct a node: wire its default ports, then run its setup with `args`.
    ///
    /// A node whose setup fails is torn down and removed before the error is
    /// returned.
    pub fn create_node(
        &mut self,
        behavior: Arc<dyn Node>,
        name: impl Into<String>,
        args: &[Value],
    ) -> Result<NodeId> {
        let id = self.construct(behavior, name.into(), None);
        self.finish_setup(id, args)
    }

    /// Construct a node owned by `parent`
    pub fn add_subnode(
        &mut self,
        parent: NodeId,
        behavior: Arc<dyn Node>,
        name: impl Into<String>,
        args: &[Value],
    ) -> Result<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return Err(PatchError::NodeNotFound(parent).into());
        }
        let id = self.construct(behavior, name.into(), Some(parent));
        self.finish_setup(id, args)
    }

    fn construct(&mut self, behavior: Arc<dyn Node>, name: String, parent: Option<NodeId>) -> NodeId {
        let id = Uuid::new_v4();
        let hot_inlet = self.attach(id, behavior.make_hot_inlet());
        let cold_inlet = self.attach(id, behavior.make_cold_inlet());
        let main_outlet = self.attach(id, behavior.make_main_outlet());

        tracing::info!("Creating node {} ({}) as {}", name, behavior.node_type(), id);

        self.nodes.insert(
            id,
            NodeData {
                id,
                name,
                behavior,
                hot_inlet,
                cold_inlet,
                main_outlet,
                inlets: Vec::new(),
                outlets: Vec::new(),
                plain_ports: Vec::new(),
                observed_ports: Vec::new(),
                subnodes: Vec::new(),
                parent,
                state: NodeState::default(),
                debug: false,
                loaded: false,
                torn_down: false,
            },
        );
        self.order.push(id);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.subnodes.push(id);
        }
        id
    }

    fn finish_setup(&mut self, id: NodeId, args: &[Value]) -> Result<NodeId> {
        match self.dispatch(id, |node, ctx| node.setup(ctx, args)) {
            Ok(()) => Ok(id),
            Err(e) => {
                tracing::warn!("Setup of node {} failed: {}", id, e);
                self.remove_node(id)?;
                Err(e)
            }
        }
    }

    fn attach(&mut self, owner: NodeId, mut port: Port) -> PortId {
        port.owner = Some(owner);
        let id = port.id;
        self.ports.insert(id, port);
        id
    }

    /// Attach an extra port to a node, making the node its owner.
    /// A port whose id is already in the patch is rejected.
    pub fn add_port(&mut self, node: NodeId, port: Port) -> Result<PortId> {
        let id = port.id;
        if self.ports.contains_key(&id) {
            return Err(PortError::AlreadyAttached(id).into());
        }
        let is_inlet = port.is_inlet();
        let is_outlet = port.is_outlet();
        let data = self.live_node_mut(node)?;
        if is_inlet {
            data.inlets.push(id);
        } else if is_outlet {
            data.outlets.push(id);
        } else {
            data.plain_ports.push(id);
        }
        tracing::debug!("Node {} gained port {} ({})", node, port.name, id);
        self.attach(node, port);
        Ok(id)
    }

    fn live_node_mut(&mut self, node: NodeId) -> Result<&mut NodeData> {
        match self.nodes.get_mut(&node) {
            Some(data) if data.torn_down => Err(PatchError::NodeTornDown(node).into()),
            Some(data) => Ok(data),
            None => Err(PatchError::NodeNotFound(node).into()),
        }
    }

    pub fn inlet_named(&self, node: NodeId, name: &str) -> Option<PortId> {
        let data = self.nodes.get(&node)?;
        std::iter::once(data.hot_inlet)
            .chain(std::iter::once(data.cold_inlet))
            .chain(data.inlets.iter().copied())
            .find(|id| self.ports.get(id).is_some_and(|p| p.name == name))
    }

    pub fn outlet_named(&self, node: NodeId, name: &str) -> Option<PortId> {
        let data = self.nodes.get(&node)?;
        std::iter::once(data.main_outlet)
            .chain(data.outlets.iter().copied())
            .find(|id| self.ports.get(id).is_some_and(|p| p.name == name))
    }

    // ----- links --------------------------------------------------------

    fn open_port(&self, id: PortId) -> Result<&Port> {
        let port = self.ports.get(&id).ok_or(PortError::NotFound(id))?;
        if !port.open {
            return Err(PortError::Closed(id).into());
        }
        Ok(port)
    }

    /// Connect an outlet to an inlet. Connecting twice is a no-op.
    pub fn connect(&mut self, outlet: PortId, inlet: PortId) -> Result<()> {
        if !self.open_port(outlet)?.is_outlet() {
            return Err(PortError::WrongDirection { port: outlet, expected: "outlet" }.into());
        }
        if !self.open_port(inlet)?.is_inlet() {
            return Err(PortError::WrongDirection { port: inlet, expected: "inlet" }.into());
        }
        if let Some(out) = self.ports.get_mut(&outlet) {
            if out.connections.contains(&inlet) {
                return Ok(());
            }
            out.connections.push(inlet);
        }
        if let Some(inp) = self.ports.get_mut(&inlet) {
            inp.connections.push(outlet);
        }
        tracing::debug!("Connected outlet {} to inlet {}", outlet, inlet);
        Ok(())
    }

    /// Disconnect an outlet from an inlet. Returns whether they were connected.
    pub fn disconnect(&mut self, outlet: PortId, inlet: PortId) -> bool {
        let was_connected = self
            .ports
            .get(&outlet)
            .is_some_and(|p| p.connections.contains(&inlet));
        if !was_connected {
            return false;
        }
        for (port, peer) in [(outlet, inlet), (inlet, outlet)] {
            if let Some(p) = self.ports.get_mut(&port) {
                p.connections.retain(|c| *c != peer);
            }
            self.update_status(port, ConnectionStatus::NotConnected);
        }
        tracing::debug!("Disconnected outlet {} from inlet {}", outlet, inlet);
        true
    }

    /// Subscribe `observer` to value changes of `observed`
    pub fn observe_port(&mut self, observer: PortId, observed: PortId) -> Result<()> {
        if observer == observed {
            return Err(PortError::SelfObservation(observer).into());
        }
        self.open_port(observer)?;
        self.open_port(observed)?;
        if let Some(p) = self.ports.get_mut(&observer) {
            if p.observed.contains(&observed) {
                return Ok(());
            }
            p.observed.push(observed);
        }
        if let Some(p) = self.ports.get_mut(&observed) {
            p.subscribers.push(Observer::Port(observer));
        }
        Ok(())
    }

    pub fn stop_observing_port(&mut self, observer: PortId, observed: PortId) -> bool {
        let Some(p) = self.ports.get_mut(&observer) else {
            return false;
        };
        let before = p.observed.len();
        p.observed.retain(|o| *o != observed);
        let removed = p.observed.len() != before;
        if let Some(p) = self.ports.get_mut(&observed) {
            p.subscribers.retain(|s| *s != Observer::Port(observer));
        }
        removed
    }

    /// Subscribe a node to value changes of `port` via [`Node::port_value_changed`]
    pub fn node_observe_port(&mut self, node: NodeId, port: PortId) -> Result<()> {
        self.open_port(port)?;
        let data = self.live_node_mut(node)?;
        if data.observed_ports.contains(&port) {
            return Ok(());
        }
        data.observed_ports.push(port);
        if let Some(p) = self.ports.get_mut(&port) {
            p.subscribers.push(Observer::Node(node));
        }
        Ok(())
    }

    pub fn node_stop_observing_port(&mut self, node: NodeId, port: PortId) -> bool {
        let Some(data) = self.nodes.get_mut(&node) else {
            return false;
        };
        let before = data.observed_ports.len();
        data.observed_ports.retain(|p| *p != port);
        let removed = data.observed_ports.len() != before;
        if let Some(p) = self.ports.get_mut(&port) {
            p.subscribers.retain(|s| *s != Observer::Node(node));
        }
        removed
    }

    /// Mirror every value stored on `from` into `to`, replacing any previous target
    pub fn forward_to_port(&mut self, from: PortId, to: PortId) -> Result<()> {
        self.open_port(from)?;
        self.open_port(to)?;
        // Following the chain from `to` must never arrive back at `from`
        let mut cursor = Some(to);
        let mut steps = 0;
        while let Some(current) = cursor {
            if current == from || steps > self.ports.len() {
                return Err(PortError::ForwardingCycle { from, to }.into());
            }
            cursor = self.ports.get(&current).and_then(|p| p.forward);
            steps += 1;
        }
        if let Some(p) = self.ports.get_mut(&from) {
            p.forward = Some(to);
        }
        tracing::debug!("Port {} forwards to {}", from, to);
        Ok(())
    }

    /// Clear the forward target of `from` if it is `to`
    pub fn remove_forward_port(&mut self, from: PortId, to: PortId) -> bool {
        match self.ports.get_mut(&from) {
            Some(p) if p.forward == Some(to) => {
                p.forward = None;
                true
            }
            _ => false,
        }
    }

    // ----- propagation --------------------------------------------------

    fn descend(&mut self, port: PortId) -> Result<()> {
        let limit = self.config.max_propagation_depth;
        if self.depth >= limit {
            tracing::warn!("Propagation depth {} exceeded at port {}", limit, port);
            return Err(FlowError::DepthExceeded { limit, port });
        }
        self.depth += 1;
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Store a value on a port, notify its observers and forward it.
    /// A closed port ignores the value.
    pub fn set_value(&mut self, port: PortId, value: Value) -> Result<()> {
        self.descend(port)?;
        let result = self.store(port, value);
        self.ascend();
        result
    }

    fn store(&mut self, id: PortId, value: Value) -> Result<()> {
        let (subscribers, forward, status) = match self.ports.get_mut(&id) {
            Some(port) if port.open => {
                port.value = value.clone();
                let status = if value.is_bang() || port.status == ConnectionStatus::NotConnected {
                    None
                } else {
                    Some(port.status.after_delivery(port.accepts.accepts(&value)))
                };
                (port.subscribers.clone(), port.forward, status)
            }
            _ => return Ok(()),
        };
        if let Some(status) = status {
            self.update_status(id, status);
        }
        if self.events.has_subscribers() {
            let owner = self.ports.get(&id).and_then(|p| p.owner);
            self.events.emit(PortEvent::value_changed(id, owner, value.clone()));
        }

        for observer in subscribers {
            match observer {
                // The forward target receives the value below, once
                Observer::Port(p) if Some(p) == forward => continue,
                Observer::Port(p) => self.notify_port(p, value.clone())?,
                Observer::Node(n) => self.notify_node(n, id, &value)?,
            }
        }
        if let Some(target) = forward {
            self.set_value(target, value)?;
        }
        Ok(())
    }

    fn notify_port(&mut self, observer: PortId, value: Value) -> Result<()> {
        let role = match self.ports.get(&observer) {
            Some(p) if p.open => p.role.clone(),
            _ => return Ok(()),
        };
        match role {
            PortRole::Inlet { .. } => self.input(observer, value).map(|_| ()),
            PortRole::Outlet { .. } => self.output(observer, value),
            PortRole::Plain => self.set_value(observer, value),
        }
    }

    fn notify_node(&mut self, node: NodeId, port: PortId, value: &Value) -> Result<()> {
        self.dispatch(node, |n, ctx| n.port_value_changed(ctx, port, value))
    }

    /// Deliver a value to an inlet: bangs go to the owner's bang handler,
    /// anything else is type checked, stored and, on a hot inlet, handed to
    /// the owner's hot handler before this call returns.
    pub fn input(&mut self, inlet: PortId, value: Value) -> Result<Delivery> {
        self.descend(inlet)?;
        let result = self.deliver(inlet, value);
        self.ascend();
        result
    }

    fn deliver(&mut self, inlet: PortId, value: Value) -> Result<Delivery> {
        let port = self.ports.get(&inlet).ok_or(PortError::NotFound(inlet))?;
        let PortRole::Inlet { hot } = port.role else {
            return Err(PortError::WrongDirection { port: inlet, expected: "inlet" }.into());
        };
        if !port.open {
            return Ok(Delivery::Ignored);
        }
        let owner = port.owner;
        let type_ok = port.accepts.accepts(&value);

        if value.is_bang() {
            if let Some(owner) = owner {
                self.dispatch(owner, |n, ctx| n.inlet_received_bang(ctx, inlet))?;
            }
            return Ok(Delivery::Bang);
        }

        if !type_ok {
            tracing::debug!("Inlet {} rejected {:?}", inlet, value.kind());
            self.update_status(inlet, ConnectionStatus::TypeMismatch);
            return Ok(Delivery::Rejected);
        }

        self.update_status(inlet, ConnectionStatus::Connected);
        self.store(inlet, value.clone())?;

        if hot {
            if let Some(owner) = owner {
                self.dispatch(owner, |n, ctx| n.hot_inlet_received(ctx, inlet, value))?;
            }
        }
        Ok(Delivery::Accepted)
    }

    /// Emit a value from an outlet to every connected inlet, in connection order
    pub fn output(&mut self, outlet: PortId, value: Value) -> Result<()> {
        self.descend(outlet)?;
        let result = self.emit(outlet, value);
        self.ascend();
        result
    }

    fn emit(&mut self, outlet: PortId, value: Value) -> Result<()> {
        let port = self.ports.get(&outlet).ok_or(PortError::NotFound(outlet))?;
        if !port.is_outlet() {
            return Err(PortError::WrongDirection { port: outlet, expected: "outlet" }.into());
        }
        if !port.open {
            return Ok(());
        }
        let type_ok = value.is_bang() || port.accepts.accepts(&value);
        let enforce = port.enforces_type();
        let targets = port.connections.clone();
        if enforce && !type_ok {
            tracing::debug!("Outlet {} dropped {:?}", outlet, value.kind());
            self.update_status(outlet, ConnectionStatus::TypeMismatch);
            return Ok(());
        }

        self.store(outlet, value.clone())?;
        if !targets.is_empty() && !value.is_bang() {
            self.update_status(outlet, ConnectionStatus::NotConnected.after_delivery(type_ok));
        }

        for inlet in targets {
            // A handler earlier in the walk may have disconnected it
            let still_connected = self
                .ports
                .get(&outlet)
                .is_some_and(|p| p.connections.contains(&inlet));
            if still_connected && self.ports.contains_key(&inlet) {
                self.input(inlet, value.clone())?;
            }
        }
        Ok(())
    }

    /// Evaluate an outlet's production hook against its owner and emit the result.
    /// An outlet without a hook or owner emits nothing.
    pub fn emit_produced(&mut self, outlet: PortId) -> Result<()> {
        let port = self.ports.get(&outlet).ok_or(PortError::NotFound(outlet))?;
        let (Some(hook), Some(owner)) = (port.hook(), port.owner) else {
            return Ok(());
        };
        let Some(node) = self.nodes.get(&owner) else {
            return Ok(());
        };
        let value = hook(&NodeView { patch: &*self, node });
        self.output(outlet, value)
    }

    fn update_status(&mut self, id: PortId, status: ConnectionStatus) {
        let Some(port) = self.ports.get_mut(&id) else {
            return;
        };
        if port.status == status {
            return;
        }
        port.status = status;
        let owner = port.owner;
        if self.events.has_subscribers() {
            self.events.emit(PortEvent::status_changed(id, owner, status));
        }
    }

    /// Run node behaviour with a context. Missing or torn down nodes are skipped.
    fn dispatch<F>(&mut self, node: NodeId, f: F) -> Result<()>
    where
        F: FnOnce(&dyn Node, &mut NodeContext<'_>) -> Result<()>,
    {
        let behavior = match self.nodes.get(&node) {
            Some(data) if !data.torn_down => data.behavior.clone(),
            _ => return Ok(()),
        };
        let Some(mut ctx) = NodeContext::for_node(self, node) else {
            return Ok(());
        };
        let result = f(behavior.as_ref(), &mut ctx);
        self.trace_debug(node);
        result
    }

    // ----- lifecycle ----------------------------------------------------

    /// Deliver the node's load bang. Only the first call has an effect.
    pub fn load_bang(&mut self, node: NodeId) -> Result<()> {
        let data = self
            .nodes
            .get_mut(&node)
            .ok_or(PatchError::NodeNotFound(node))?;
        if data.loaded || data.torn_down {
            return Ok(());
        }
        data.loaded = true;
        self.dispatch(node, |n, ctx| n.load_bang(ctx))
    }

    /// Initialization pass: load bang every node once, in creation order.
    ///
    /// A failing node does not stop the pass; the first error is returned
    /// after every node has been visited.
    pub fn load_bang_all(&mut self) -> Result<()> {
        let mut first_error = None;
        for id in self.order.clone() {
            if let Err(e) = self.load_bang(id) {
                tracing::warn!("Load bang of node {} failed: {}", id, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Stop a node's participation in the graph.
    ///
    /// Releases every observation, forwarding and connection link of its
    /// ports, closes them, and removes its subnodes. Calling it again is a no-op.
    pub fn tear_down(&mut self, node: NodeId) -> Result<()> {
        let data = self.nodes.get(&node).ok_or(PatchError::NodeNotFound(node))?;
        if data.torn_down {
            return Ok(());
        }
        let behavior = data.behavior.clone();
        if let Some(mut ctx) = NodeContext::for_node(self, node) {
            behavior.tear_down(&mut ctx);
        }

        let Some(data) = self.nodes.get_mut(&node) else {
            return Ok(());
        };
        data.torn_down = true;
        let ports = data.all_ports();
        let observed = std::mem::take(&mut data.observed_ports);
        let subnodes = std::mem::take(&mut data.subnodes);

        for port in observed {
            if let Some(p) = self.ports.get_mut(&port) {
                p.subscribers.retain(|s| *s != Observer::Node(node));
            }
        }
        for port in ports {
            self.release_port(port);
        }
        for sub in subnodes {
            self.tear_down(sub)?;
            self.discard(sub);
        }
        tracing::debug!("Tore down node {}", node);
        Ok(())
    }

    fn release_port(&mut self, id: PortId) {
        let Some(port) = self.ports.get(&id) else {
            return;
        };
        let observed = port.observed.clone();
        let subscribers = port.subscribers.clone();
        let connections = port.connections.clone();

        for o in observed {
            if let Some(p) = self.ports.get_mut(&o) {
                p.subscribers.retain(|s| *s != Observer::Port(id));
            }
        }
        for s in subscribers {
            match s {
                Observer::Port(p) => {
                    if let Some(p) = self.ports.get_mut(&p) {
                        p.observed.retain(|o| *o != id);
                    }
                }
                Observer::Node(n) => {
                    if let Some(n) = self.nodes.get_mut(&n) {
                        n.observed_ports.retain(|o| *o != id);
                    }
                }
            }
        }
        for peer in connections {
            if let Some(p) = self.ports.get_mut(&peer) {
                p.connections.retain(|c| *c != id);
            }
            self.update_status(peer, ConnectionStatus::NotConnected);
        }
        for p in self.ports.values_mut() {
            if p.forward == Some(id) {
                p.forward = None;
            }
        }

        self.update_status(id, ConnectionStatus::NotConnected);
        if let Some(port) = self.ports.get_mut(&id) {
            port.reset();
        }
    }

    /// Tear down a node and destroy it together with its ports
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        self.tear_down(node)?;
        self.discard(node);
        Ok(())
    }

    fn discard(&mut self, node: NodeId) {
        let Some(data) = self.nodes.remove(&node) else {
            return;
        };
        for port in data.all_ports() {
            self.ports.remove(&port);
        }
        self.order.retain(|id| *id != node);
        if let Some(parent) = data.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.subnodes.retain(|id| *id != node);
        }
    }

    // ----- debug --------------------------------------------------------

    /// Text dump of a node's name, id and port states
    pub fn debug_description(&self, node: NodeId) -> Option<String> {
        let data = self.nodes.get(&node)?;
        let mut out = format!("{} ({}) [{}]", data.name, data.node_type(), data.id);
        for id in data.all_ports() {
            let Some(port) = self.ports.get(&id) else {
                continue;
            };
            let role = match port.role {
                PortRole::Inlet { hot: true } => "hot inlet",
                PortRole::Inlet { hot: false } => "cold inlet",
                PortRole::Outlet { .. } => "outlet",
                PortRole::Plain => "port",
            };
            out.push_str(&format!(
                "\n  {} '{}': {} ({:?}{})",
                role,
                port.name,
                port.value,
                port.status,
                if port.open { "" } else { ", closed" }
            ));
        }
        if !data.subnodes.is_empty() {
            out.push_str(&format!("\n  subnodes: {}", data.subnodes.len()));
        }
        Some(out)
    }

    fn trace_debug(&self, node: NodeId) {
        if self.nodes.get(&node).is_some_and(|n| n.debug) {
            if let Some(description) = self.debug_description(node) {
                tracing::debug!("{}", description);
            }
        }
    }
}

impl Default for Patch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TypeCheck, ValueKind};

    /// Passes hot values straight through and counts calculations
    struct Relay;

    impl Node for Relay {
        fn node_type(&self) -> &str {
            "test.relay"
        }

        fn make_hot_inlet(&self) -> Port {
            Port::hot_inlet("hot").accepting(TypeCheck::only(ValueKind::Number))
        }

        fn calculate_output(&self, ctx: &mut NodeContext<'_>) -> Result<()> {
            let state = ctx.state_mut()?;
            let count = state.number_or("calculations", 0.0) + 1.0;
            state.set("calculations", count);
            let value = state.get("hot").cloned().unwrap_or_default();
            ctx.output_main(value)
        }
    }

    fn relay(patch: &mut Patch) -> NodeId {
        patch.create_node(Arc::new(Relay), "relay", &[]).unwrap()
    }

    fn calculations(patch: &Patch, node: NodeId) -> f64 {
        patch.node(node).unwrap().state().number_or("calculations", 0.0)
    }

    #[test]
    fn test_default_ports_have_owner() {
        let mut patch = Patch::new();
        let node = relay(&mut patch);
        let data = patch.node(node).unwrap();
        for port in data.all_ports() {
            assert_eq!(patch.port(port).unwrap().owner(), Some(node));
        }
        assert_eq!(patch.inlet_named(node, "hot"), Some(data.hot_inlet()));
        assert_eq!(patch.outlet_named(node, "out"), Some(data.main_outlet()));
        assert_eq!(patch.inlet_named(node, "missing"), None);
    }

    #[test]
    fn test_connect_rejects_wrong_direction() {
        let mut patch = Patch::new();
        let node = relay(&mut patch);
        let data = patch.node(node).unwrap().clone();
        let err = patch.connect(data.hot_inlet(), data.cold_inlet()).unwrap_err();
        assert!(matches!(
            err,
            FlowError::Port(PortError::WrongDirection { expected: "outlet", .. })
        ));
    }

    #[test]
    fn test_depth_counter_returns_to_zero() {
        let mut patch = Patch::new();
        let a = relay(&mut patch);
        let b = relay(&mut patch);
        let (a_out, a_hot) = {
            let d = patch.node(a).unwrap();
            (d.main_outlet(), d.hot_inlet())
        };
        let b_hot = patch.node(b).unwrap().hot_inlet();
        patch.connect(a_out, b_hot).unwrap();
        patch.input(a_hot, Value::Number(1.0)).unwrap();
        assert_eq!(patch.depth(), 0);
        assert_eq!(calculations(&patch, b), 1.0);
    }

    #[test]
    fn test_mismatch_then_recovery() {
        let mut patch = Patch::new();
        let node = relay(&mut patch);
        let hot = patch.node(node).unwrap().hot_inlet();

        assert_eq!(patch.input(hot, Value::from("x")).unwrap(), Delivery::Rejected);
        assert_eq!(patch.connection_status(hot), Some(ConnectionStatus::TypeMismatch));
        assert_eq!(calculations(&patch, node), 0.0);

        assert_eq!(patch.input(hot, Value::Number(4.0)).unwrap(), Delivery::Accepted);
        assert_eq!(patch.connection_status(hot), Some(ConnectionStatus::Connected));
        assert_eq!(patch.value(hot), Some(&Value::Number(4.0)));
    }

    #[test]
    fn test_forward_cycle_rejected() {
        let mut patch = Patch::new();
        let node = relay(&mut patch);
        let a = patch.add_port(node, Port::new("a")).unwrap();
        let b = patch.add_port(node, Port::new("b")).unwrap();
        let c = patch.add_port(node, Port::new("c")).unwrap();
        patch.forward_to_port(a, b).unwrap();
        patch.forward_to_port(b, c).unwrap();
        assert!(matches!(
            patch.forward_to_port(c, a),
            Err(FlowError::Port(PortError::ForwardingCycle { .. }))
        ));
        assert!(matches!(
            patch.forward_to_port(a, a),
            Err(FlowError::Port(PortError::ForwardingCycle { .. }))
        ));
    }

    #[test]
    fn test_self_observation_rejected() {
        let mut patch = Patch::new();
        let node = relay(&mut patch);
        let a = patch.add_port(node, Port::new("a")).unwrap();
        assert!(matches!(
            patch.observe_port(a, a),
            Err(FlowError::Port(PortError::SelfObservation(id))) if id == a
        ));
        assert!(patch.port(a).unwrap().observed_ports().is_empty());
    }

    #[test]
    fn test_remove_node_destroys_ports() {
        let mut patch = Patch::new();
        let node = relay(&mut patch);
        let ports = patch.node(node).unwrap().all_ports();
        patch.remove_node(node).unwrap();
        assert!(patch.node(node).is_none());
        assert!(ports.iter().all(|p| patch.port(*p).is_none()));
        assert!(matches!(
            patch.tear_down(node),
            Err(FlowError::Patch(PatchError::NodeNotFound(_)))
        ));
    }
}
