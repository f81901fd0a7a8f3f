use crate::args::{args_value, number_arg};
use patchcore::{Node, NodeContext, NodeError, Port, PortId, Result, TypeCheck, Value, ValueKind};
use patchruntime::{NodeFactory, NodeMetadata, PortDefinition};
use std::sync::Arc;

/// Name of the plain port holding a float's stored number
const STORED: &str = "stored";

/// Stores a number. Hot input stores and outputs, cold input only stores,
/// a bang outputs the stored number.
///
/// The cold inlet forwards into a plain `stored` port, so whichever inlet
/// was written last wins.
pub struct FloatNode;

impl FloatNode {
    fn stored_port(ctx: &NodeContext<'_>) -> Option<PortId> {
        let node = ctx.node().ok()?;
        node.plain_ports()
            .iter()
            .copied()
            .find(|id| ctx.patch().port(*id).is_some_and(|p| p.name() == STORED))
    }
}

impl Node for FloatNode {
    fn node_type(&self) -> &str {
        "float"
    }

    fn make_hot_inlet(&self) -> Port {
        Port::hot_inlet("hot").accepting(TypeCheck::only(ValueKind::Number))
    }

    fn make_cold_inlet(&self) -> Port {
        Port::cold_inlet("cold").accepting(TypeCheck::only(ValueKind::Number))
    }

    fn setup(&self, ctx: &mut NodeContext<'_>, args: &[Value]) -> Result<()> {
        let initial = number_arg(args, 0, 0.0)?;
        let stored = ctx.add_port(Port::new(STORED).with_value(Value::Number(initial)))?;
        let cold = ctx.cold_inlet();
        ctx.patch_mut().forward_to_port(cold, stored)
    }

    fn calculate_output(&self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let value = Self::stored_port(ctx)
            .and_then(|id| ctx.port_value(id).cloned())
            .unwrap_or(Value::Number(0.0));
        ctx.output_main(value)
    }

    fn hot_inlet_received(
        &self,
        ctx: &mut NodeContext<'_>,
        _inlet: PortId,
        value: Value,
    ) -> Result<()> {
        if let Some(stored) = Self::stored_port(ctx) {
            ctx.set_value(stored, value)?;
        }
        self.calculate_output(ctx)
    }

    fn inlet_received_bang(&self, ctx: &mut NodeContext<'_>, _inlet: PortId) -> Result<()> {
        self.calculate_output(ctx)
    }

    fn load_bang(&self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Ok(())
    }
}

pub struct FloatNodeFactory;

impl NodeFactory for FloatNodeFactory {
    fn create(&self, args: &[Value]) -> std::result::Result<Arc<dyn Node>, NodeError> {
        number_arg(args, 0, 0.0)?;
        Ok(Arc::new(FloatNode))
    }

    fn node_type(&self) -> &str {
        "float"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Store a number and output it on bang".to_string(),
            category: "data".to_string(),
            inlets: vec![
                PortDefinition::hot("hot", "number: store and output, bang: output"),
                PortDefinition::cold("cold", "number: store"),
            ],
            outlets: vec![PortDefinition::outlet("out", "number")],
        }
    }
}

/// Outputs its content on bang or any hot input. The cold inlet replaces
/// the content.
pub struct MessageNode;

impl MessageNode {
    fn content(ctx: &NodeContext<'_>) -> Result<Value> {
        Ok(ctx.state()?.get("content").cloned().unwrap_or(Value::Bang))
    }
}

impl Node for MessageNode {
    fn node_type(&self) -> &str {
        "message"
    }

    fn setup(&self, ctx: &mut NodeContext<'_>, args: &[Value]) -> Result<()> {
        ctx.state_mut()?.set("content", args_value(args));
        let cold = ctx.cold_inlet();
        let node = ctx.node_id();
        ctx.patch_mut().node_observe_port(node, cold)
    }

    fn calculate_output(&self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let content = Self::content(ctx)?;
        ctx.output_main(content)
    }

    fn hot_inlet_received(
        &self,
        ctx: &mut NodeContext<'_>,
        _inlet: PortId,
        _value: Value,
    ) -> Result<()> {
        self.calculate_output(ctx)
    }

    fn inlet_received_bang(&self, ctx: &mut NodeContext<'_>, inlet: PortId) -> Result<()> {
        if inlet == ctx.hot_inlet() {
            self.calculate_output(ctx)
        } else {
            Ok(())
        }
    }

    fn port_value_changed(
        &self,
        ctx: &mut NodeContext<'_>,
        port: PortId,
        value: &Value,
    ) -> Result<()> {
        if port == ctx.cold_inlet() {
            ctx.state_mut()?.set("content", value.clone());
        }
        Ok(())
    }

    fn load_bang(&self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Ok(())
    }
}

pub struct MessageNodeFactory;

impl NodeFactory for MessageNodeFactory {
    fn create(&self, _args: &[Value]) -> std::result::Result<Arc<dyn Node>, NodeError> {
        Ok(Arc::new(MessageNode))
    }

    fn node_type(&self) -> &str {
        "message"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Output the construction arguments on bang".to_string(),
            category: "data".to_string(),
            inlets: vec![
                PortDefinition::hot("hot", "anything: output content"),
                PortDefinition::cold("cold", "anything: replace content"),
            ],
            outlets: vec![PortDefinition::outlet("out", "content")],
        }
    }
}

/// Combines its two inlets into a list. The main outlet computes the list
/// from the current inlet values through its production hook.
pub struct PackNode;

impl Node for PackNode {
    fn node_type(&self) -> &str {
        "pack"
    }

    fn make_hot_inlet(&self) -> Port {
        Port::hot_inlet("left")
    }

    fn make_cold_inlet(&self) -> Port {
        Port::cold_inlet("right")
    }

    fn make_main_outlet(&self) -> Port {
        Port::outlet("out").with_hook(|node| {
            let left = node.inlet_value("left").cloned().unwrap_or_default();
            let right = node.inlet_value("right").cloned().unwrap_or_default();
            Value::Array(vec![left, right])
        })
    }

    fn setup(&self, ctx: &mut NodeContext<'_>, args: &[Value]) -> Result<()> {
        let left = ctx.hot_inlet();
        let right = ctx.cold_inlet();
        let patch = ctx.patch_mut();
        // Initial values are stored without going through the hot handler
        patch.set_value(left, args.first().cloned().unwrap_or(Value::Number(0.0)))?;
        patch.set_value(right, args.get(1).cloned().unwrap_or(Value::Number(0.0)))
    }

    fn calculate_output(&self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let outlet = ctx.main_outlet();
        ctx.emit_produced(outlet)
    }

    fn inlet_received_bang(&self, ctx: &mut NodeContext<'_>, _inlet: PortId) -> Result<()> {
        self.calculate_output(ctx)
    }

    fn load_bang(&self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Ok(())
    }
}

pub struct PackNodeFactory;

impl NodeFactory for PackNodeFactory {
    fn create(&self, _args: &[Value]) -> std::result::Result<Arc<dyn Node>, NodeError> {
        Ok(Arc::new(PackNode))
    }

    fn node_type(&self) -> &str {
        "pack"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Combine two values into a list".to_string(),
            category: "data".to_string(),
            inlets: vec![
                PortDefinition::hot("left", "anything: output the pair"),
                PortDefinition::cold("right", "anything: stored"),
            ],
            outlets: vec![PortDefinition::outlet("out", "list")],
        }
    }
}
